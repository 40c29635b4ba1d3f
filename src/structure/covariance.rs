//! Compound-symmetric covariance matrices for vector-valued random effects.
//!
//! The free parameters are `k` log standard deviations and one unconstrained
//! correlation. The correlation is mapped into `(-1, 1)` with a shifted logistic,
//! `rho = 2 / (1 + exp(-raw)) - 1`.

use faer::Mat;
use serde::{Deserialize, Serialize};

use super::StructureError;

/// What goes on the diagonal of a compound-symmetric matrix.
///
/// Two families of templates disagree here: most place the variance `sd_i^2` on the
/// diagonal, while some binomial random-intercept variants place `sd_i` itself. Both
/// are kept as named options; `Variance` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagonalConvention {
    /// Diagonal entry `i` is `sd_i^2`.
    #[default]
    Variance,
    /// Diagonal entry `i` is `sd_i`.
    StandardDeviation,
}

impl DiagonalConvention {
    #[must_use]
    pub fn diagonal_entry(self, sd: f64) -> f64 {
        match self {
            Self::Variance => sd.powi(2),
            Self::StandardDeviation => sd,
        }
    }
}

/// Shifted-logistic map from the real line into `(-1, 1)`.
#[must_use]
pub fn correlation_from_unconstrained(raw: f64) -> f64 {
    2.0 / (1.0 + (-raw).exp()) - 1.0
}

/// Inverse of [`correlation_from_unconstrained`]; useful for starting values.
#[must_use]
pub fn unconstrained_from_correlation(rho: f64) -> f64 {
    ((1.0 + rho) / (1.0 - rho)).ln()
}

/// Compound-symmetric covariance: `cov[i][j] = rho * sd_i * sd_j` off the diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundSymmetric {
    sd: Vec<f64>,
    rho: f64,
    convention: DiagonalConvention,
}

impl CompoundSymmetric {
    /// Build from log standard deviations and the unconstrained correlation.
    ///
    /// # Errors
    ///
    /// Returns `StructureError::EmptyCovariance` if `log_sd` is empty.
    pub fn from_unconstrained(
        log_sd: &[f64],
        transformed_rho: f64,
        convention: DiagonalConvention,
    ) -> Result<Self, StructureError> {
        if log_sd.is_empty() {
            return Err(StructureError::EmptyCovariance);
        }
        Ok(Self {
            sd: log_sd.iter().map(|value| value.exp()).collect(),
            rho: correlation_from_unconstrained(transformed_rho),
            convention,
        })
    }

    /// Rebuild from already-transformed (reported) quantities.
    #[must_use]
    pub const fn from_parts(sd: Vec<f64>, rho: f64, convention: DiagonalConvention) -> Self {
        Self {
            sd,
            rho,
            convention,
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.sd.len()
    }

    #[must_use]
    pub fn sd(&self) -> &[f64] {
        &self.sd
    }

    #[must_use]
    pub const fn rho(&self) -> f64 {
        self.rho
    }

    #[must_use]
    pub const fn convention(&self) -> DiagonalConvention {
        self.convention
    }

    #[must_use]
    pub fn matrix(&self) -> Mat<f64> {
        let k = self.sd.len();
        Mat::from_fn(k, k, |i, j| {
            if i == j {
                self.convention.diagonal_entry(self.sd[i])
            } else {
                self.rho * self.sd[i] * self.sd[j]
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::usize_to_f64;
    use approx::assert_relative_eq;

    #[test]
    fn matrix_is_symmetric_for_any_dimension() {
        for k in 1..6 {
            let log_sd: Vec<f64> = (0..k).map(|i| 0.3f64.mul_add(usize_to_f64(i), -0.5)).collect();
            let cs = CompoundSymmetric::from_unconstrained(&log_sd, -0.7, DiagonalConvention::Variance)
                .expect("non-empty dimension");
            let cov = cs.matrix();
            for i in 0..k {
                for j in 0..k {
                    assert_eq!(cov[(i, j)].to_bits(), cov[(j, i)].to_bits());
                }
            }
        }
    }

    #[test]
    fn diagonal_follows_convention() {
        let log_sd = [2.0_f64.ln(), 3.0_f64.ln()];
        let variance = CompoundSymmetric::from_unconstrained(&log_sd, 0.0, DiagonalConvention::Variance)
            .expect("valid");
        let sd = CompoundSymmetric::from_unconstrained(
            &log_sd,
            0.0,
            DiagonalConvention::StandardDeviation,
        )
        .expect("valid");
        assert_relative_eq!(variance.matrix()[(0, 0)], 4.0, epsilon = 1.0e-12);
        assert_relative_eq!(variance.matrix()[(1, 1)], 9.0, epsilon = 1.0e-12);
        assert_relative_eq!(sd.matrix()[(0, 0)], 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(sd.matrix()[(1, 1)], 3.0, epsilon = 1.0e-12);
    }

    #[test]
    fn zero_raw_correlation_gives_diagonal_matrix() {
        let cs = CompoundSymmetric::from_unconstrained(&[0.1, 0.2], 0.0, DiagonalConvention::Variance)
            .expect("valid");
        assert_relative_eq!(cs.rho(), 0.0);
        assert_relative_eq!(cs.matrix()[(0, 1)], 0.0);
    }

    #[test]
    fn off_diagonal_uses_both_standard_deviations() {
        let raw = unconstrained_from_correlation(0.5);
        let cs = CompoundSymmetric::from_unconstrained(
            &[0.0, 2.0_f64.ln()],
            raw,
            DiagonalConvention::Variance,
        )
        .expect("valid");
        assert_relative_eq!(cs.rho(), 0.5, epsilon = 1.0e-12);
        assert_relative_eq!(cs.matrix()[(0, 1)], 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn correlation_stays_inside_unit_interval() {
        for raw in [-30.0, -3.0, 0.0, 3.0, 30.0] {
            let rho = correlation_from_unconstrained(raw);
            assert!((-1.0..=1.0).contains(&rho));
        }
        assert!(correlation_from_unconstrained(3.0) < 1.0);
    }

    #[test]
    fn from_parts_reproduces_matrix_exactly() {
        let cs = CompoundSymmetric::from_unconstrained(&[0.4, -1.2, 0.05], 1.3, DiagonalConvention::Variance)
            .expect("valid");
        let rebuilt = CompoundSymmetric::from_parts(cs.sd().to_vec(), cs.rho(), cs.convention());
        let a = cs.matrix();
        let b = rebuilt.matrix();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(a[(i, j)].to_bits(), b[(i, j)].to_bits());
            }
        }
    }

    #[test]
    fn empty_log_sd_is_rejected() {
        let err = CompoundSymmetric::from_unconstrained(&[], 0.0, DiagonalConvention::Variance)
            .expect_err("empty dimension should fail");
        assert_eq!(err, StructureError::EmptyCovariance);
    }
}
