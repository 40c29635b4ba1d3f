//! Multivariate-normal penalty for vector-valued random effects.

use faer::{Mat, Side};

use crate::utils::{matrix_is_finite, usize_to_f64};

/// Zero-mean multivariate normal with a fixed covariance, factored once and evaluated
/// per random-effect group.
///
/// A covariance that is not symmetric positive definite still produces a value, but
/// every evaluation returns `NaN`.
#[derive(Debug, Clone)]
pub struct MultivariateNormal {
    dimension: usize,
    lower: Option<Mat<f64>>,
    half_log_det: f64,
}

impl MultivariateNormal {
    #[must_use]
    pub fn new(covariance: &Mat<f64>) -> Self {
        let dimension = covariance.nrows();
        let lower = if covariance.ncols() == dimension && matrix_is_finite(covariance) {
            match covariance.as_ref().llt(Side::Lower) {
                Ok(factor) => Some(factor.L().to_owned()),
                Err(err) => {
                    log::debug!("covariance is not positive definite: {err:?}");
                    None
                }
            }
        } else {
            log::debug!("covariance is not a finite square matrix");
            None
        };

        let half_log_det = lower.as_ref().map_or(f64::NAN, |l| {
            (0..dimension).map(|i| l[(i, i)].ln()).sum::<f64>()
        });

        Self {
            dimension,
            lower,
            half_log_det,
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub const fn is_positive_definite(&self) -> bool {
        self.lower.is_some()
    }

    /// `-log N(x; 0, Σ) = k/2 ln(2π) + ½ ln|Σ| + ½ xᵀ Σ⁻¹ x`.
    ///
    /// # Panics
    ///
    /// Panics if `x.len()` differs from the covariance dimension.
    #[must_use]
    pub fn negative_log_density(&self, x: &[f64]) -> f64 {
        assert_eq!(
            x.len(),
            self.dimension,
            "random-effect vector length must match covariance dimension"
        );
        let Some(lower) = &self.lower else {
            return f64::NAN;
        };

        // Forward substitution: L z = x, so xᵀ Σ⁻¹ x = zᵀ z.
        let mut z = vec![0.0; self.dimension];
        for i in 0..self.dimension {
            let partial: f64 = (0..i).map(|k| lower[(i, k)] * z[k]).sum();
            z[i] = (x[i] - partial) / lower[(i, i)];
        }
        let quadratic: f64 = z.iter().map(|value| value * value).sum();

        (0.5 * usize_to_f64(self.dimension)).mul_add(
            std::f64::consts::TAU.ln(),
            0.5f64.mul_add(quadratic, self.half_log_det),
        )
    }
}
