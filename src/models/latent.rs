/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Generalized linear latent-variable model over a multivariate response matrix.
//
// Created on: 24 Jan 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Latent-variable model
//!
//! For an `n x p` response matrix `y`, covariates `x` (`n x q`) and `num_lv` latent
//! dimensions,
//!
//! `eta[i, j] = b0[j] + (x b)[i, j] + (u Λ)[i, j]`
//!
//! where `u` is the `n x num_lv` matrix of latent scores, each `u[i, l] ~ N(0, 1)`, and
//! `Λ` is the `num_lv x p` triangular loading matrix. Loadings below the diagonal are
//! fixed at zero to remove the rotational freedom of `u`.
//!
//! Parameters, in order: `b0[p]`, `b[q x p]`, `lambda` (free loadings), `loglam`
//! (log-diagonal loadings, empty for the packed parametrization), `u[n x num_lv]`, and
//! finally the family parameters. Matrix blocks are column-major.

use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::families::{ResolvedFamily, ResponseFamily, log_standard_normal_pdf};
use crate::input::LatentInput;
use crate::models::objective::{
    Objective, ObjectiveBreakdown, ObjectiveError, ParameterLayout, observation_nll,
};
use crate::models::report::serialize_mat;
use crate::structure::{LoadingParametrization, TriangularLoadings};
use crate::utils::mat_from_column_major;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatentOptions {
    /// Response family shared by every column of `y`.
    pub family: ResponseFamily,
    /// How the loading matrix is read from the parameter vector.
    #[serde(default)]
    pub loadings: LoadingParametrization,
}

impl Default for LatentOptions {
    fn default() -> Self {
        Self {
            family: ResponseFamily::Poisson,
            loadings: LoadingParametrization::LogDiagonal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LatentVariableModel {
    input: LatentInput,
    shape: TriangularLoadings,
    family: ResponseFamily,
}

/// Quantities recomputed from a parameter vector.
#[derive(Debug, Clone, Serialize)]
pub struct LatentVariableReport {
    /// Response intercepts.
    pub b0: Vec<f64>,
    /// `q x p` covariate coefficients.
    #[serde(serialize_with = "serialize_mat")]
    pub b: Mat<f64>,
    /// Free loadings exactly as read from the parameter vector.
    pub lambda: Vec<f64>,
    /// `num_lv x p` loading matrix.
    #[serde(serialize_with = "serialize_mat")]
    pub newlam: Mat<f64>,
    /// `n x p` latent contribution `u Λ`.
    #[serde(serialize_with = "serialize_mat")]
    pub lam: Mat<f64>,
    /// `n x num_lv` latent scores.
    #[serde(serialize_with = "serialize_mat")]
    pub u: Mat<f64>,
    pub family: ResolvedFamily,
    pub breakdown: ObjectiveBreakdown,
}

impl LatentVariableModel {
    /// # Errors
    ///
    /// Returns `ObjectiveError::LatentInput` if the input is malformed or a response is
    /// outside the support of the family.
    pub fn new(input: LatentInput, options: LatentOptions) -> Result<Self, ObjectiveError> {
        input.validate_for(options.family)?;
        let shape = TriangularLoadings::new(input.num_lv, input.nresponses(), options.loadings)?;
        Ok(Self {
            input,
            shape,
            family: options.family,
        })
    }

    /// Poisson responses with log-diagonal loadings.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::new`].
    pub fn poisson(input: LatentInput) -> Result<Self, ObjectiveError> {
        Self::new(input, LatentOptions::default())
    }

    #[must_use]
    pub const fn input(&self) -> &LatentInput {
        &self.input
    }

    #[must_use]
    pub const fn loadings(&self) -> TriangularLoadings {
        self.shape
    }

    #[must_use]
    pub const fn family(&self) -> ResponseFamily {
        self.family
    }

    fn evaluate(&self, theta: &[f64]) -> Result<LatentVariableReport, ObjectiveError> {
        let n = self.input.nobs();
        let p = self.input.nresponses();
        let q = self.input.ncovariates();
        let num_lv = self.shape.num_lv();

        let mut reader = self.layout().reader(theta)?;
        let b0 = reader.take(p);
        let b = mat_from_column_major(q, p, reader.take(q * p));
        let lambda = reader.take(self.shape.free_len());
        let log_diagonal = reader.take(self.shape.diagonal_len());
        let u = mat_from_column_major(n, num_lv, reader.take(n * num_lv));
        let family = self.family.resolve(reader.take(self.family.parameter_count()));

        let newlam = self.shape.build(lambda, log_diagonal)?;
        let lam = &u * &newlam;
        let xb = &self.input.covariates * &b;

        let random_effects = -(0..num_lv)
            .flat_map(|l| (0..n).map(move |i| (i, l)))
            .map(|(i, l)| log_standard_normal_pdf(u[(i, l)]))
            .sum::<f64>();

        let y = &self.input.responses;
        let observation = observation_nll(n * p, |idx| {
            let (i, j) = (idx % n, idx / n);
            let eta = b0[j] + xb[(i, j)] + lam[(i, j)];
            family.log_density(y[(i, j)], eta)
        });

        let breakdown = ObjectiveBreakdown::new(observation, random_effects);
        log::trace!(
            "latent variable nll = {} (n = {n}, p = {p}, num_lv = {num_lv})",
            breakdown.total
        );
        Ok(LatentVariableReport {
            b0: b0.to_vec(),
            b,
            lambda: lambda.to_vec(),
            newlam,
            lam,
            u,
            family,
            breakdown,
        })
    }
}

impl Objective for LatentVariableModel {
    type Report = LatentVariableReport;

    fn layout(&self) -> ParameterLayout {
        let p = self.input.nresponses();
        ParameterLayout::new()
            .with_block("b0", p)
            .with_block("b", self.input.ncovariates() * p)
            .with_block("lambda", self.shape.free_len())
            .with_block("loglam", self.shape.diagonal_len())
            .with_block("u", self.input.nobs() * self.shape.num_lv())
            .with_family(self.family)
    }

    fn breakdown(&self, theta: &[f64]) -> Result<ObjectiveBreakdown, ObjectiveError> {
        Ok(self.evaluate(theta)?.breakdown)
    }

    fn report(&self, theta: &[f64]) -> Result<LatentVariableReport, ObjectiveError> {
        self.evaluate(theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::log_poisson_pmf;
    use crate::utils::usize_to_f64;
    use approx::assert_relative_eq;

    fn counts() -> Mat<f64> {
        Mat::from_fn(4, 3, |i, j| usize_to_f64((i * 3 + j) % 4))
    }

    #[test]
    fn layout_sizes_follow_dimensions() {
        let input = LatentInput::new(counts(), 2).with_covariates(Mat::zeros(4, 1));
        let model = LatentVariableModel::poisson(input).expect("valid input");
        let layout = model.layout();
        assert_eq!(layout.range_of("b0"), Some(0..3));
        assert_eq!(layout.range_of("b"), Some(3..6));
        assert_eq!(layout.range_of("lambda"), Some(6..9));
        assert_eq!(layout.range_of("loglam"), Some(9..11));
        assert_eq!(layout.range_of("u"), Some(11..19));
        assert_eq!(layout.len(), 19);
    }

    #[test]
    fn zero_scores_reduce_to_independent_poisson_columns() {
        let input = LatentInput::new(counts(), 1);
        let model = LatentVariableModel::poisson(input).expect("valid input");
        let b0 = [0.1, -0.4, 0.9];
        let mut theta = b0.to_vec();
        theta.extend([0.3, -0.2]);
        theta.push(0.0);
        theta.extend([0.0; 4]);
        let parts = model.breakdown(&theta).expect("length matches");

        let y = counts();
        let expected: f64 = (0..3)
            .flat_map(|j| (0..4).map(move |i| (i, j)))
            .map(|(i, j)| -log_poisson_pmf(y[(i, j)], f64::exp(b0[j])))
            .sum();
        assert_relative_eq!(parts.observation, expected, epsilon = 1.0e-10);
        assert_relative_eq!(
            parts.random_effects,
            -4.0 * log_standard_normal_pdf(0.0),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn report_lam_is_scores_times_loadings() {
        let input = LatentInput::new(counts(), 2);
        let model = LatentVariableModel::poisson(input).expect("valid input");
        let mut theta = vec![0.0; 3];
        theta.extend([0.5, -1.0, 2.0]);
        theta.extend([0.0, 2.0_f64.ln()]);
        let u = [0.1, 0.2, 0.3, 0.4, -0.5, 0.6, -0.7, 0.8];
        theta.extend(u);
        let report = model.report(&theta).expect("length matches");

        assert_relative_eq!(report.newlam[(0, 0)], 1.0);
        assert_relative_eq!(report.newlam[(0, 1)], 0.5);
        assert_relative_eq!(report.newlam[(0, 2)], -1.0);
        assert_relative_eq!(report.newlam[(1, 0)], 0.0);
        assert_relative_eq!(report.newlam[(1, 1)], 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(report.newlam[(1, 2)], 2.0);

        // Row 2: u = (0.3, -0.7).
        assert_relative_eq!(report.u[(2, 1)], -0.7);
        assert_relative_eq!(report.lam[(2, 0)], 0.3, epsilon = 1.0e-12);
        assert_relative_eq!(report.lam[(2, 1)], 0.3 * 0.5 - 0.7 * 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(report.lam[(2, 2)], -0.3 - 0.7 * 2.0, epsilon = 1.0e-12);
    }

    #[test]
    fn covariates_shift_every_row_by_their_coefficient() {
        let input = LatentInput::new(counts(), 1)
            .with_covariates(Mat::from_fn(4, 1, |i, _| usize_to_f64(i)));
        let model = LatentVariableModel::poisson(input).expect("valid input");
        let mut theta = vec![0.0; 3];
        theta.extend([0.25, 0.0, -0.5]);
        theta.extend([0.0, 0.0]);
        theta.push(0.0);
        theta.extend([0.0; 4]);
        let report = model.report(&theta).expect("length matches");
        assert_relative_eq!(report.b[(0, 2)], -0.5);

        let y = counts();
        let expected: f64 = (0..3)
            .flat_map(|j| (0..4).map(move |i| (i, j)))
            .map(|(i, j)| {
                let eta = usize_to_f64(i) * [0.25, 0.0, -0.5][j];
                -log_poisson_pmf(y[(i, j)], eta.exp())
            })
            .sum();
        assert_relative_eq!(report.breakdown.observation, expected, epsilon = 1.0e-10);
    }

    #[test]
    fn packed_loadings_use_one_vector() {
        let input = LatentInput::new(counts(), 2);
        let options = LatentOptions {
            family: ResponseFamily::Poisson,
            loadings: LoadingParametrization::Packed,
        };
        let model = LatentVariableModel::new(input, options).expect("valid input");
        let layout = model.layout();
        assert_eq!(layout.range_of("lambda"), Some(3..8));
        assert_eq!(layout.range_of("loglam"), Some(8..8));
        let mut theta = vec![0.0; 3];
        theta.extend([1.0, 2.0, 3.0, -4.0, 5.0]);
        theta.extend([0.0; 8]);
        let report = model.report(&theta).expect("length matches");
        assert_relative_eq!(report.newlam[(1, 1)], -4.0);
        assert_relative_eq!(report.newlam[(1, 0)], 0.0);
    }

    #[test]
    fn unsupported_response_is_rejected() {
        let mut y = counts();
        y[(0, 0)] = 0.5;
        let input = LatentInput::new(y, 1);
        let options = LatentOptions {
            family: ResponseFamily::bernoulli(),
            loadings: LoadingParametrization::LogDiagonal,
        };
        assert!(matches!(
            LatentVariableModel::new(input, options),
            Err(ObjectiveError::LatentInput(_))
        ));
    }
}
