//! Multivariate response input for latent-variable models.
//!
//! Holds an `n x p` response matrix, an `n x q` covariate matrix shared across
//! responses (possibly with zero columns), and the number of latent dimensions.

use faer::Mat;
use thiserror::Error;

use crate::families::ResponseFamily;
use crate::utils::matrix_is_finite;

/// Errors returned when validating latent-variable inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LatentInputError {
    #[error("response matrix must have at least one row and one column")]
    EmptyResponses,
    #[error("covariate rows ({covariate_rows}) must match response rows ({rows})")]
    DimensionMismatch { rows: usize, covariate_rows: usize },
    #[error("latent dimension ({num_lv}) must be between 1 and the number of responses ({responses})")]
    InvalidLatentDimension { num_lv: usize, responses: usize },
    #[error("response matrix contains non-finite values")]
    NonFiniteResponse,
    #[error("covariate matrix contains non-finite values")]
    NonFiniteCovariates,
    #[error("response ({row}, {col}) lies outside the support of the response family")]
    OutcomeOutOfSupport { row: usize, col: usize },
}

#[derive(Debug, Clone)]
pub struct LatentInput {
    pub responses: Mat<f64>,
    pub covariates: Mat<f64>,
    pub num_lv: usize,
}

impl LatentInput {
    /// Input without covariates; each response keeps only its own intercept.
    #[must_use]
    pub fn new(responses: Mat<f64>, num_lv: usize) -> Self {
        let covariates = Mat::<f64>::zeros(responses.nrows(), 0);
        Self {
            responses,
            covariates,
            num_lv,
        }
    }

    #[must_use]
    pub fn with_covariates(mut self, covariates: Mat<f64>) -> Self {
        self.covariates = covariates;
        self
    }

    /// Number of sites (rows).
    #[must_use]
    pub fn nobs(&self) -> usize {
        self.responses.nrows()
    }

    /// Number of responses (columns), `p`.
    #[must_use]
    pub fn nresponses(&self) -> usize {
        self.responses.ncols()
    }

    /// Number of covariates, `q`.
    #[must_use]
    pub fn ncovariates(&self) -> usize {
        self.covariates.ncols()
    }

    /// # Errors
    ///
    /// Returns `LatentInputError` if shapes or values are malformed, or if a response
    /// is outside the support of `family`.
    pub fn validate_for(&self, family: ResponseFamily) -> Result<(), LatentInputError> {
        if self.responses.nrows() == 0 || self.responses.ncols() == 0 {
            return Err(LatentInputError::EmptyResponses);
        }
        if self.covariates.nrows() != self.responses.nrows() {
            return Err(LatentInputError::DimensionMismatch {
                rows: self.responses.nrows(),
                covariate_rows: self.covariates.nrows(),
            });
        }
        if self.num_lv == 0 || self.num_lv > self.nresponses() {
            return Err(LatentInputError::InvalidLatentDimension {
                num_lv: self.num_lv,
                responses: self.nresponses(),
            });
        }
        if !matrix_is_finite(&self.responses) {
            return Err(LatentInputError::NonFiniteResponse);
        }
        if !matrix_is_finite(&self.covariates) {
            return Err(LatentInputError::NonFiniteCovariates);
        }
        for col in 0..self.nresponses() {
            for row in 0..self.nobs() {
                if !family.supports_outcome(self.responses[(row, col)]) {
                    return Err(LatentInputError::OutcomeOutOfSupport { row, col });
                }
            }
        }
        Ok(())
    }
}
