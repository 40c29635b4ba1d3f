//! # Model inputs
//!
//! Immutable data bundles handed to the objectives: an outcome column, a fixed-effect
//! design matrix, and optionally a group index and a random-effect design matrix.
//! Structural problems are reported here, once, so that objective evaluation never has
//! to re-check them.
//!
//! # Examples
//!
//! ```
//! use faer::Mat;
//! use glmm_objectives::{GroupIndex, ModelInput, ResponseFamily};
//!
//! let design_matrix = Mat::from_fn(4, 1, |_, _| 1.0);
//! let outcome = Mat::from_fn(4, 1, |i, _| if i % 2 == 0 { 0.0 } else { 3.0 });
//! let groups = GroupIndex::from_one_based(&[1, 1, 2, 2], 2).expect("groups in range");
//! let input = ModelInput::new(design_matrix, outcome).with_groups(groups);
//!
//! assert!(input.validate_for(ResponseFamily::Poisson).is_ok());
//! assert!(input.validate_for(ResponseFamily::bernoulli()).is_err());
//! ```
//!
//! ```
//! use glmm_objectives::GroupIndex;
//!
//! // Group labels are 1-based; zero is rejected.
//! assert!(GroupIndex::from_one_based(&[1, 0, 2], 2).is_err());
//! ```

use faer::Mat;
use num_traits::ToPrimitive;
use thiserror::Error;

use crate::families::ResponseFamily;
use crate::utils::matrix_is_finite;

pub mod latent;

pub use latent::{LatentInput, LatentInputError};

/// Errors returned when validating model inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("design matrix must have at least one column")]
    EmptyDesign,
    #[error("outcome must be a single column matrix")]
    InvalidOutcomeShape,
    #[error("design matrix rows ({rows}) must match outcome rows ({len})")]
    DimensionMismatch { rows: usize, len: usize },
    #[error("design matrix contains non-finite values")]
    NonFiniteDesign,
    #[error("outcome contains non-finite values")]
    NonFiniteOutcome,
    #[error("outcome at row {row} lies outside the support of the {family} family")]
    OutcomeOutOfSupport { row: usize, family: &'static str },
    #[error("number of groups must be positive")]
    EmptyGroups,
    #[error("group label at position {position} is {value}; expected a value in 1..={ngroups}")]
    GroupOutOfRange {
        position: usize,
        value: i64,
        ngroups: usize,
    },
    #[error("group index length ({labels}) must match outcome rows ({rows})")]
    InvalidGroupLength { labels: usize, rows: usize },
    #[error("model requires a group index")]
    MissingGroups,
    #[error("model requires a random-effect design matrix")]
    MissingRandomDesign,
    #[error("random-effect design rows ({rows}) must match outcome rows ({len})")]
    RandomDesignMismatch { rows: usize, len: usize },
    #[error("random-effect design matrix must have at least one column")]
    EmptyRandomDesign,
    #[error("random-effect design matrix contains non-finite values")]
    NonFiniteRandomDesign,
}

/// Validated map from observations to random-effect levels.
///
/// Labels arrive 1-based and are stored 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupIndex {
    groups: Vec<usize>,
    ngroups: usize,
}

impl GroupIndex {
    /// # Errors
    ///
    /// Returns `InputError::EmptyGroups` if `ngroups == 0`, or
    /// `InputError::GroupOutOfRange` for the first label outside `1..=ngroups`.
    pub fn from_one_based(labels: &[i64], ngroups: usize) -> Result<Self, InputError> {
        if ngroups == 0 {
            return Err(InputError::EmptyGroups);
        }
        let groups = labels
            .iter()
            .enumerate()
            .map(|(position, &value)| {
                value
                    .to_usize()
                    .filter(|label| (1..=ngroups).contains(label))
                    .map(|label| label - 1)
                    .ok_or(InputError::GroupOutOfRange {
                        position,
                        value,
                        ngroups,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups, ngroups })
    }

    /// # Errors
    ///
    /// Returns `InputError` if `ngroups == 0` or any label is `>= ngroups`.
    pub fn from_zero_based(groups: Vec<usize>, ngroups: usize) -> Result<Self, InputError> {
        if ngroups == 0 {
            return Err(InputError::EmptyGroups);
        }
        if let Some((position, &label)) = groups.iter().enumerate().find(|&(_, &g)| g >= ngroups)
        {
            return Err(InputError::GroupOutOfRange {
                position,
                value: label.to_i64().map_or(i64::MAX, |v| v.saturating_add(1)),
                ngroups,
            });
        }
        Ok(Self { groups, ngroups })
    }

    /// Every observation in one group.
    #[must_use]
    pub fn single(len: usize) -> Self {
        Self {
            groups: vec![0; len],
            ngroups: 1,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub const fn ngroups(&self) -> usize {
        self.ngroups
    }

    /// 0-based group of observation `row`.
    #[must_use]
    pub fn group(&self, row: usize) -> usize {
        self.groups[row]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.groups
    }

    /// Observations per group.
    #[must_use]
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.ngroups];
        for &g in &self.groups {
            counts[g] += 1;
        }
        counts
    }
}

#[derive(Debug, Clone)]
pub struct ModelInput {
    pub design_matrix: Mat<f64>,
    pub outcome: Mat<f64>,
    pub groups: Option<GroupIndex>,
    pub random_design: Option<Mat<f64>>,
}

impl ModelInput {
    #[must_use]
    pub const fn new(design_matrix: Mat<f64>, outcome: Mat<f64>) -> Self {
        Self {
            design_matrix,
            outcome,
            groups: None,
            random_design: None,
        }
    }

    #[must_use]
    pub fn with_groups(self, groups: GroupIndex) -> Self {
        Self {
            groups: Some(groups),
            ..self
        }
    }

    /// Per-observation random-effect covariates (one column per random-effect
    /// component), used together with the group index.
    #[must_use]
    pub fn with_random_design(mut self, random_design: Mat<f64>) -> Self {
        self.random_design = Some(random_design);
        self
    }

    #[must_use]
    pub const fn design_matrix(&self) -> &Mat<f64> {
        &self.design_matrix
    }

    #[must_use]
    pub const fn outcome(&self) -> &Mat<f64> {
        &self.outcome
    }

    #[must_use]
    pub const fn groups(&self) -> Option<&GroupIndex> {
        self.groups.as_ref()
    }

    #[must_use]
    pub const fn random_design(&self) -> Option<&Mat<f64>> {
        self.random_design.as_ref()
    }

    #[must_use]
    pub fn nobs(&self) -> usize {
        self.outcome.nrows()
    }

    /// Number of fixed-effect coefficients.
    #[must_use]
    pub fn ncoef(&self) -> usize {
        self.design_matrix.ncols()
    }

    /// Validate design matrix and outcome only.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if core inputs are malformed.
    pub fn validate_core(&self) -> Result<(), InputError> {
        if self.design_matrix.ncols() == 0 {
            return Err(InputError::EmptyDesign);
        }
        if self.outcome.ncols() != 1 {
            return Err(InputError::InvalidOutcomeShape);
        }
        if self.design_matrix.nrows() != self.outcome.nrows() {
            return Err(InputError::DimensionMismatch {
                rows: self.design_matrix.nrows(),
                len: self.outcome.nrows(),
            });
        }
        if !matrix_is_finite(&self.design_matrix) {
            return Err(InputError::NonFiniteDesign);
        }
        if !matrix_is_finite(&self.outcome) {
            return Err(InputError::NonFiniteOutcome);
        }
        Ok(())
    }

    /// Validate shapes, the optional group index and random design, and that every
    /// outcome lies in the support of `family`.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if inputs are malformed.
    pub fn validate_for(&self, family: ResponseFamily) -> Result<(), InputError> {
        self.validate_core()?;
        if let Some(row) = (0..self.nobs()).find(|&i| !family.supports_outcome(self.outcome[(i, 0)])) {
            return Err(InputError::OutcomeOutOfSupport {
                row,
                family: family_name(family),
            });
        }
        if let Some(groups) = &self.groups
            && groups.len() != self.nobs()
        {
            return Err(InputError::InvalidGroupLength {
                labels: groups.len(),
                rows: self.nobs(),
            });
        }
        if let Some(z) = &self.random_design {
            if z.ncols() == 0 {
                return Err(InputError::EmptyRandomDesign);
            }
            if z.nrows() != self.nobs() {
                return Err(InputError::RandomDesignMismatch {
                    rows: z.nrows(),
                    len: self.nobs(),
                });
            }
            if !matrix_is_finite(z) {
                return Err(InputError::NonFiniteRandomDesign);
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InputError::MissingGroups` if no group index was attached.
    pub fn require_groups(&self) -> Result<&GroupIndex, InputError> {
        self.groups.as_ref().ok_or(InputError::MissingGroups)
    }

    /// # Errors
    ///
    /// Returns `InputError::MissingRandomDesign` if no random design was attached.
    pub fn require_random_design(&self) -> Result<&Mat<f64>, InputError> {
        self.random_design
            .as_ref()
            .ok_or(InputError::MissingRandomDesign)
    }
}

const fn family_name(family: ResponseFamily) -> &'static str {
    match family {
        ResponseFamily::Gaussian => "gaussian",
        ResponseFamily::Poisson => "poisson",
        ResponseFamily::NegativeBinomial { .. } => "negative binomial",
        ResponseFamily::Binomial { .. } => "binomial",
    }
}

/// Random design `[1, z_i]` for a correlated random intercept and slope.
#[must_use]
pub fn intercept_and_slope(z: &[f64]) -> Mat<f64> {
    Mat::from_fn(z.len(), 2, |i, j| if j == 0 { 1.0 } else { z[i] })
}
