//! Objective trait, flat-parameter layout, and the error type shared by every model.
//!
//! An objective is a pure function of a fixed data bundle and a flat parameter vector.
//! The layout names the blocks of that vector in order, so callers can build starting
//! values and read fitted values back without knowing model internals.

use std::ops::Range;

use serde::Serialize;
use thiserror::Error;

use crate::families::ResponseFamily;
use crate::input::{InputError, LatentInputError};
use crate::structure::StructureError;

/// Errors returned before an objective is evaluated.
///
/// Domain problems during evaluation (a non-positive variance, a covariance that does
/// not factor) are never reported here; they surface as a non-finite objective value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectiveError {
    #[error("parameter vector has {found} values; layout requires {expected}")]
    ParameterLength { expected: usize, found: usize },
    #[error("random design has {columns} columns; covariance dimension is {dimension}")]
    RandomDesignWidth { columns: usize, dimension: usize },
    #[error("{what} has dimension {found}; expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    LatentInput(#[from] LatentInputError),
    #[error(transparent)]
    Structure(#[from] StructureError),
}

/// One named, contiguous block of the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterBlock {
    pub name: &'static str,
    pub len: usize,
}

/// Ordered blocks of a flat parameter vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterLayout {
    blocks: Vec<ParameterBlock>,
}

impl ParameterLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Append a block. Zero-length blocks are kept so every model reports the same
    /// block names regardless of family.
    #[must_use]
    pub fn with_block(mut self, name: &'static str, len: usize) -> Self {
        self.blocks.push(ParameterBlock { name, len });
        self
    }

    /// Append the family-level parameters as one block named after the family's
    /// parameter (`log_sd`, `log_k`, `alpha`), or an empty `family` block.
    #[must_use]
    pub fn with_family(self, family: ResponseFamily) -> Self {
        let name = family.parameter_names().first().copied().unwrap_or("family");
        self.with_block(name, family.parameter_count())
    }

    #[must_use]
    pub fn blocks(&self) -> &[ParameterBlock] {
        &self.blocks
    }

    /// Total number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|block| block.len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the first block called `name`.
    #[must_use]
    pub fn range_of(&self, name: &str) -> Option<Range<usize>> {
        let mut start = 0;
        for block in &self.blocks {
            if block.name == name {
                return Some(start..start + block.len);
            }
            start += block.len;
        }
        None
    }

    /// Per-entry labels such as `beta[0]`; scalar blocks keep their bare name.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|block| {
                (0..block.len).map(move |i| {
                    if block.len == 1 {
                        block.name.to_string()
                    } else {
                        format!("{}[{i}]", block.name)
                    }
                })
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `ObjectiveError::ParameterLength` if `theta.len()` differs from
    /// [`Self::len`].
    pub fn check(&self, theta: &[f64]) -> Result<(), ObjectiveError> {
        let expected = self.len();
        if theta.len() != expected {
            log::debug!(
                "rejecting parameter vector of length {} (expected {expected})",
                theta.len()
            );
            return Err(ObjectiveError::ParameterLength {
                expected,
                found: theta.len(),
            });
        }
        Ok(())
    }

    /// Check `theta` and return a reader positioned at its first block.
    ///
    /// # Errors
    ///
    /// Returns `ObjectiveError::ParameterLength` if the lengths disagree.
    pub(crate) fn reader<'a>(&self, theta: &'a [f64]) -> Result<ParameterReader<'a>, ObjectiveError> {
        self.check(theta)?;
        Ok(ParameterReader { rest: theta })
    }
}

/// Cursor over a checked parameter vector, consumed block by block.
#[derive(Debug)]
pub(crate) struct ParameterReader<'a> {
    rest: &'a [f64],
}

impl<'a> ParameterReader<'a> {
    /// Next `len` values. A reader only exists for a vector that matched its layout,
    /// so reading past the end yields an empty tail instead of panicking.
    pub(crate) fn take(&mut self, len: usize) -> &'a [f64] {
        let split = len.min(self.rest.len());
        let (head, tail) = self.rest.split_at(split);
        self.rest = tail;
        head
    }

    pub(crate) fn scalar(&mut self) -> f64 {
        self.take(1).first().copied().unwrap_or(f64::NAN)
    }
}

/// The two additive parts of a negative log-likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectiveBreakdown {
    /// `-Σ log f(y_i | eta_i)` over observations.
    pub observation: f64,
    /// Penalty on the random effects or latent scores; zero for fixed-effect models.
    pub random_effects: f64,
    pub total: f64,
}

impl ObjectiveBreakdown {
    #[must_use]
    pub fn new(observation: f64, random_effects: f64) -> Self {
        Self {
            observation,
            random_effects,
            total: observation + random_effects,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.total.is_finite()
    }
}

/// A negative log-likelihood over a flat parameter vector.
pub trait Objective {
    /// Fitted quantities recomputed from a parameter vector.
    type Report: Serialize;

    fn layout(&self) -> ParameterLayout;

    /// Observation and random-effect contributions at `theta`.
    ///
    /// # Errors
    ///
    /// Returns `ObjectiveError` only for precondition violations; domain violations
    /// produce a non-finite breakdown.
    fn breakdown(&self, theta: &[f64]) -> Result<ObjectiveBreakdown, ObjectiveError>;

    /// Named quantities derived from `theta` for post-fit reporting.
    ///
    /// # Errors
    ///
    /// Returns `ObjectiveError` if `theta` does not match the layout.
    fn report(&self, theta: &[f64]) -> Result<Self::Report, ObjectiveError>;

    /// # Errors
    ///
    /// Returns `ObjectiveError` if `theta` does not match the layout.
    fn negative_log_likelihood(&self, theta: &[f64]) -> Result<f64, ObjectiveError> {
        Ok(self.breakdown(theta)?.total)
    }

    /// # Errors
    ///
    /// Returns `ObjectiveError::ParameterLength` if `theta` does not match the layout.
    fn check(&self, theta: &[f64]) -> Result<(), ObjectiveError> {
        self.layout().check(theta)
    }
}

/// Sum `-log f(y_i | eta_i)` over observations.
pub(crate) fn observation_nll<F>(count: usize, term: F) -> f64
where
    F: Fn(usize) -> f64,
{
    -(0..count).map(term).sum::<f64>()
}
