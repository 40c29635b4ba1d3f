//! # Structured matrices
//!
//! Builders that turn flat, unconstrained parameter slices into the structured
//! matrices used by the objectives: compound-symmetric covariance matrices,
//! triangular latent loadings, and sparse factors filled through an indicator map.
//!
//! Every builder is a pure function of its inputs. Shape problems are reported as
//! [`StructureError`] before any value is produced; numeric edge cases (for example a
//! correlation that rounds to exactly one) are left in the output so the likelihood can
//! surface them as a non-finite objective.

use thiserror::Error;

pub mod covariance;
pub mod loadings;
pub mod sparse;

pub use covariance::{
    CompoundSymmetric, DiagonalConvention, correlation_from_unconstrained,
    unconstrained_from_correlation,
};
pub use loadings::{LoadingParametrization, TriangularLoadings};
pub use sparse::{ParameterIndicator, fill_from_indicator, sparse_from_triplets, stored_len};

/// Errors returned when structural metadata and parameter slices disagree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("{name} requires {expected} values; found {found}")]
    ParameterLength {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("covariance dimension must be positive")]
    EmptyCovariance,
    #[error("latent dimension ({num_lv}) must be between 1 and the number of responses ({responses})")]
    InvalidLatentDimension { num_lv: usize, responses: usize },
    #[error("indicator at position {position} is {value}; expected a value in 1..={pool}")]
    IndicatorOutOfRange {
        position: usize,
        value: i64,
        pool: usize,
    },
    #[error("indicator length ({indicators}) must equal the number of stored entries ({stored})")]
    IndicatorLengthMismatch { indicators: usize, stored: usize },
    #[error("sparse entry ({row}, {col}) lies outside a {nrows} x {ncols} matrix")]
    EntryOutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },
    #[error("failed to assemble a {nrows} x {ncols} sparse matrix")]
    SparseAssembly { nrows: usize, ncols: usize },
}
