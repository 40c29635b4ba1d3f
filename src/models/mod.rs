//! # Models
//!
//! Negative log-likelihood objectives over flat parameter vectors: fixed-effect GLMs,
//! scalar and correlated random effects, a sparse-factor GLMM, and a latent-variable
//! model for multivariate responses. Every model implements [`Objective`].

pub mod correlated;
pub mod latent;
pub mod linear;
pub mod matrix_ops;
pub mod objective;
pub mod random_intercept;
pub mod report;
pub mod sparse_glmm;

pub use objective::{
    Objective, ObjectiveBreakdown, ObjectiveError, ParameterBlock, ParameterLayout,
};
