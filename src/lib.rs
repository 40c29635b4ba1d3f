#![forbid(unsafe_code)]

//! # `glmm_objectives`
//!
//! Negative log-likelihood objectives for generalized linear mixed models: Gaussian,
//! Poisson, negative-binomial and binomial responses with random intercepts, correlated
//! random intercepts and slopes, sparse relative covariance factors, and latent
//! variables with triangular loadings.
//!
//! Each objective is a pure function of a validated data bundle and a flat parameter
//! vector, meant to be handed to an external optimizer. Malformed inputs and parameter
//! vectors of the wrong length are rejected with an error before anything is computed;
//! parameter values outside a distribution's domain produce a non-finite objective so
//! the optimizer can backtrack.
//!
//! ```
//! use faer::Mat;
//! use glmm_objectives::{LinearModel, ModelInput, Objective};
//!
//! let x = Mat::from_fn(3, 2, |i, j| if j == 0 { 1.0 } else { [0.0, 1.0, 2.0][i] });
//! let y = Mat::from_fn(3, 1, |i, _| [1.0, 2.0, 2.9][i]);
//! let model = LinearModel::gaussian(ModelInput::new(x, y)).expect("valid input");
//!
//! // beta = (1, 1), log_sd = 0
//! let nll = model.negative_log_likelihood(&[1.0, 1.0, 0.0]).expect("length matches");
//! let expected = 1.5 * std::f64::consts::TAU.ln() + 0.5 * 0.01;
//! assert!((nll - expected).abs() < 1e-12);
//! ```

pub mod config;
pub mod families;
pub mod input;
pub mod models;
pub mod structure;
pub mod utils;

pub use config::{ConfigError, ObjectiveConfig};
pub use families::{Link, MultivariateNormal, NbVariance, ResolvedFamily, ResponseFamily};
pub use input::{
    GroupIndex, InputError, LatentInput, LatentInputError, ModelInput, intercept_and_slope,
};
pub use structure::{
    CompoundSymmetric, DiagonalConvention, LoadingParametrization, ParameterIndicator,
    StructureError, TriangularLoadings, fill_from_indicator, sparse_from_triplets,
};

pub use models::{Objective, ObjectiveBreakdown, ObjectiveError, ParameterBlock, ParameterLayout};

pub use models::linear::{GaussianSampleModel, GaussianSampleReport, LinearModel, LinearReport};

pub use models::random_intercept::{RandomInterceptModel, RandomInterceptReport};

pub use models::correlated::{CorrelatedEffectsModel, CorrelatedEffectsReport, CorrelatedOptions};

pub use models::sparse_glmm::{SparseEffects, SparseGlmmModel, SparseGlmmReport};

pub use models::latent::{LatentOptions, LatentVariableModel, LatentVariableReport};

pub use models::report::{render_breakdown_table, render_matrix_table, render_parameter_table};
