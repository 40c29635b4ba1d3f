//! # Objective configuration
//!
//! Model choices that are not data: the response family, the covariance diagonal
//! convention, and the loading parametrization. Stored as TOML.
//!
//! ```
//! use glmm_objectives::{DiagonalConvention, ObjectiveConfig, ResponseFamily};
//!
//! let config = ObjectiveConfig::from_toml_str(
//!     r#"
//!     diagonal = "standard_deviation"
//!
//!     [family]
//!     kind = "binomial"
//!     trials = 1
//!     "#,
//! )
//! .expect("valid configuration");
//! assert_eq!(config.family, ResponseFamily::bernoulli());
//! assert_eq!(config.diagonal, DiagonalConvention::StandardDeviation);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::families::ResponseFamily;
use crate::models::correlated::CorrelatedOptions;
use crate::models::latent::LatentOptions;
use crate::structure::{DiagonalConvention, LoadingParametrization};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    pub diagonal: DiagonalConvention,
    pub loadings: LoadingParametrization,
    pub family: ResponseFamily,
}

impl ObjectiveConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::TomlParse` if `source` is not a valid configuration.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&source)?;
        log::debug!("loaded objective configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::TomlSerialize` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    #[must_use]
    pub const fn correlated_options(&self) -> CorrelatedOptions {
        CorrelatedOptions {
            family: self.family,
            diagonal: self.diagonal,
        }
    }

    #[must_use]
    pub const fn latent_options(&self) -> LatentOptions {
        LatentOptions {
            family: self.family,
            loadings: self.loadings,
        }
    }
}
