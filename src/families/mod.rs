/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Response families, link functions, and log densities.
//
// Created on: 24 Jan 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Response families
//!
//! A single tagged variant over the supported observation distributions. Each
//! variant carries its link, the number of family-level parameters it reads from the
//! flat parameter vector, the support check applied to outcomes, and a log density
//! evaluated directly from the linear predictor.

use serde::{Deserialize, Serialize};

pub mod density;
pub mod multivariate;

pub use density::{
    ln_choose, log_binomial_robust, log_nbinom_mean_variance, log_nbinom_size, log_normal_pdf,
    log_poisson_pmf, log_standard_normal_pdf,
};
pub use multivariate::MultivariateNormal;

use crate::utils::logistic_stable;

/// Link between the linear predictor and the mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    Identity,
    Log,
    Logit,
}

impl Link {
    /// Mean implied by the linear predictor.
    #[must_use]
    pub fn inverse(self, eta: f64) -> f64 {
        match self {
            Self::Identity => eta,
            Self::Log => eta.exp(),
            Self::Logit => logistic_stable(eta),
        }
    }
}

/// Mean-variance relation for the negative binomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NbVariance {
    /// `var = mu + k * mu^2`; the parameter vector stores `log k`.
    #[default]
    Quadratic,
    /// `var = mu + mu^2 / alpha`; the parameter vector stores `alpha` untransformed.
    Overdispersion,
}

impl NbVariance {
    /// Variance for mean `mu` and dispersion `scale` (`k` or `alpha`).
    #[must_use]
    pub fn variance(self, mu: f64, scale: f64) -> f64 {
        match self {
            Self::Quadratic => scale.mul_add(mu * mu, mu),
            Self::Overdispersion => mu + mu * mu / scale,
        }
    }

    /// Size (inverse overdispersion) for dispersion `scale`; independent of the mean
    /// under both relations. `k = 0` gives the Poisson limit.
    #[must_use]
    pub fn size(self, scale: f64) -> f64 {
        match self {
            Self::Quadratic => scale.recip(),
            Self::Overdispersion => scale,
        }
    }

    /// Dispersion scale from its stored parameter.
    #[must_use]
    pub fn scale_from_parameter(self, raw: f64) -> f64 {
        match self {
            Self::Quadratic => raw.exp(),
            Self::Overdispersion => raw,
        }
    }
}

/// Observation distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseFamily {
    /// Normal response, identity link; reads one `log_sd` parameter.
    #[default]
    Gaussian,
    /// Poisson counts, log link.
    Poisson,
    /// Negative-binomial counts, log link; reads one dispersion parameter.
    NegativeBinomial {
        #[serde(default)]
        variance: NbVariance,
    },
    /// Binomial successes out of `trials`, robust logit link.
    Binomial { trials: u32 },
}

impl ResponseFamily {
    /// Single-trial binomial.
    #[must_use]
    pub const fn bernoulli() -> Self {
        Self::Binomial { trials: 1 }
    }

    #[must_use]
    pub const fn link(self) -> Link {
        match self {
            Self::Gaussian => Link::Identity,
            Self::Poisson | Self::NegativeBinomial { .. } => Link::Log,
            Self::Binomial { .. } => Link::Logit,
        }
    }

    /// Names of the family-level parameters, in parameter-vector order.
    #[must_use]
    pub const fn parameter_names(self) -> &'static [&'static str] {
        match self {
            Self::Gaussian => &["log_sd"],
            Self::NegativeBinomial { variance } => match variance {
                NbVariance::Quadratic => &["log_k"],
                NbVariance::Overdispersion => &["alpha"],
            },
            Self::Poisson | Self::Binomial { .. } => &[],
        }
    }

    #[must_use]
    pub const fn parameter_count(self) -> usize {
        self.parameter_names().len()
    }

    /// Whether `y` lies in the support of the distribution.
    #[must_use]
    pub fn supports_outcome(self, y: f64) -> bool {
        if !y.is_finite() {
            return false;
        }
        match self {
            Self::Gaussian => true,
            Self::Poisson | Self::NegativeBinomial { .. } => y >= 0.0,
            Self::Binomial { trials } => (0.0..=f64::from(trials)).contains(&y),
        }
    }

    /// Fix the family-level parameters for one evaluation.
    ///
    /// `params` must hold [`Self::parameter_count`] values; missing values resolve to
    /// `NaN`, which propagates into the objective.
    #[must_use]
    pub fn resolve(self, params: &[f64]) -> ResolvedFamily {
        let raw = params.first().copied().unwrap_or(f64::NAN);
        let scale = match self {
            Self::Gaussian => raw.exp(),
            Self::NegativeBinomial { variance } => variance.scale_from_parameter(raw),
            Self::Poisson | Self::Binomial { .. } => 1.0,
        };
        ResolvedFamily {
            family: self,
            scale,
        }
    }
}

/// A family with its scale parameter fixed: the residual sd for the Gaussian, `k` or
/// `alpha` for the negative binomial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedFamily {
    pub family: ResponseFamily,
    pub scale: f64,
}

impl ResolvedFamily {
    /// Conditional mean for linear predictor `eta`.
    #[must_use]
    pub fn mean(&self, eta: f64) -> f64 {
        self.family.link().inverse(eta)
    }

    /// `log f(y | eta)`.
    #[must_use]
    pub fn log_density(&self, y: f64, eta: f64) -> f64 {
        match self.family {
            ResponseFamily::Gaussian => log_normal_pdf(y, eta, self.scale),
            ResponseFamily::Poisson => log_poisson_pmf(y, eta.exp()),
            ResponseFamily::NegativeBinomial { variance } => {
                log_nbinom_size(y, eta.exp(), variance.size(self.scale))
            }
            ResponseFamily::Binomial { trials } => {
                log_binomial_robust(y, f64::from(trials), eta)
            }
        }
    }
}
