//! GLMM with a sparse relative covariance factor filled from variance components.
//!
//! `eta = X beta + Z (Λ u)` with spherical effects `u ~ N(0, I)`. The pattern of `Λ` is
//! fixed; its stored entries are gathered from a short vector `theta` of variance
//! components through a 1-based indicator, so several entries can share a component.

use faer::Mat;
use faer::sparse::SparseColMat;
use serde::Serialize;

use crate::families::{NbVariance, ResolvedFamily, ResponseFamily, log_standard_normal_pdf};
use crate::input::ModelInput;
use crate::models::matrix_ops::{column_values, linear_predictor};
use crate::models::objective::{
    Objective, ObjectiveBreakdown, ObjectiveError, ParameterLayout, observation_nll,
};
use crate::models::report::serialize_mat;
use crate::structure::{ParameterIndicator, StructureError, fill_from_indicator, stored_len};
use crate::utils::column_from_slice;

/// Random-effect design, factor pattern, and the indicator tying them to `theta`.
#[derive(Debug, Clone)]
pub struct SparseEffects {
    /// `n x q` random-effect design.
    pub design: SparseColMat<usize, f64>,
    /// `q x q` factor pattern; stored values are ignored.
    pub pattern: SparseColMat<usize, f64>,
    pub indicator: ParameterIndicator,
}

impl SparseEffects {
    /// Build from 1-based indicator values over a pool of `n_theta` components.
    ///
    /// # Errors
    ///
    /// Returns `ObjectiveError::Structure` if an indicator is outside `1..=n_theta` or
    /// the indicator does not cover every stored entry of `pattern`.
    pub fn new(
        design: SparseColMat<usize, f64>,
        pattern: SparseColMat<usize, f64>,
        lind: &[i64],
        n_theta: usize,
    ) -> Result<Self, ObjectiveError> {
        let indicator = ParameterIndicator::from_one_based(lind, n_theta)?;
        if indicator.len() != stored_len(&pattern) {
            return Err(StructureError::IndicatorLengthMismatch {
                indicators: indicator.len(),
                stored: stored_len(&pattern),
            }
            .into());
        }
        Ok(Self {
            design,
            pattern,
            indicator,
        })
    }

    /// Number of spherical random effects, `q`.
    #[must_use]
    pub fn nranef(&self) -> usize {
        self.pattern.ncols()
    }

    /// Number of variance components.
    #[must_use]
    pub const fn ntheta(&self) -> usize {
        self.indicator.pool()
    }
}

/// Parameters: `theta[n_theta]`, `beta[p]`, `u[q]`, then the family parameters.
#[derive(Debug, Clone)]
pub struct SparseGlmmModel {
    input: ModelInput,
    effects: SparseEffects,
    family: ResponseFamily,
}

#[derive(Debug, Clone, Serialize)]
pub struct SparseGlmmReport {
    pub theta: Vec<f64>,
    pub beta: Vec<f64>,
    pub u: Vec<f64>,
    /// Random effects on the linear-predictor scale, `Λ u`.
    pub b: Vec<f64>,
    #[serde(serialize_with = "serialize_mat")]
    pub lambda: Mat<f64>,
    pub family: ResolvedFamily,
    pub breakdown: ObjectiveBreakdown,
}

struct Evaluation<'a> {
    theta: &'a [f64],
    beta: &'a [f64],
    u: &'a [f64],
    lambda: SparseColMat<usize, f64>,
    b: Vec<f64>,
    family: ResolvedFamily,
    breakdown: ObjectiveBreakdown,
}

impl SparseGlmmModel {
    /// # Errors
    ///
    /// Returns `ObjectiveError` if the input is malformed, an outcome is outside the
    /// support of `family`, or the sparse shapes do not chain
    /// (`n x q` design times `q x q` factor).
    pub fn new(
        input: ModelInput,
        effects: SparseEffects,
        family: ResponseFamily,
    ) -> Result<Self, ObjectiveError> {
        input.validate_for(family)?;
        let checks = [
            ("random-effect design rows", input.nobs(), effects.design.nrows()),
            ("random-effect design columns", effects.pattern.nrows(), effects.design.ncols()),
            ("factor pattern columns", effects.pattern.nrows(), effects.pattern.ncols()),
        ];
        for (what, expected, found) in checks {
            if expected != found {
                log::debug!("sparse glmm shape mismatch: {what} {found} != {expected}");
                return Err(ObjectiveError::DimensionMismatch {
                    what,
                    expected,
                    found,
                });
            }
        }
        Ok(Self {
            input,
            effects,
            family,
        })
    }

    /// Negative-binomial response with `var = mu + mu^2 / alpha`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::new`].
    pub fn negative_binomial(
        input: ModelInput,
        effects: SparseEffects,
    ) -> Result<Self, ObjectiveError> {
        Self::new(
            input,
            effects,
            ResponseFamily::NegativeBinomial {
                variance: NbVariance::Overdispersion,
            },
        )
    }

    #[must_use]
    pub const fn effects(&self) -> &SparseEffects {
        &self.effects
    }

    #[must_use]
    pub const fn family(&self) -> ResponseFamily {
        self.family
    }

    fn evaluate<'a>(&self, params: &'a [f64]) -> Result<Evaluation<'a>, ObjectiveError> {
        let mut reader = self.layout().reader(params)?;
        let theta = reader.take(self.effects.ntheta());
        let beta = reader.take(self.input.ncoef());
        let u = reader.take(self.effects.nranef());
        let family = self.family.resolve(reader.take(self.family.parameter_count()));

        let lambda = fill_from_indicator(&self.effects.pattern, &self.effects.indicator, theta)?;
        let random_effects = -u.iter().map(|&value| log_standard_normal_pdf(value)).sum::<f64>();

        let b = &lambda * &column_from_slice(u);
        let zb = column_values(&(&self.effects.design * &b), 0);
        let b = column_values(&b, 0);
        let xb = linear_predictor(&self.input.design_matrix, beta);
        let y = &self.input.outcome;
        let observation = observation_nll(xb.len(), |i| family.log_density(y[(i, 0)], xb[i] + zb[i]));

        let breakdown = ObjectiveBreakdown::new(observation, random_effects);
        log::trace!("sparse glmm nll = {}", breakdown.total);
        Ok(Evaluation {
            theta,
            beta,
            u,
            lambda,
            b,
            family,
            breakdown,
        })
    }
}

impl Objective for SparseGlmmModel {
    type Report = SparseGlmmReport;

    fn layout(&self) -> ParameterLayout {
        ParameterLayout::new()
            .with_block("theta", self.effects.ntheta())
            .with_block("beta", self.input.ncoef())
            .with_block("u", self.effects.nranef())
            .with_family(self.family)
    }

    fn breakdown(&self, theta: &[f64]) -> Result<ObjectiveBreakdown, ObjectiveError> {
        Ok(self.evaluate(theta)?.breakdown)
    }

    fn report(&self, theta: &[f64]) -> Result<SparseGlmmReport, ObjectiveError> {
        let eval = self.evaluate(theta)?;
        Ok(SparseGlmmReport {
            theta: eval.theta.to_vec(),
            beta: eval.beta.to_vec(),
            u: eval.u.to_vec(),
            b: eval.b,
            lambda: eval.lambda.as_ref().to_dense(),
            family: eval.family,
            breakdown: eval.breakdown,
        })
    }
}
