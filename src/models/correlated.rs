//! Vector-valued random effects with a compound-symmetric covariance.
//!
//! Each group `j` carries `k` effects `u[:, j]`, one per column of the random design
//! `Z`. Observation `i` in group `g` has
//!
//! `eta_i = x_i' beta + Σ_c Z[i, c] u[c, g]`
//!
//! and every group contributes `-log MVN(u[:, j]; 0, Σ)`, where `Σ` is built from `k`
//! log standard deviations and one unconstrained correlation. A random intercept and
//! slope uses `Z = [1, z_i]`; an all-ones `Z` gives a scalar random intercept evaluated
//! through the multivariate density.

use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::families::{MultivariateNormal, ResolvedFamily, ResponseFamily};
use crate::input::{GroupIndex, ModelInput};
use crate::models::matrix_ops::linear_predictor;
use crate::models::objective::{
    Objective, ObjectiveBreakdown, ObjectiveError, ParameterLayout, observation_nll,
};
use crate::models::report::serialize_mat;
use crate::structure::{CompoundSymmetric, DiagonalConvention};
use crate::utils::mat_from_column_major;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CorrelatedOptions {
    /// Observation family.
    #[serde(default)]
    pub family: ResponseFamily,
    /// Whether the covariance diagonal holds variances or standard deviations.
    #[serde(default)]
    pub diagonal: DiagonalConvention,
}

/// Parameters: `beta[p]`, `u[k x ngroups]` (column-major, one group's `k` effects
/// contiguous), `log_sd_u[k]`, the family parameters, `transformed_rho`.
#[derive(Debug, Clone)]
pub struct CorrelatedEffectsModel {
    input: ModelInput,
    groups: GroupIndex,
    random_design: Mat<f64>,
    options: CorrelatedOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedEffectsReport {
    pub beta: Vec<f64>,
    /// `k x ngroups` random effects.
    #[serde(serialize_with = "serialize_mat")]
    pub u: Mat<f64>,
    pub sd: Vec<f64>,
    pub rho: f64,
    pub diagonal: DiagonalConvention,
    #[serde(serialize_with = "serialize_mat")]
    pub covariance: Mat<f64>,
    pub family: ResolvedFamily,
    pub breakdown: ObjectiveBreakdown,
}

impl CorrelatedEffectsReport {
    /// Rebuild the covariance structure from the reported `sd` and `rho`.
    #[must_use]
    pub fn covariance_structure(&self) -> CompoundSymmetric {
        CompoundSymmetric::from_parts(self.sd.clone(), self.rho, self.diagonal)
    }
}

struct Evaluation<'a> {
    beta: &'a [f64],
    u: &'a [f64],
    structure: CompoundSymmetric,
    family: ResolvedFamily,
    breakdown: ObjectiveBreakdown,
}

impl CorrelatedEffectsModel {
    /// # Errors
    ///
    /// Returns `ObjectiveError::Input` if the input lacks a group index or a random
    /// design, is malformed, or has an outcome outside the support of the family.
    pub fn new(input: ModelInput, options: CorrelatedOptions) -> Result<Self, ObjectiveError> {
        input.validate_for(options.family)?;
        let groups = input.require_groups()?.clone();
        let random_design = input.require_random_design()?.clone();
        Ok(Self {
            input,
            groups,
            random_design,
            options,
        })
    }

    #[must_use]
    pub const fn options(&self) -> CorrelatedOptions {
        self.options
    }

    /// Random effects per group, `k`.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.random_design.ncols()
    }

    #[must_use]
    pub const fn ngroups(&self) -> usize {
        self.groups.ngroups()
    }

    fn evaluate<'a>(&self, theta: &'a [f64]) -> Result<Evaluation<'a>, ObjectiveError> {
        let k = self.dimension();
        let family_params = self.options.family.parameter_count();
        let mut reader = self.layout().reader(theta)?;
        let beta = reader.take(self.input.ncoef());
        let u = reader.take(k * self.ngroups());
        let log_sd = reader.take(k);
        let family = self.options.family.resolve(reader.take(family_params));
        let transformed_rho = reader.scalar();

        let structure =
            CompoundSymmetric::from_unconstrained(log_sd, transformed_rho, self.options.diagonal)?;
        let mvn = MultivariateNormal::new(&structure.matrix());
        let random_effects: f64 = u
            .chunks_exact(k)
            .map(|effects| mvn.negative_log_density(effects))
            .sum();

        let xb = linear_predictor(&self.input.design_matrix, beta);
        let z = &self.random_design;
        let y = &self.input.outcome;
        let observation = observation_nll(xb.len(), |i| {
            let effects = &u[self.groups.group(i) * k..][..k];
            let eta = effects
                .iter()
                .enumerate()
                .fold(xb[i], |acc, (c, &effect)| z[(i, c)].mul_add(effect, acc));
            family.log_density(y[(i, 0)], eta)
        });

        let breakdown = ObjectiveBreakdown::new(observation, random_effects);
        log::trace!(
            "correlated effects nll = {} (k = {k}, rho = {})",
            breakdown.total,
            structure.rho()
        );
        Ok(Evaluation {
            beta,
            u,
            structure,
            family,
            breakdown,
        })
    }
}

impl Objective for CorrelatedEffectsModel {
    type Report = CorrelatedEffectsReport;

    fn layout(&self) -> ParameterLayout {
        let k = self.dimension();
        ParameterLayout::new()
            .with_block("beta", self.input.ncoef())
            .with_block("u", k * self.ngroups())
            .with_block("log_sd_u", k)
            .with_family(self.options.family)
            .with_block("transformed_rho", 1)
    }

    fn breakdown(&self, theta: &[f64]) -> Result<ObjectiveBreakdown, ObjectiveError> {
        Ok(self.evaluate(theta)?.breakdown)
    }

    fn report(&self, theta: &[f64]) -> Result<CorrelatedEffectsReport, ObjectiveError> {
        let eval = self.evaluate(theta)?;
        Ok(CorrelatedEffectsReport {
            beta: eval.beta.to_vec(),
            u: mat_from_column_major(self.dimension(), self.ngroups(), eval.u),
            sd: eval.structure.sd().to_vec(),
            rho: eval.structure.rho(),
            diagonal: eval.structure.convention(),
            covariance: eval.structure.matrix(),
            family: eval.family,
            breakdown: eval.breakdown,
        })
    }
}
