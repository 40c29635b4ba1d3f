//! Scalar random intercept per group.
//!
//! `eta_i = x_i' beta + u[g(i)]` with `u_j ~ N(0, exp(log_sd_u))` independently.

use serde::Serialize;

use crate::families::{ResolvedFamily, ResponseFamily, log_normal_pdf};
use crate::input::{GroupIndex, ModelInput};
use crate::models::matrix_ops::linear_predictor;
use crate::models::objective::{
    Objective, ObjectiveBreakdown, ObjectiveError, ParameterLayout, observation_nll,
};

/// Parameters: `beta[p]`, `u[ngroups]`, `log_sd_u`, then the family parameters.
#[derive(Debug, Clone)]
pub struct RandomInterceptModel {
    input: ModelInput,
    groups: GroupIndex,
    family: ResponseFamily,
}

#[derive(Debug, Clone, Serialize)]
pub struct RandomInterceptReport {
    pub beta: Vec<f64>,
    pub u: Vec<f64>,
    pub sd_u: f64,
    pub family: ResolvedFamily,
    pub breakdown: ObjectiveBreakdown,
}

struct Evaluation<'a> {
    beta: &'a [f64],
    u: &'a [f64],
    sd_u: f64,
    family: ResolvedFamily,
    breakdown: ObjectiveBreakdown,
}

impl RandomInterceptModel {
    /// # Errors
    ///
    /// Returns `ObjectiveError::Input` if the input has no group index, is malformed,
    /// or has an outcome outside the support of `family`.
    pub fn new(input: ModelInput, family: ResponseFamily) -> Result<Self, ObjectiveError> {
        input.validate_for(family)?;
        let groups = input.require_groups()?.clone();
        Ok(Self {
            input,
            groups,
            family,
        })
    }

    #[must_use]
    pub const fn input(&self) -> &ModelInput {
        &self.input
    }

    #[must_use]
    pub const fn family(&self) -> ResponseFamily {
        self.family
    }

    #[must_use]
    pub const fn ngroups(&self) -> usize {
        self.groups.ngroups()
    }

    fn evaluate<'a>(&self, theta: &'a [f64]) -> Result<Evaluation<'a>, ObjectiveError> {
        let mut reader = self.layout().reader(theta)?;
        let beta = reader.take(self.input.ncoef());
        let u = reader.take(self.ngroups());
        let sd_u = reader.scalar().exp();
        let family = self.family.resolve(reader.take(self.family.parameter_count()));

        let random_effects = -u
            .iter()
            .map(|&value| log_normal_pdf(value, 0.0, sd_u))
            .sum::<f64>();

        let xb = linear_predictor(&self.input.design_matrix, beta);
        let y = &self.input.outcome;
        let observation = observation_nll(xb.len(), |i| {
            family.log_density(y[(i, 0)], xb[i] + u[self.groups.group(i)])
        });

        let breakdown = ObjectiveBreakdown::new(observation, random_effects);
        log::trace!(
            "random intercept nll = {} (observations {}, groups {})",
            breakdown.total,
            breakdown.observation,
            breakdown.random_effects
        );
        Ok(Evaluation {
            beta,
            u,
            sd_u,
            family,
            breakdown,
        })
    }
}

impl Objective for RandomInterceptModel {
    type Report = RandomInterceptReport;

    fn layout(&self) -> ParameterLayout {
        ParameterLayout::new()
            .with_block("beta", self.input.ncoef())
            .with_block("u", self.ngroups())
            .with_block("log_sd_u", 1)
            .with_family(self.family)
    }

    fn breakdown(&self, theta: &[f64]) -> Result<ObjectiveBreakdown, ObjectiveError> {
        Ok(self.evaluate(theta)?.breakdown)
    }

    fn report(&self, theta: &[f64]) -> Result<RandomInterceptReport, ObjectiveError> {
        let eval = self.evaluate(theta)?;
        Ok(RandomInterceptReport {
            beta: eval.beta.to_vec(),
            u: eval.u.to_vec(),
            sd_u: eval.sd_u,
            family: eval.family,
            breakdown: eval.breakdown,
        })
    }
}
