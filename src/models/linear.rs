//! Fixed-effect objectives: a GLM over a design matrix, and the two-parameter Gaussian
//! sample model.

use serde::Serialize;

use crate::families::{ResolvedFamily, ResponseFamily, log_normal_pdf};
use crate::input::ModelInput;
use crate::models::matrix_ops::linear_predictor;
use crate::models::objective::{
    Objective, ObjectiveBreakdown, ObjectiveError, ParameterLayout, observation_nll,
};

/// `y_i ~ family(g^{-1}(x_i' beta))` with no random effects.
///
/// Parameters: `beta[p]`, then the family parameters.
#[derive(Debug, Clone)]
pub struct LinearModel {
    input: ModelInput,
    family: ResponseFamily,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinearReport {
    pub beta: Vec<f64>,
    pub family: ResolvedFamily,
    pub linear_predictor: Vec<f64>,
    pub fitted_mean: Vec<f64>,
    pub breakdown: ObjectiveBreakdown,
}

impl LinearModel {
    /// # Errors
    ///
    /// Returns `ObjectiveError::Input` if the input is malformed or an outcome is
    /// outside the support of `family`.
    pub fn new(input: ModelInput, family: ResponseFamily) -> Result<Self, ObjectiveError> {
        input.validate_for(family)?;
        Ok(Self { input, family })
    }

    /// Gaussian linear regression with a `log_sd` residual parameter.
    ///
    /// # Errors
    ///
    /// Returns `ObjectiveError::Input` if the input is malformed.
    pub fn gaussian(input: ModelInput) -> Result<Self, ObjectiveError> {
        Self::new(input, ResponseFamily::Gaussian)
    }

    #[must_use]
    pub const fn input(&self) -> &ModelInput {
        &self.input
    }

    #[must_use]
    pub const fn family(&self) -> ResponseFamily {
        self.family
    }

    fn evaluate(
        &self,
        theta: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>, ResolvedFamily, ObjectiveBreakdown), ObjectiveError> {
        let mut reader = self.layout().reader(theta)?;
        let beta = reader.take(self.input.ncoef());
        let resolved = self.family.resolve(reader.take(self.family.parameter_count()));

        let eta = linear_predictor(&self.input.design_matrix, beta);
        let y = &self.input.outcome;
        let observation = observation_nll(eta.len(), |i| resolved.log_density(y[(i, 0)], eta[i]));
        let breakdown = ObjectiveBreakdown::new(observation, 0.0);
        log::trace!("linear model nll = {}", breakdown.total);
        Ok((beta.to_vec(), eta, resolved, breakdown))
    }
}

impl Objective for LinearModel {
    type Report = LinearReport;

    fn layout(&self) -> ParameterLayout {
        ParameterLayout::new()
            .with_block("beta", self.input.ncoef())
            .with_family(self.family)
    }

    fn breakdown(&self, theta: &[f64]) -> Result<ObjectiveBreakdown, ObjectiveError> {
        self.evaluate(theta).map(|(_, _, _, breakdown)| breakdown)
    }

    fn report(&self, theta: &[f64]) -> Result<LinearReport, ObjectiveError> {
        let (beta, eta, family, breakdown) = self.evaluate(theta)?;
        let fitted_mean = eta.iter().map(|&value| family.mean(value)).collect();
        Ok(LinearReport {
            beta,
            family,
            linear_predictor: eta,
            fitted_mean,
            breakdown,
        })
    }
}

/// `x_i ~ N(mean, sqrt(variance))`, with the variance left untransformed.
///
/// A negative variance is not rejected; it makes the objective `NaN`.
#[derive(Debug, Clone)]
pub struct GaussianSampleModel {
    sample: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaussianSampleReport {
    pub mean: f64,
    pub variance: f64,
    pub sd: f64,
    pub breakdown: ObjectiveBreakdown,
}

impl GaussianSampleModel {
    /// # Errors
    ///
    /// Returns `ObjectiveError::Input` if the sample contains a non-finite value.
    pub fn new(sample: Vec<f64>) -> Result<Self, ObjectiveError> {
        if sample.iter().any(|value| !value.is_finite()) {
            return Err(crate::input::InputError::NonFiniteOutcome.into());
        }
        Ok(Self { sample })
    }

    #[must_use]
    pub fn sample(&self) -> &[f64] {
        &self.sample
    }
}

impl Objective for GaussianSampleModel {
    type Report = GaussianSampleReport;

    fn layout(&self) -> ParameterLayout {
        ParameterLayout::new()
            .with_block("mean", 1)
            .with_block("variance", 1)
    }

    fn breakdown(&self, theta: &[f64]) -> Result<ObjectiveBreakdown, ObjectiveError> {
        let mut reader = self.layout().reader(theta)?;
        let mean = reader.scalar();
        let sd = reader.scalar().sqrt();
        let observation = observation_nll(self.sample.len(), |i| {
            log_normal_pdf(self.sample[i], mean, sd)
        });
        Ok(ObjectiveBreakdown::new(observation, 0.0))
    }

    fn report(&self, theta: &[f64]) -> Result<GaussianSampleReport, ObjectiveError> {
        let breakdown = self.breakdown(theta)?;
        Ok(GaussianSampleReport {
            mean: theta[0],
            variance: theta[1],
            sd: theta[1].sqrt(),
            breakdown,
        })
    }
}
