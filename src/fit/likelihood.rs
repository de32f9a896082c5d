//! Maximum likelihood estimation.

use log::debug;
use ndarray::Array1;

use crate::constraint::{encode_all, Constraint, EncodedConstraint};
use crate::error::{Result, SymfitError};
use crate::minimize::{minimize, MinimizeConfig, Objective};
use crate::model::{Bindings, Model};
use crate::options::OptimizerOptions;
use crate::results::{FitResults, Statistics, StrategyKind};
use crate::uncertainty::standard_errors;

use super::data::FitData;
use super::{
    constraint_records, parameter_bounds, parameter_estimates, FitStrategy, OptimizeOver,
    ScalarLayout,
};

/// Fit the parameters of a probability density to samples by minimizing
/// `-sum ln f(x_i)`.
///
/// The model must have a single output, the density. Standard errors come
/// from the inverse Hessian of the negative log-likelihood.
#[derive(Debug)]
pub struct Likelihood<'a> {
    model: &'a Model,
    data: FitData,
    constraints: Vec<EncodedConstraint>,
}

impl<'a> Likelihood<'a> {
    /// Bind the samples by variable name.
    pub fn new(model: &'a Model, data: Bindings) -> Result<Self> {
        if model.outputs().len() != 1 {
            return Err(SymfitError::Configuration(format!(
                "A likelihood fit needs a single density output, found {}",
                model.outputs().len()
            )));
        }
        if model.free_params().is_empty() {
            return Err(SymfitError::Configuration(
                "The model has no free parameters to fit".to_string(),
            ));
        }
        Ok(Self {
            model,
            data: FitData::new(model, &data, false)?,
            constraints: Vec::new(),
        })
    }

    /// Add constraints on the parameters.
    pub fn with_constraints(mut self, constraints: &[Constraint]) -> Result<Self> {
        self.constraints
            .extend(encode_all(constraints, self.model, OptimizeOver::Parameters)?);
        Ok(self)
    }
}

/// Negative log-likelihood and its analytic gradient.
struct NegativeLogLikelihood<'a> {
    model: &'a Model,
    data: &'a FitData,
}

impl Objective for NegativeLogLikelihood<'_> {
    fn dimension(&self) -> usize {
        self.model.free_params().len()
    }

    fn value(&self, x: &Array1<f64>) -> Result<f64> {
        let outputs = self.model.evaluate_slots(&self.data.slots_at(x))?;
        let density = outputs[0].broadcast(self.data.len())?;
        Ok(-density.mapv(f64::ln).sum())
    }

    fn gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        let slots = self.data.slots_at(x);
        let n = self.data.len();
        let density = self.model.evaluate_slots(&slots)?[0].broadcast(n)?;
        let jacobian = self.model.evaluate_jacobian_slots(&slots)?;
        jacobian[0]
            .iter()
            .map(|d| -> Result<f64> { Ok(-(d.broadcast(n)? / &density).sum()) })
            .collect()
    }
}

impl FitStrategy for Likelihood<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Likelihood
    }

    fn model(&self) -> &Model {
        self.model
    }

    fn optimize_over(&self) -> OptimizeOver {
        OptimizeOver::Parameters
    }

    fn execute_with(&self, options: &OptimizerOptions) -> Result<FitResults> {
        let config = MinimizeConfig::from_options(options)?;
        let objective = NegativeLogLikelihood {
            model: self.model,
            data: &self.data,
        };

        let x0 = self.data.initial();
        if !objective.value(&x0)?.is_finite() {
            return Err(SymfitError::FunctionEvaluation(
                "The density is not positive for every sample at the initial guess".to_string(),
            ));
        }

        let param_values = self.data.param_values(self.model);
        let layout = ScalarLayout::parameters(self.model, &param_values);
        let records = constraint_records(&self.constraints, &layout);
        let bounds = parameter_bounds(self.model);

        let result = minimize(&objective, x0, &records, &bounds, &config)?;
        debug!("Likelihood fit finished: {}", result.message);

        let stdevs = result
            .hess_inv
            .as_ref()
            .map(standard_errors)
            .unwrap_or_default();
        let estimates = parameter_estimates(self.model, &param_values, &result.x, &stdevs);

        Ok(FitResults {
            strategy: self.kind(),
            estimates,
            free: self.model.free_params().iter().map(|p| p.id()).collect(),
            covariance: result.hess_inv,
            objective_value: result.fun,
            success: result.success,
            message: result.message,
            iterations: result.iterations,
            func_evals: result.func_evals,
            statistics: Statistics::Likelihood {
                log_likelihood: -result.fun,
            },
        })
    }
}
