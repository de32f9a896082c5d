//! Constrained minimization of the squared residuals.

use log::debug;
use ndarray::Array1;

use crate::constraint::{encode_all, Constraint, EncodedConstraint};
use crate::error::{Result, SymfitError};
use crate::expr::Value;
use crate::minimize::{minimize, MinimizeConfig, Objective};
use crate::model::{Bindings, Model};
use crate::options::OptimizerOptions;
use crate::problem::Problem;
use crate::results::{FitResults, StrategyKind};
use crate::uncertainty::standard_errors;

use super::data::{FitData, ResidualProblem};
use super::least_squares::{residual_statistics, xy_bindings};
use super::{
    any_bound_active, constraint_records, parameter_bounds, parameter_estimates, FitStrategy,
    OptimizeOver, ScalarLayout,
};

/// Least squares through a general constrained minimizer.
///
/// The objective is `S(p) = sum r_i(p)^2` with gradient `2 Jᵀ r`. Standard
/// errors are reported only when no constraint and no bound is active at
/// the optimum; the covariance is then `2 H⁻¹ S / (n - p)`.
#[derive(Debug)]
pub struct MinimizeParameters<'a> {
    model: &'a Model,
    data: FitData,
    constraints: Vec<EncodedConstraint>,
}

impl<'a> MinimizeParameters<'a> {
    /// Bind `data` by variable and output name.
    pub fn new(model: &'a Model, data: Bindings) -> Result<Self> {
        let data = FitData::new(model, &data, true)?;
        if model.free_params().is_empty() {
            return Err(SymfitError::Configuration(
                "The model has no free parameters to fit".to_string(),
            ));
        }
        Ok(Self {
            model,
            data,
            constraints: Vec::new(),
        })
    }

    /// Shortcut for a model with one variable and one output.
    pub fn xy(model: &'a Model, x: impl Into<Value>, y: impl Into<Value>) -> Result<Self> {
        let data = xy_bindings(model, x.into(), y.into())?;
        Self::new(model, data)
    }

    /// Add constraints on the parameters.
    pub fn with_constraints(mut self, constraints: &[Constraint]) -> Result<Self> {
        self.constraints
            .extend(encode_all(constraints, self.model, OptimizeOver::Parameters)?);
        Ok(self)
    }
}

struct SumOfSquares<'a> {
    problem: ResidualProblem<'a>,
}

impl Objective for SumOfSquares<'_> {
    fn dimension(&self) -> usize {
        self.problem.parameter_count()
    }

    fn value(&self, x: &Array1<f64>) -> Result<f64> {
        self.problem.eval_cost(x)
    }

    fn gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        let residuals = self.problem.eval(x)?;
        let jacobian = self.problem.jacobian(x)?;
        Ok(jacobian.t().dot(&residuals) * 2.0)
    }
}

impl FitStrategy for MinimizeParameters<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MinimizeParameters
    }

    fn model(&self) -> &Model {
        self.model
    }

    fn optimize_over(&self) -> OptimizeOver {
        OptimizeOver::Parameters
    }

    fn execute_with(&self, options: &OptimizerOptions) -> Result<FitResults> {
        let config = MinimizeConfig::from_options(options)?;
        let objective = SumOfSquares {
            problem: ResidualProblem::new(self.model, &self.data),
        };

        let param_values = self.data.param_values(self.model);
        let layout = ScalarLayout::parameters(self.model, &param_values);
        let records = constraint_records(&self.constraints, &layout);
        let bounds = parameter_bounds(self.model);

        let result = minimize(&objective, self.data.initial(), &records, &bounds, &config)?;
        debug!("Parameter minimization finished: {}", result.message);

        let n_free = result.x.len();
        let dof = self.data.residual_count().saturating_sub(n_free);
        let constrained =
            !result.active_constraints.is_empty() || any_bound_active(&result.x, &bounds);

        let covariance = match &result.hess_inv {
            Some(hess_inv) if !constrained && dof > 0 => {
                Some(hess_inv * (2.0 * result.fun / dof as f64))
            }
            _ => {
                if constrained {
                    debug!("Constraints active at the optimum, no standard errors reported");
                }
                None
            }
        };
        let stdevs = covariance
            .as_ref()
            .map(standard_errors)
            .unwrap_or_default();
        let estimates = parameter_estimates(self.model, &param_values, &result.x, &stdevs);

        Ok(FitResults {
            strategy: self.kind(),
            estimates,
            free: self.model.free_params().iter().map(|p| p.id()).collect(),
            covariance,
            objective_value: result.fun,
            success: result.success,
            message: result.message,
            iterations: result.iterations,
            func_evals: result.func_evals,
            statistics: residual_statistics(&self.data, result.fun, n_free),
        })
    }
}
