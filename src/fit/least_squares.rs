//! Unconstrained nonlinear least squares.

use log::debug;

use crate::error::{Result, SymfitError};
use crate::expr::Value;
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::model::{Bindings, Model};
use crate::options::OptimizerOptions;
use crate::results::{FitResults, Statistics, StrategyKind};
use crate::uncertainty::{least_squares_covariance, standard_errors};

use super::data::{FitData, ResidualProblem};
use super::{parameter_bounds, parameter_estimates, FitStrategy, OptimizeOver};

/// Least-squares fit of a model to data with Levenberg-Marquardt.
///
/// Bounds on the parameters are honoured; constraints are not supported
/// (use [`MinimizeParameters`](super::MinimizeParameters)).
///
/// # Examples
///
/// ```
/// use symfit_rs::{FitStrategy, LeastSquares, Model, Parameter, Variable};
///
/// let a = Parameter::named("a");
/// let b = Parameter::named("b");
/// let x = Variable::named("x");
/// let model = Model::new(&a * &x + &b).unwrap();
///
/// let fit = LeastSquares::xy(&model, vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0]).unwrap();
/// let results = fit.execute().unwrap();
/// assert!((results.get_value(&a).unwrap() - 2.0).abs() < 1e-6);
/// assert!((results.r_squared().unwrap().unwrap() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct LeastSquares<'a> {
    model: &'a Model,
    data: FitData,
}

impl<'a> LeastSquares<'a> {
    /// Bind `data` by variable and output name.
    ///
    /// # Errors
    ///
    /// Binding errors for missing or unknown names, `DimensionMismatch` for
    /// inconsistent sample counts and `Configuration` when the model has no
    /// parameter left to estimate.
    pub fn new(model: &'a Model, data: Bindings) -> Result<Self> {
        let data = FitData::new(model, &data, true)?;
        if model.free_params().is_empty() {
            return Err(SymfitError::Configuration(
                "The model has no free parameters to fit".to_string(),
            ));
        }
        Ok(Self { model, data })
    }

    /// Shortcut for a model with one variable and one output.
    pub fn xy(model: &'a Model, x: impl Into<Value>, y: impl Into<Value>) -> Result<Self> {
        let data = xy_bindings(model, x.into(), y.into())?;
        Self::new(model, data)
    }
}

pub(super) fn xy_bindings(model: &Model, x: Value, y: Value) -> Result<Bindings> {
    let [var] = model.vars() else {
        return Err(SymfitError::Configuration(format!(
            "xy data needs a model with exactly one variable, found {}",
            model.vars().len()
        )));
    };
    let [(output, _)] = model.outputs() else {
        return Err(SymfitError::Configuration(format!(
            "xy data needs a model with exactly one output, found {}",
            model.outputs().len()
        )));
    };
    Ok(Bindings::new().bind(var.name(), x).bind(output, y))
}

/// Residual-based goodness of fit.
pub(super) fn residual_statistics(data: &FitData, ss_res: f64, n_free: usize) -> Statistics {
    let ss_tot = data.total_sum_of_squares();
    Statistics::Residuals {
        chi_squared: ss_res,
        degrees_of_freedom: data.residual_count().saturating_sub(n_free),
        r_squared: (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot),
    }
}

impl FitStrategy for LeastSquares<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LeastSquares
    }

    fn model(&self) -> &Model {
        self.model
    }

    fn optimize_over(&self) -> OptimizeOver {
        OptimizeOver::Parameters
    }

    fn execute_with(&self, options: &OptimizerOptions) -> Result<FitResults> {
        let optimizer = LevenbergMarquardt::with_config(LmConfig::from_options(options)?);
        let problem = ResidualProblem::new(self.model, &self.data);
        let bounds = parameter_bounds(self.model);

        let result = optimizer.minimize(&problem, self.data.initial(), &bounds)?;
        debug!("Least-squares fit finished: {}", result.message);

        let covariance = least_squares_covariance(
            result.cov_x.as_ref(),
            result.residuals.len(),
            result.cost,
        );
        let stdevs = covariance
            .as_ref()
            .map(standard_errors)
            .unwrap_or_default();

        let estimates = parameter_estimates(
            self.model,
            &self.data.param_values(self.model),
            &result.params,
            &stdevs,
        );

        Ok(FitResults {
            strategy: self.kind(),
            estimates,
            free: self.model.free_params().iter().map(|p| p.id()).collect(),
            covariance,
            objective_value: result.cost,
            success: result.success,
            message: result.message,
            iterations: result.iterations,
            func_evals: result.func_evals,
            statistics: residual_statistics(&self.data, result.cost, result.params.len()),
        })
    }
}
