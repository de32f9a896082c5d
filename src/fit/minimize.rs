//! Direct minimization and maximization of a model over its variables.

use log::debug;
use ndarray::Array1;

use crate::argument::{Argument, Variable};
use crate::constraint::{encode_all, Constraint, EncodedConstraint};
use crate::error::{BindingError, Result, SymfitError};
use crate::minimize::{minimize, MinimizeConfig, Objective};
use crate::model::Model;
use crate::options::OptimizerOptions;
use crate::results::{Estimate, FitResults, Statistics, StrategyKind};

use super::{constraint_records, FitStrategy, OptimizeOver, ScalarLayout};

/// Shared state of [`Minimize`] and [`Maximize`].
#[derive(Debug)]
struct Extremum<'a> {
    model: &'a Model,
    constraints: Vec<EncodedConstraint>,
    initial: Vec<f64>,
}

impl<'a> Extremum<'a> {
    fn new(model: &'a Model) -> Result<Self> {
        if model.outputs().len() != 1 {
            return Err(SymfitError::Configuration(format!(
                "Only a single-output model can be optimized directly, found {} outputs",
                model.outputs().len()
            )));
        }
        if model.vars().is_empty() {
            return Err(SymfitError::Configuration(
                "The model has no variables to optimize".to_string(),
            ));
        }
        Ok(Self {
            model,
            constraints: Vec::new(),
            initial: vec![1.0; model.vars().len()],
        })
    }

    fn add_constraints(&mut self, constraints: &[Constraint]) -> Result<()> {
        self.constraints
            .extend(encode_all(constraints, self.model, OptimizeOver::Variables)?);
        Ok(())
    }

    fn set_initial_guess(&mut self, var: &Variable, value: f64) -> Result<()> {
        let index = self
            .model
            .vars()
            .iter()
            .position(|v| v == var)
            .ok_or_else(|| BindingError::Unknown {
                name: var.name().to_string(),
            })?;
        self.initial[index] = value;
        Ok(())
    }

    /// Minimize `sign * f`, reporting the objective with the user's sign.
    fn run(&self, kind: StrategyKind, sign: f64, options: &OptimizerOptions) -> Result<FitResults> {
        let config = MinimizeConfig::from_options(options)?;
        let layout = ScalarLayout::variables(self.model);
        let objective = SignedExpression {
            model: self.model,
            layout: &layout,
            sign,
        };
        let records = constraint_records(&self.constraints, &layout);

        let result = minimize(&objective, Array1::from(self.initial.clone()), &records, &[], &config)?;
        debug!("{} finished: {}", kind, result.message);

        // Parameters keep their declared value; `fixed` reports the declaration.
        let mut estimates: Vec<Estimate> = self
            .model
            .params()
            .iter()
            .map(|p| Estimate::new(&Argument::from(p), p.value(), None, p.is_fixed()))
            .collect();
        estimates.extend(
            self.model
                .vars()
                .iter()
                .zip(result.x.iter())
                .map(|(v, &value)| Estimate::new(&Argument::from(v), value, None, false)),
        );

        Ok(FitResults {
            strategy: kind,
            estimates,
            free: self.model.vars().iter().map(|v| v.id()).collect(),
            covariance: None,
            objective_value: sign * result.fun,
            success: result.success,
            message: result.message,
            iterations: result.iterations,
            func_evals: result.func_evals,
            statistics: Statistics::None,
        })
    }
}

/// `sign * f(x)` over the variables of a single-output model.
struct SignedExpression<'a> {
    model: &'a Model,
    layout: &'a ScalarLayout,
    sign: f64,
}

impl Objective for SignedExpression<'_> {
    fn dimension(&self) -> usize {
        self.model.vars().len()
    }

    fn value(&self, x: &Array1<f64>) -> Result<f64> {
        let slots = self.layout.fill(x);
        Ok(self.sign * self.model.compiled_eval()?[0].eval_scalar(&slots)?)
    }

    fn gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        let slots = self.layout.fill(x);
        self.model.compiled_variable_jacobian()?[0]
            .iter()
            .map(|d| -> Result<f64> { Ok(self.sign * d.eval_scalar(&slots)?) })
            .collect::<Result<Array1<f64>>>()
    }
}

macro_rules! extremum_strategy {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $sign:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name<'a> {
            inner: Extremum<'a>,
        }

        impl<'a> $name<'a> {
            /// Optimize every variable of `model`, starting from 1.0.
            ///
            /// # Errors
            ///
            /// `Configuration` unless the model has one output and at least
            /// one variable.
            pub fn new(model: &'a Model) -> Result<Self> {
                Ok(Self {
                    inner: Extremum::new(model)?,
                })
            }

            /// Add constraints on the variables.
            pub fn with_constraints(mut self, constraints: &[Constraint]) -> Result<Self> {
                self.inner.add_constraints(constraints)?;
                Ok(self)
            }

            /// Start `var` from `value` instead of 1.0.
            pub fn with_initial_guess(mut self, var: &Variable, value: f64) -> Result<Self> {
                self.inner.set_initial_guess(var, value)?;
                Ok(self)
            }
        }

        impl FitStrategy for $name<'_> {
            fn kind(&self) -> StrategyKind {
                $kind
            }

            fn model(&self) -> &Model {
                self.inner.model
            }

            fn optimize_over(&self) -> OptimizeOver {
                OptimizeOver::Variables
            }

            fn execute_with(&self, options: &OptimizerOptions) -> Result<FitResults> {
                self.inner.run($kind, $sign, options)
            }
        }
    };
}

extremum_strategy!(
    /// Minimize a model's expression over its variables, parameters held at
    /// their declared values.
    Minimize,
    StrategyKind::Minimize,
    1.0
);

extremum_strategy!(
    /// Maximize a model's expression over its variables.
    ///
    /// ```
    /// use symfit_rs::{Constraint, FitStrategy, Maximize, Model, Symbolic, Variable};
    ///
    /// let x = Variable::named("x");
    /// let y = Variable::named("y");
    /// let model = Model::new(2.0 * &x * &y + 2.0 * &x - x.pow(2.0) - 2.0 * y.pow(2.0)).unwrap();
    /// let results = Maximize::new(&model)
    ///     .unwrap()
    ///     .with_constraints(&[
    ///         Constraint::eq(x.pow(3.0) - &y, 0.0),
    ///         Constraint::ge(&y - 1.0, 0.0),
    ///     ])
    ///     .unwrap()
    ///     .execute()
    ///     .unwrap();
    /// assert!(results.success());
    /// assert!((results.objective_value() - 1.0).abs() < 1e-5);
    /// ```
    Maximize,
    StrategyKind::Maximize,
    -1.0
);
