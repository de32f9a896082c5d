//! Fit strategies.
//!
//! Every strategy binds a [`Model`] (and, where it needs them, data and
//! constraints) at construction, validating everything up front. Numeric
//! work only happens in [`FitStrategy::execute`], which never mutates the
//! model and can be called any number of times.
//!
//! | Strategy | Optimizes | Optimizer |
//! |---|---|---|
//! | [`LeastSquares`] ([`Fit`]) | parameters | Levenberg-Marquardt |
//! | [`Likelihood`] | parameters | augmented Lagrangian |
//! | [`Minimize`] / [`Maximize`] | variables | augmented Lagrangian |
//! | [`MinimizeParameters`] | parameters | augmented Lagrangian |

mod data;
mod least_squares;
mod likelihood;
mod minimize;
mod minimize_parameters;

use ndarray::Array1;
use serde::Serialize;

use crate::argument::Argument;
use crate::bounds::Bounds;
use crate::constraint::{Constraint, EncodedConstraint};
use crate::error::Result;
use crate::minimize::ConstraintRecord;
use crate::model::{Bindings, Model};
use crate::options::OptimizerOptions;
use crate::results::{Estimate, FitResults, StrategyKind};

pub use least_squares::LeastSquares;
pub use likelihood::Likelihood;
pub use minimize::{Maximize, Minimize};
pub use minimize_parameters::MinimizeParameters;

/// The default strategy.
pub type Fit<'a> = LeastSquares<'a>;

/// Which symbols form the optimization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptimizeOver {
    /// Non-fixed parameters; variables are bound to data.
    Parameters,
    /// Variables; every parameter is held at its declared value.
    Variables,
}

/// Behaviour shared by all strategies.
pub trait FitStrategy {
    fn kind(&self) -> StrategyKind;

    fn model(&self) -> &Model;

    fn optimize_over(&self) -> OptimizeOver;

    /// The optimized arguments, in the order of the covariance matrix.
    fn free_arguments(&self) -> Vec<Argument> {
        match self.optimize_over() {
            OptimizeOver::Parameters => self
                .model()
                .free_params()
                .into_iter()
                .map(Argument::from)
                .collect(),
            OptimizeOver::Variables => self.model().vars().iter().map(Argument::from).collect(),
        }
    }

    /// Run with the optimizer's default settings.
    fn execute(&self) -> Result<FitResults> {
        self.execute_with(&OptimizerOptions::new())
    }

    /// Run, forwarding `options` to the optimizer untouched.
    fn execute_with(&self, options: &OptimizerOptions) -> Result<FitResults>;
}

/// Any of the strategies, behind one type.
#[derive(Debug)]
pub enum Strategy<'a> {
    LeastSquares(LeastSquares<'a>),
    Likelihood(Likelihood<'a>),
    Minimize(Minimize<'a>),
    Maximize(Maximize<'a>),
    MinimizeParameters(MinimizeParameters<'a>),
}

impl<'a> Strategy<'a> {
    /// Pick a strategy for fitting `model` to `data`: plain least squares
    /// when there are no constraints, constrained minimization of the
    /// squared residuals otherwise.
    pub fn for_data(model: &'a Model, data: Bindings, constraints: &[Constraint]) -> Result<Self> {
        if constraints.is_empty() {
            Ok(Self::LeastSquares(LeastSquares::new(model, data)?))
        } else {
            Ok(Self::MinimizeParameters(
                MinimizeParameters::new(model, data)?.with_constraints(constraints)?,
            ))
        }
    }

    fn inner(&self) -> &dyn FitStrategy {
        match self {
            Self::LeastSquares(s) => s,
            Self::Likelihood(s) => s,
            Self::Minimize(s) => s,
            Self::Maximize(s) => s,
            Self::MinimizeParameters(s) => s,
        }
    }
}

impl FitStrategy for Strategy<'_> {
    fn kind(&self) -> StrategyKind {
        self.inner().kind()
    }

    fn model(&self) -> &Model {
        self.inner().model()
    }

    fn optimize_over(&self) -> OptimizeOver {
        self.inner().optimize_over()
    }

    fn execute_with(&self, options: &OptimizerOptions) -> Result<FitResults> {
        self.inner().execute_with(options)
    }
}

macro_rules! impl_from_strategy {
    ($($variant:ident),*) => {
        $(
            impl<'a> From<$variant<'a>> for Strategy<'a> {
                fn from(strategy: $variant<'a>) -> Self {
                    Self::$variant(strategy)
                }
            }
        )*
    };
}

impl_from_strategy!(LeastSquares, Likelihood, Minimize, Maximize, MinimizeParameters);

/// Bounds of the non-fixed parameters, in Jacobian order.
pub(crate) fn parameter_bounds(model: &Model) -> Vec<Bounds> {
    model
        .free_params()
        .into_iter()
        .map(|p| Bounds::from(p.bounds()))
        .collect()
}

/// Estimates for every parameter in declaration order.
///
/// `values` holds the slot value of each parameter (used for fixed ones),
/// `free` and `stdevs` the optimized values and their errors.
pub(crate) fn parameter_estimates(
    model: &Model,
    values: &[f64],
    free: &Array1<f64>,
    stdevs: &[Option<f64>],
) -> Vec<Estimate> {
    let mut k = 0;
    model
        .params()
        .iter()
        .zip(values)
        .map(|(param, &value)| {
            let arg = Argument::from(param);
            if param.is_fixed() {
                Estimate::new(&arg, value, None, true)
            } else {
                let estimate = Estimate::new(&arg, free[k], stdevs.get(k).copied().flatten(), false);
                k += 1;
                estimate
            }
        })
        .collect()
}

/// Scalar slot vector with the optimized coordinates spliced in.
#[derive(Debug, Clone)]
pub(crate) struct ScalarLayout {
    base: Vec<f64>,
    free: Vec<usize>,
}

impl ScalarLayout {
    /// Layout for parameter optimization. Variables never appear in these
    /// constraints and read as zero.
    pub(crate) fn parameters(model: &Model, param_values: &[f64]) -> Self {
        let mut base = vec![0.0; model.vars().len()];
        base.extend_from_slice(param_values);
        Self {
            base,
            free: model.free_param_slots(),
        }
    }

    /// Layout for variable optimization with parameters at their declared values.
    pub(crate) fn variables(model: &Model) -> Self {
        let mut base = vec![0.0; model.vars().len()];
        base.extend(model.params().iter().map(|p| p.value()));
        Self {
            base,
            free: (0..model.vars().len()).collect(),
        }
    }

    pub(crate) fn fill(&self, x: &Array1<f64>) -> Vec<f64> {
        let mut slots = self.base.clone();
        for (&slot, &value) in self.free.iter().zip(x.iter()) {
            slots[slot] = value;
        }
        slots
    }
}

/// Wrap encoded constraints for the minimizer.
pub(crate) fn constraint_records<'c>(
    encoded: &'c [EncodedConstraint],
    layout: &'c ScalarLayout,
) -> Vec<ConstraintRecord<'c>> {
    encoded
        .iter()
        .map(|c| {
            ConstraintRecord::new(
                c.kind,
                move |x: &Array1<f64>| c.value(&layout.fill(x)),
                move |x: &Array1<f64>| c.gradient(&layout.fill(x)).map(Array1::from),
            )
        })
        .collect()
}

/// Whether any coordinate of `x` sits on one of its bounds.
pub(crate) fn any_bound_active(x: &Array1<f64>, bounds: &[Bounds]) -> bool {
    const TOL: f64 = 1e-6;
    x.iter().zip(bounds).any(|(&v, b)| {
        let near = |edge: f64| (v - edge).abs() <= TOL * (1.0 + edge.abs());
        b.min.is_some_and(near) || b.max.is_some_and(near)
    })
}
