//! One augmented-Lagrangian subproblem and its L-BFGS solve.
//!
//! The subproblem lives in the internal coordinates of [`crate::bounds`]:
//! argmin sees an unconstrained function, the objective and constraints
//! are always evaluated at the external point.

use argmin::core::{CostFunction, Error, Executor, Gradient, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use log::trace;
use ndarray::Array1;

use crate::bounds::BoundsTransform;
use crate::error::{Result, SymfitError};

use super::config::MinimizeConfig;
use super::{ConstraintRecord, Objective};

type MoreThuente = MoreThuenteLineSearch<Array1<f64>, Array1<f64>, f64>;
type Lbfgs = LBFGS<MoreThuente, Array1<f64>, Array1<f64>, f64>;

/// Multiplier estimates and penalty weight of one outer iteration.
#[derive(Debug, Clone)]
pub(crate) struct Multipliers {
    pub lambda: Vec<f64>,
    pub mu: Vec<f64>,
    pub rho: f64,
}

/// `f(x) + sum(lambda c + rho c^2 / 2) + sum(max(0, mu - rho g)^2 - mu^2) / (2 rho)`
/// with `x = ext(z)`.
pub(crate) struct Subproblem<'s, 'c, O: ?Sized> {
    pub objective: &'s O,
    pub equalities: &'s [&'s ConstraintRecord<'c>],
    pub inequalities: &'s [&'s ConstraintRecord<'c>],
    pub multipliers: &'s Multipliers,
    pub transforms: &'s [BoundsTransform],
}

impl<O: ?Sized> Clone for Subproblem<'_, '_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O: ?Sized> Copy for Subproblem<'_, '_, O> {}

impl<O: Objective + ?Sized> Subproblem<'_, '_, O> {
    pub fn external(&self, z: &Array1<f64>) -> Array1<f64> {
        Array1::from_iter(
            self.transforms
                .iter()
                .zip(z.iter())
                .map(|(t, &v)| t.to_external(v)),
        )
    }

    fn lagrangian_value(&self, x: &Array1<f64>) -> Result<f64> {
        let m = self.multipliers;
        let mut value = self.objective.value(x)?;
        for (c, &lambda) in self.equalities.iter().zip(&m.lambda) {
            let ci = (c.function)(x)?;
            value += lambda * ci + 0.5 * m.rho * ci * ci;
        }
        for (g, &mu) in self.inequalities.iter().zip(&m.mu) {
            let shifted = (mu - m.rho * (g.function)(x)?).max(0.0);
            value += (shifted * shifted - mu * mu) / (2.0 * m.rho);
        }
        Ok(value)
    }

    fn lagrangian_gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        let m = self.multipliers;
        let mut gradient = self.objective.gradient(x)?;
        for (c, &lambda) in self.equalities.iter().zip(&m.lambda) {
            let ci = (c.function)(x)?;
            gradient.scaled_add(lambda + m.rho * ci, &(c.jacobian)(x)?);
        }
        for (g, &mu) in self.inequalities.iter().zip(&m.mu) {
            let shifted = (mu - m.rho * (g.function)(x)?).max(0.0);
            if shifted > 0.0 {
                gradient.scaled_add(-shifted, &(g.jacobian)(x)?);
            }
        }
        Ok(gradient)
    }

    fn internal_gradient(&self, z: &Array1<f64>) -> Result<Array1<f64>> {
        let mut gradient = self.lagrangian_gradient(&self.external(z))?;
        for ((g, t), &v) in gradient.iter_mut().zip(self.transforms).zip(z.iter()) {
            *g *= t.derivative(v);
        }
        Ok(gradient)
    }
}

impl<O: Objective + ?Sized> CostFunction for Subproblem<'_, '_, O> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, z: &Self::Param) -> std::result::Result<Self::Output, Error> {
        Ok(self.lagrangian_value(&self.external(z))?)
    }
}

impl<O: Objective + ?Sized> Gradient for Subproblem<'_, '_, O> {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(&self, z: &Self::Param) -> std::result::Result<Self::Gradient, Error> {
        Ok(self.internal_gradient(z)?)
    }
}

/// Outcome of one subproblem solve.
#[derive(Debug, Clone)]
pub(crate) struct InnerOutcome {
    /// Best point found, internal coordinates
    pub internal: Array1<f64>,
    pub iterations: usize,
    pub func_evals: usize,
    pub converged: bool,
    pub message: String,
}

/// Errors raised inside the objective come back as themselves.
fn from_argmin(error: Error) -> SymfitError {
    match error.downcast::<SymfitError>() {
        Ok(error) => error,
        Err(other) => SymfitError::FunctionEvaluation(format!("L-BFGS failed: {}", other)),
    }
}

/// Minimize `subproblem` with L-BFGS and a More-Thuente line search,
/// starting from the internal point `start`.
pub(crate) fn solve<O: Objective + ?Sized>(
    subproblem: Subproblem<'_, '_, O>,
    start: Array1<f64>,
    config: &MinimizeConfig,
) -> Result<InnerOutcome> {
    let solver: Lbfgs = LBFGS::new(MoreThuenteLineSearch::new(), config.lbfgs_memory)
        .with_tolerance_grad(config.gtol)
        .and_then(|solver| solver.with_tolerance_cost(config.ftol))
        .map_err(|e| SymfitError::InvalidOption(e.to_string()))?;

    let result = Executor::new(subproblem, solver)
        .configure(|state| {
            state
                .param(start.clone())
                .max_iters(config.max_inner_iterations as u64)
        })
        .run()
        .map_err(from_argmin)?;

    let mut state = result.state;
    let iterations = state.get_iter() as usize;
    let func_evals = state
        .get_func_counts()
        .get("cost_count")
        .copied()
        .unwrap_or_default() as usize;
    let reason = state.get_termination_reason().cloned();
    let cost = state.get_best_cost();
    let internal = state.take_best_param().unwrap_or(start);

    let (converged, message) = match reason {
        Some(TerminationReason::SolverConverged) => (
            true,
            "Gradient norm or objective change below tolerance".to_string(),
        ),
        Some(TerminationReason::SolverExit(reason)) => {
            // Near the optimum rounding noise defeats the line search.
            let gradient = subproblem.internal_gradient(&internal)?;
            let norm = gradient.dot(&gradient).sqrt();
            let stationary = norm <= config.gtol.sqrt() * (1.0 + cost.abs());
            (stationary, reason)
        }
        Some(TerminationReason::MaxItersReached) => (
            false,
            format!(
                "Maximum number of iterations ({}) reached",
                config.max_inner_iterations
            ),
        ),
        Some(other) => (false, other.text().to_string()),
        None => (false, "L-BFGS stopped without a reason".to_string()),
    };

    trace!(
        "L-BFGS subproblem: {} iterations, cost {:.6e}: {}",
        iterations,
        cost,
        message
    );

    Ok(InnerOutcome {
        internal,
        iterations,
        func_evals,
        converged,
        message,
    })
}
