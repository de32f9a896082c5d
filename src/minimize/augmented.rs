//! Augmented-Lagrangian outer loop.

use log::{debug, trace, warn};
use ndarray::Array1;

use crate::bounds::{Bounds, BoundsTransform};
use crate::constraint::ConstraintKind;
use crate::error::{Result, SymfitError};
use crate::uncertainty::invert;
use crate::utils::finite_difference::hessian_from_gradient;

use super::config::MinimizeConfig;
use super::lagrangian::{solve, Multipliers, Subproblem};
use super::{ConstraintRecord, MinimizeResult, Objective};

/// Inequalities with `g` at most this far above zero count as active.
const ACTIVE_TOLERANCE: f64 = 1e-6;

/// Minimize `objective` subject to `constraints` and `bounds`.
///
/// `bounds` holds one entry per coordinate or is empty. Failure to reach
/// the tolerances is reported through `MinimizeResult::success`.
///
/// # Examples
///
/// ```
/// use ndarray::{array, Array1};
/// use symfit_rs::minimize::{minimize, ConstraintRecord, MinimizeConfig, Objective};
/// use symfit_rs::{ConstraintKind, Result};
///
/// // min x^2 + y^2  s.t.  x + y == 1
/// struct Norm;
/// impl Objective for Norm {
///     fn dimension(&self) -> usize { 2 }
///     fn value(&self, x: &Array1<f64>) -> Result<f64> { Ok(x.dot(x)) }
///     fn gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>> { Ok(x * 2.0) }
/// }
///
/// let line = ConstraintRecord::new(
///     ConstraintKind::Eq,
///     |x: &Array1<f64>| Ok(x[0] + x[1] - 1.0),
///     |_: &Array1<f64>| Ok(array![1.0, 1.0]),
/// );
/// let result = minimize(&Norm, array![0.0, 0.0], &[line], &[], &MinimizeConfig::default()).unwrap();
/// assert!(result.success);
/// assert!((result.x[0] - 0.5).abs() < 1e-6);
/// ```
pub fn minimize<O: Objective + ?Sized>(
    objective: &O,
    x0: Array1<f64>,
    constraints: &[ConstraintRecord<'_>],
    bounds: &[Bounds],
    config: &MinimizeConfig,
) -> Result<MinimizeResult> {
    let n = objective.dimension();
    if x0.len() != n {
        return Err(SymfitError::DimensionMismatch(format!(
            "Expected {} starting values, got {}",
            n,
            x0.len()
        )));
    }
    if !bounds.is_empty() && bounds.len() != n {
        return Err(SymfitError::DimensionMismatch(format!(
            "Expected {} bounds, got {}",
            n,
            bounds.len()
        )));
    }

    let equalities: Vec<&ConstraintRecord<'_>> = constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::Eq)
        .collect();
    let inequalities: Vec<&ConstraintRecord<'_>> = constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::Ineq)
        .collect();

    let mut multipliers = Multipliers {
        lambda: vec![0.0; equalities.len()],
        mu: vec![0.0; inequalities.len()],
        rho: config.initial_penalty,
    };

    debug!(
        "Minimizing over {} argument(s) with {} equality and {} inequality constraint(s)",
        n,
        equalities.len(),
        inequalities.len()
    );

    let transforms: Vec<BoundsTransform> = (0..n)
        .map(|i| BoundsTransform::new(bounds.get(i).copied().unwrap_or_default()))
        .collect();
    let mut z: Array1<f64> = Array1::zeros(n);
    for (i, t) in transforms.iter().enumerate() {
        z[i] = t.start_internal(t.bounds().clamp(x0[i]))?;
    }

    let mut x = x0;
    let mut iterations = 0;
    let mut func_evals = 0;
    let mut violation = f64::INFINITY;
    let mut success = false;
    let mut message = format!(
        "Maximum number of outer iterations ({}) reached",
        config.max_iterations
    );

    for outer in 0..config.max_iterations.max(1) {
        let subproblem = Subproblem {
            objective,
            equalities: &equalities,
            inequalities: &inequalities,
            multipliers: &multipliers,
            transforms: &transforms,
        };
        let inner = solve(subproblem, z, config)?;
        iterations += inner.iterations;
        func_evals += inner.func_evals;
        z = inner.internal;
        let next = subproblem.external(&z);
        let step = (&next - &x).iter().fold(0.0f64, |m, v| m.max(v.abs()));
        x = next;

        if constraints.is_empty() {
            success = inner.converged;
            message = inner.message;
            violation = 0.0;
            break;
        }

        let previous_violation = violation;
        violation = 0.0;
        for (c, lambda) in equalities.iter().zip(multipliers.lambda.iter_mut()) {
            let ci = (c.function)(&x)?;
            violation = violation.max(ci.abs());
            *lambda += multipliers.rho * ci;
        }
        for (g, mu) in inequalities.iter().zip(multipliers.mu.iter_mut()) {
            let gi = (g.function)(&x)?;
            violation = violation.max(gi.min(*mu / multipliers.rho).abs());
            *mu = (*mu - multipliers.rho * gi).max(0.0);
        }

        trace!(
            "outer iteration {}: violation {:.2e}, penalty {:.1e}, step {:.2e}",
            outer,
            violation,
            multipliers.rho,
            step
        );

        let x_scale = 1.0 + x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if violation <= config.ctol && step <= config.xtol.sqrt() * x_scale && outer > 0 {
            success = true;
            message = "Constraints satisfied and multipliers converged".to_string();
            break;
        }

        if violation > 0.25 * previous_violation {
            multipliers.rho = (multipliers.rho * config.penalty_growth).min(config.max_penalty);
        }
    }

    let fun = objective.value(&x)?;
    func_evals += 1;

    let mut max_violation: f64 = 0.0;
    let mut active_constraints = Vec::new();
    for (i, c) in constraints.iter().enumerate() {
        let value = (c.function)(&x)?;
        match c.kind {
            ConstraintKind::Eq => {
                max_violation = max_violation.max(value.abs());
                active_constraints.push(i);
            }
            ConstraintKind::Ineq => {
                max_violation = max_violation.max((-value).max(0.0));
                if value <= ACTIVE_TOLERANCE {
                    active_constraints.push(i);
                }
            }
        }
    }

    let hess_inv = match hessian_from_gradient(|z| objective.gradient(z), &x, None) {
        Ok(hessian) => invert(&hessian),
        Err(e) => {
            warn!("Hessian approximation failed: {}", e);
            None
        }
    };

    debug!(
        "Minimization finished after {} iterations: {} (objective {:.6e}, violation {:.2e})",
        iterations, message, fun, max_violation
    );

    Ok(MinimizeResult {
        x,
        fun,
        success,
        message,
        iterations,
        func_evals,
        hess_inv,
        max_violation,
        active_constraints,
    })
}
