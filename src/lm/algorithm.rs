//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! Bounded parameters are handled with the transform in [`crate::bounds`]:
//! the iteration runs in internal coordinates, the problem is always
//! evaluated in external ones, and the Jacobian is chained through the
//! transform's derivative.

use std::fmt;

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::bounds::{Bounds, BoundsTransform};
use crate::error::{Result, SymfitError};
use crate::problem::Problem;
use crate::uncertainty::normal_matrix_inverse;
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

use super::config::LmConfig;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Number of residual evaluations
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// A message describing the result
    pub message: String,

    /// `inv(JᵀJ)` at the solution in external coordinates, `None` if singular
    pub cov_x: Option<Array2<f64>>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {}", self.params)?;
        Ok(())
    }
}

/// Outcome of one outer iteration.
enum IterationStatus {
    Continue,
    Converged(String),
    Stalled(String),
    Failed(String),
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for the relative decrease of the cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for the relative step length.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for the gradient max-norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Minimize the sum of squared residuals of `problem`.
    ///
    /// `bounds` holds one entry per parameter, or is empty for an
    /// unbounded problem. Non-convergence is reported through
    /// `LmResult::success`; errors are reserved for invalid input and
    /// failing residual evaluations.
    pub fn minimize<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
        bounds: &[Bounds],
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(SymfitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        if !bounds.is_empty() && bounds.len() != n_params {
            return Err(SymfitError::DimensionMismatch(format!(
                "Expected {} bounds, got {}",
                n_params,
                bounds.len()
            )));
        }

        let transforms: Vec<BoundsTransform> = (0..n_params)
            .map(|i| BoundsTransform::new(bounds.get(i).copied().unwrap_or_default()))
            .collect();

        let mut internal = Array1::zeros(n_params);
        for (i, t) in transforms.iter().enumerate() {
            internal[i] = t.start_internal(initial_params[i])?;
        }
        let mut params = to_external(&transforms, &internal);

        let mut residuals = problem.eval(&params)?;
        let mut cost = sum_of_squares(&residuals);
        let mut func_evals = 1;
        if !cost.is_finite() {
            return Err(SymfitError::FunctionEvaluation(
                "Residuals are not finite at the initial parameters".to_string(),
            ));
        }

        debug!(
            "Levenberg-Marquardt: {} parameters, {} residuals, initial cost {:.6e}",
            n_params,
            residuals.len(),
            cost
        );

        let mut lambda = self.config.initial_lambda;
        let mut iterations = 0;
        let mut outcome: Option<(bool, String)> = None;

        while iterations < self.config.max_iterations {
            let jac_internal = self.internal_jacobian(problem, &params, &internal, &transforms)?;
            if jac_internal.iter().any(|v| !v.is_finite()) {
                outcome = Some((
                    false,
                    "Jacobian is not finite at the current parameters".to_string(),
                ));
                break;
            }
            let j = ndarray_to_nalgebra(&jac_internal);
            let r = ndarray_vec_to_nalgebra(&residuals);
            let gradient = j.transpose() * &r;

            let gradient_norm = gradient.amax();
            if gradient_norm <= self.config.gtol {
                outcome = Some((
                    true,
                    format!(
                        "Gradient convergence: ||g|| = {:.2e} <= {:.2e}",
                        gradient_norm, self.config.gtol
                    ),
                ));
                break;
            }

            let jtj = j.transpose() * &j;
            iterations += 1;

            let status = loop {
                let step = match solve_damped(&jtj, &gradient, lambda) {
                    Some(step) => step,
                    None => {
                        lambda *= self.config.lambda_up_factor;
                        if lambda > self.config.max_lambda {
                            break IterationStatus::Failed(
                                "Damped normal equations could not be solved".to_string(),
                            );
                        }
                        continue;
                    }
                };

                let trial_internal = &internal + &step;
                let trial_params = to_external(&transforms, &trial_internal);
                let trial_residuals = problem.eval(&trial_params)?;
                func_evals += 1;
                let trial_cost = sum_of_squares(&trial_residuals);

                if trial_cost.is_finite() && trial_cost < cost {
                    let reduction = cost - trial_cost;
                    let step_norm = step.dot(&step).sqrt();
                    let x_norm = internal.dot(&internal).sqrt();

                    internal = trial_internal;
                    params = trial_params;
                    residuals = trial_residuals;
                    cost = trial_cost;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                    trace!(
                        "iteration {}: cost {:.6e}, lambda {:.2e}, |step| {:.2e}",
                        iterations,
                        cost,
                        lambda,
                        step_norm
                    );

                    if reduction <= self.config.ftol * (cost + reduction) {
                        break IterationStatus::Converged(format!(
                            "Cost convergence: relative reduction {:.2e} <= {:.2e}",
                            reduction / (cost + reduction),
                            self.config.ftol
                        ));
                    }
                    if step_norm <= self.config.xtol * (x_norm + self.config.xtol) {
                        break IterationStatus::Converged(format!(
                            "Parameter convergence: |step| = {:.2e}",
                            step_norm
                        ));
                    }
                    break IterationStatus::Continue;
                }

                lambda *= self.config.lambda_up_factor;
                if lambda > self.config.max_lambda {
                    break IterationStatus::Stalled(
                        "No further reduction of the cost is possible".to_string(),
                    );
                }
            };

            match status {
                IterationStatus::Continue => {}
                IterationStatus::Converged(message) => {
                    outcome = Some((true, message));
                    break;
                }
                IterationStatus::Stalled(message) => {
                    // At a minimum in floating point no trial step can win.
                    let stationary =
                        gradient_norm <= self.config.gtol.sqrt() * (1.0 + cost.sqrt());
                    outcome = Some((stationary, message));
                    break;
                }
                IterationStatus::Failed(message) => {
                    outcome = Some((false, message));
                    break;
                }
            }
        }

        let (success, message) = outcome.unwrap_or_else(|| {
            (
                false,
                format!(
                    "Maximum number of iterations ({}) reached",
                    self.config.max_iterations
                ),
            )
        });

        let cov_x = normal_matrix_inverse(&problem.jacobian(&params)?);
        debug!(
            "Levenberg-Marquardt finished after {} iterations: {} (cost {:.6e})",
            iterations, message, cost
        );

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success,
            message,
            cov_x,
        })
    }

    fn internal_jacobian<P: Problem + ?Sized>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        internal: &Array1<f64>,
        transforms: &[BoundsTransform],
    ) -> Result<Array2<f64>> {
        let mut jac = problem.jacobian(params)?;
        if jac.dim() != (problem.residual_count(), params.len()) {
            return Err(SymfitError::DimensionMismatch(format!(
                "Jacobian has shape {:?}, expected ({}, {})",
                jac.dim(),
                problem.residual_count(),
                params.len()
            )));
        }
        for (j, t) in transforms.iter().enumerate() {
            let scale = t.derivative(internal[j]);
            if scale != 1.0 {
                jac.column_mut(j).mapv_inplace(|v| v * scale);
            }
        }
        Ok(jac)
    }
}

fn to_external(transforms: &[BoundsTransform], internal: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(
        transforms
            .iter()
            .zip(internal.iter())
            .map(|(t, &v)| t.to_external(v)),
    )
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Solve `(JᵀJ + λ diag(JᵀJ)) δ = -Jᵀr` by Cholesky.
fn solve_damped(jtj: &DMatrix<f64>, gradient: &DVector<f64>, lambda: f64) -> Option<Array1<f64>> {
    let mut damped = jtj.clone();
    for i in 0..damped.nrows() {
        let d = jtj[(i, i)].max(1e-12);
        damped[(i, i)] += lambda * d;
    }
    let step = damped.cholesky()?.solve(&(-gradient));
    if step.iter().all(|v| v.is_finite()) {
        Some(nalgebra_vec_to_ndarray(&step))
    } else {
        None
    }
}
