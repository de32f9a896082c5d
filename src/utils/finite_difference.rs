//! Finite difference approximations.
//!
//! The fitting engine differentiates models symbolically; these routines
//! cover the remaining cases: problems without an analytic Jacobian and the
//! Hessian used for curvature-based standard errors.

use ndarray::{Array1, Array2};

use crate::error::{Result, SymfitError};
use crate::problem::Problem;

/// Default relative step size for forward differences.
const DEFAULT_EPSILON: f64 = 1e-8;

/// Default relative step size for central differences of a gradient.
const DEFAULT_CENTRAL_EPSILON: f64 = 1e-5;

fn step(x: f64, eps: f64) -> f64 {
    if x.abs() > 1.0 {
        x.abs() * eps
    } else {
        eps
    }
}

/// Jacobian of a problem's residuals by forward differences:
/// `J[i,j] = d residual[i] / d param[j]`.
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let residuals = problem.eval(params)?;
    if residuals.len() != n_residuals {
        return Err(SymfitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            n_residuals,
            residuals.len()
        )));
    }

    let mut jac = Array2::zeros((n_residuals, n_params));
    for j in 0..n_params {
        let h = step(params[j], eps);
        let mut perturbed = params.clone();
        perturbed[j] += h;
        let residuals_perturbed = problem.eval(&perturbed)?;

        for i in 0..n_residuals {
            jac[[i, j]] = (residuals_perturbed[i] - residuals[i]) / h;
        }
    }

    Ok(jac)
}

/// Hessian as the central-difference Jacobian of an analytic gradient,
/// symmetrized.
pub fn hessian_from_gradient<F>(
    gradient: F,
    x: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>>
where
    F: Fn(&Array1<f64>) -> Result<Array1<f64>>,
{
    let eps = epsilon.unwrap_or(DEFAULT_CENTRAL_EPSILON);
    let n = x.len();
    let mut hess = Array2::zeros((n, n));

    for j in 0..n {
        let h = step(x[j], eps);
        let mut forward = x.clone();
        let mut backward = x.clone();
        forward[j] += h;
        backward[j] -= h;

        let g_forward = gradient(&forward)?;
        let g_backward = gradient(&backward)?;
        if g_forward.len() != n || g_backward.len() != n {
            return Err(SymfitError::DimensionMismatch(format!(
                "Gradient has length {}, expected {}",
                g_forward.len(),
                n
            )));
        }
        for i in 0..n {
            hess[[i, j]] = (g_forward[i] - g_backward[i]) / (2.0 * h);
        }
    }

    let symmetric = (&hess + &hess.t()) * 0.5;
    Ok(symmetric)
}
