//! Nonlinear least-squares problem definition.
//!
//! The [`Problem`] trait is the narrow interface between the fitting layer
//! and the Levenberg-Marquardt solver: residuals and (optionally) their
//! Jacobian as functions of the free parameter vector.

use ndarray::{Array1, Array2};

use crate::error::Result;

/// A nonlinear least-squares problem `min_p sum_i r_i(p)^2`.
pub trait Problem {
    /// Residuals at `params`.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Length of the parameter vector.
    fn parameter_count(&self) -> usize;

    /// Length of the residual vector.
    fn residual_count(&self) -> usize;

    /// Jacobian of the residuals, `J[i,j] = d r_i / d p_j`.
    ///
    /// Defaults to forward finite differences; problems with an analytic
    /// Jacobian override this.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Sum of squared residuals.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}
