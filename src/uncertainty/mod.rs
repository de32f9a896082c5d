//! # Uncertainty Calculation
//!
//! Covariance, standard errors and correlations of fitted arguments.
//!
//! - least squares: `inv(JᵀJ) * SS_res / (n - p)`
//! - likelihood and minimization: inverse of the Hessian of the objective
//!
//! Every routine degrades to `None` rather than failing when a matrix is
//! singular or the estimate is undefined.

mod covariance;

pub use covariance::{
    correlation, invert, invert_symmetric, least_squares_covariance, normal_matrix_inverse,
    standard_errors,
};
