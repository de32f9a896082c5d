//! Levenberg-Marquardt algorithm implementation.
//!
//! Bounded nonlinear least squares for [`crate::problem::Problem`]
//! implementations. The fitting layer uses it for `LeastSquares` fits; it
//! can also be driven directly with a hand-written problem.

pub mod algorithm;
pub mod config;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
