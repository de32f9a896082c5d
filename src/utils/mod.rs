//! Numerical helpers shared by the optimizers and the fit strategies.

pub mod finite_difference;
pub mod matrix_convert;
