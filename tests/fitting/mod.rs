//! Tests for the fit strategies and their results.

mod agreement;
mod least_squares;
mod likelihood;
mod minimize;
mod results;
