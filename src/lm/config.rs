//! Configuration options for the Levenberg-Marquardt algorithm.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::options::{parse_options, OptimizerOptions};

/// Configuration options for the Levenberg-Marquardt algorithm.
///
/// Every field can be set from pass-through options by its name:
///
/// ```
/// use symfit_rs::lm::LmConfig;
/// use symfit_rs::options::options;
///
/// let config = LmConfig::from_options(&options([("ftol", 1e-12.into())])).unwrap();
/// assert_eq!(config.ftol, 1e-12);
/// assert_eq!(config.max_iterations, LmConfig::default().max_iterations);
///
/// assert!(LmConfig::from_options(&options([("maxfev", 10.into())])).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LmConfig {
    /// Maximum number of iterations. Default: 200
    pub max_iterations: usize,

    /// Relative tolerance for the decrease of the cost. Default: 1e-10
    pub ftol: f64,

    /// Relative tolerance for the step length. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the max-norm of the gradient. Default: 1e-12
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e12
    pub max_lambda: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
        }
    }
}

impl LmConfig {
    /// Parse pass-through options; absent keys keep their defaults.
    pub fn from_options(options: &OptimizerOptions) -> Result<Self> {
        parse_options(options)
    }
}
