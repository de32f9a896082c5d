//! Configuration options for the constrained minimizer.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::options::{parse_options, OptimizerOptions};

/// Typical L-BFGS history length.
pub const DEFAULT_LBFGS_MEMORY: usize = 7;

/// Settings of the augmented-Lagrangian outer loop and its L-BFGS inner
/// solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinimizeConfig {
    /// Maximum number of multiplier updates. Default: 100
    pub max_iterations: usize,

    /// Maximum number of L-BFGS iterations per subproblem. Default: 500
    pub max_inner_iterations: usize,

    /// Euclidean norm of the gradient that ends a subproblem. Default: 1e-9
    pub gtol: f64,

    /// Absolute objective change that ends a subproblem. Default: 1e-14
    pub ftol: f64,

    /// Relative step length that ends the outer loop. Default: 1e-9
    pub xtol: f64,

    /// Largest constraint violation accepted at the solution. Default: 1e-8
    pub ctol: f64,

    /// Initial penalty weight. Default: 10.0
    pub initial_penalty: f64,

    /// Penalty growth when the violation does not shrink enough. Default: 10.0
    pub penalty_growth: f64,

    /// Upper limit of the penalty weight. Default: 1e10
    pub max_penalty: f64,

    /// Number of correction pairs kept by L-BFGS. Default: 7
    pub lbfgs_memory: usize,
}

impl Default for MinimizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_inner_iterations: 500,
            gtol: 1e-9,
            ftol: 1e-14,
            xtol: 1e-9,
            ctol: 1e-8,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e10,
            lbfgs_memory: DEFAULT_LBFGS_MEMORY,
        }
    }
}

impl MinimizeConfig {
    /// Parse pass-through options; absent keys keep their defaults.
    pub fn from_options(options: &OptimizerOptions) -> Result<Self> {
        parse_options(options)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    pub fn with_ctol(mut self, ctol: f64) -> Self {
        self.ctol = ctol;
        self
    }
}
