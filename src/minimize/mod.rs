//! Constrained minimization of a smooth scalar objective.
//!
//! The method is an augmented Lagrangian (Powell-Hestenes-Rockafellar form)
//! whose unconstrained subproblems are solved by argmin's L-BFGS:
//!
//! - equality constraints `c(x) == 0` and inequality constraints
//!   `g(x) >= 0`, each with an analytic gradient;
//! - simple bounds handled by the internal-coordinate transform of
//!   [`crate::bounds`], never by penalty.
//!
//! After convergence the Hessian of the plain objective is approximated by
//! central differences of its gradient and inverted, giving the curvature
//! used for standard errors.

mod augmented;
pub mod config;
mod lagrangian;

use std::fmt;

use ndarray::{Array1, Array2};

use crate::constraint::ConstraintKind;
use crate::error::Result;

pub use augmented::minimize;
pub use config::MinimizeConfig;

/// A smooth scalar objective with an analytic gradient.
pub trait Objective {
    /// Length of the argument vector.
    fn dimension(&self) -> usize;

    fn value(&self, x: &Array1<f64>) -> Result<f64>;

    fn gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>>;
}

type ScalarFn<'a> = Box<dyn Fn(&Array1<f64>) -> Result<f64> + 'a>;
type GradientFn<'a> = Box<dyn Fn(&Array1<f64>) -> Result<Array1<f64>> + 'a>;

/// One constraint in the form the minimizer consumes.
pub struct ConstraintRecord<'a> {
    pub kind: ConstraintKind,
    pub function: ScalarFn<'a>,
    pub jacobian: GradientFn<'a>,
}

impl<'a> ConstraintRecord<'a> {
    pub fn new<F, J>(kind: ConstraintKind, function: F, jacobian: J) -> Self
    where
        F: Fn(&Array1<f64>) -> Result<f64> + 'a,
        J: Fn(&Array1<f64>) -> Result<Array1<f64>> + 'a,
    {
        Self {
            kind,
            function: Box::new(function),
            jacobian: Box::new(jacobian),
        }
    }
}

impl fmt::Debug for ConstraintRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintRecord")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Result of a constrained minimization.
#[derive(Debug, Clone)]
pub struct MinimizeResult {
    /// Approximate minimizer
    pub x: Array1<f64>,

    /// Objective value at `x`
    pub fun: f64,

    pub success: bool,

    pub message: String,

    /// Total L-BFGS iterations over all subproblems
    pub iterations: usize,

    /// Number of objective evaluations
    pub func_evals: usize,

    /// Inverse of the objective's Hessian at `x`, `None` if singular
    pub hess_inv: Option<Array2<f64>>,

    /// Largest constraint violation at `x`
    pub max_violation: f64,

    /// Constraints whose boundary is reached at `x`
    pub active_constraints: Vec<usize>,
}

impl fmt::Display for MinimizeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Minimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Objective: {:.6e}", self.fun)?;
        writeln!(f, "  Max violation: {:.2e}", self.max_violation)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  x: {}", self.x)?;
        Ok(())
    }
}
