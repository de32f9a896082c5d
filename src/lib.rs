//! # symfit-rs
//!
//! `symfit-rs` fits symbolic models to data. Models are written as ordinary
//! Rust expressions over [`Parameter`]s and [`Variable`]s; derivatives are
//! taken symbolically, compiled once, and fed to numerical optimizers.
//!
//! The library provides:
//! - A symbol registry with identity-keyed parameters and variables
//! - Models with cached symbolic Jacobians and compiled evaluators
//! - Equality and inequality constraints written as relations
//! - Least squares, maximum likelihood and constrained minimization strategies
//! - Fit results with standard errors and goodness-of-fit statistics
//!
//! ## Basic Usage
//!
//! ```
//! use symfit_rs::{Fit, FitStrategy, Model, Parameter, Symbolic, Variable};
//!
//! let a = Parameter::named("a");
//! let k = Parameter::builder().name("k").value(0.5).min(0.0).build().unwrap();
//! let t = Variable::named("t");
//! let model = Model::new(&a * (-(&k * &t)).exp()).unwrap();
//!
//! let ts: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
//! let ys: Vec<f64> = ts.iter().map(|t| 2.0 * (-0.8 * t).exp()).collect();
//!
//! let results = Fit::xy(&model, ts, ys).unwrap().execute().unwrap();
//! assert!((results.get_value(&k).unwrap() - 0.8).abs() < 1e-6);
//! println!("{}", results);
//! ```

// Public modules
pub mod argument;
pub mod bounds;
pub mod constraint;
pub mod error;
pub mod expr;
pub mod fit;
pub mod lm;
pub mod minimize;
pub mod model;
pub mod options;
pub mod problem;
pub mod results;
pub mod uncertainty;

mod utils;

// Re-exports for convenience
pub use argument::{parameters, variables, Argument, ArgumentId, Parameter, Variable};
pub use constraint::{Constraint, ConstraintKind, Relation};
pub use error::{BindingError, Result, SymfitError};
pub use expr::{CompiledExpr, Expr, Symbolic, Value};
pub use fit::{
    Fit, FitStrategy, LeastSquares, Likelihood, Maximize, Minimize, MinimizeParameters,
    OptimizeOver, Strategy,
};
pub use lm::LevenbergMarquardt;
pub use model::{Bindings, Model};
pub use options::OptimizerOptions;
pub use problem::Problem;
pub use results::{Estimate, FitResults, Statistics, StrategyKind};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
