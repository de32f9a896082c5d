//! Fit results.
//!
//! [`FitResults`] is an immutable snapshot produced by one `execute()` call.
//! Estimates are keyed by argument identity; the name based accessors are
//! a convenience on top.

use std::fmt;

use ndarray::Array2;
use serde::Serialize;

use crate::argument::{Argument, ArgumentId};
use crate::error::{Result, SymfitError};
use crate::uncertainty;

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrategyKind {
    LeastSquares,
    Likelihood,
    Minimize,
    Maximize,
    MinimizeParameters,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LeastSquares => "LeastSquares",
            Self::Likelihood => "Likelihood",
            Self::Minimize => "Minimize",
            Self::Maximize => "Maximize",
            Self::MinimizeParameters => "MinimizeParameters",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value and standard deviation of one argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    #[serde(skip)]
    pub(crate) id: ArgumentId,
    pub name: String,
    pub value: f64,
    pub stdev: Option<f64>,
    /// Whether the argument was held fixed during the fit.
    pub fixed: bool,
}

impl Estimate {
    pub(crate) fn new(arg: &Argument, value: f64, stdev: Option<f64>, fixed: bool) -> Self {
        Self {
            id: arg.id(),
            name: arg.name().to_string(),
            value,
            stdev,
            fixed,
        }
    }

    pub fn id(&self) -> ArgumentId {
        self.id
    }
}

/// Strategy specific goodness-of-fit quantities.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statistics {
    /// Residual based: least squares and parameter minimization.
    Residuals {
        chi_squared: f64,
        degrees_of_freedom: usize,
        r_squared: Option<f64>,
    },
    /// Maximum likelihood.
    Likelihood { log_likelihood: f64 },
    None,
}

/// The outcome of one fit or optimization.
#[derive(Debug, Clone, Serialize)]
pub struct FitResults {
    pub(crate) strategy: StrategyKind,
    pub(crate) estimates: Vec<Estimate>,
    /// Identities of the covariance rows, in order.
    #[serde(skip)]
    pub(crate) free: Vec<ArgumentId>,
    #[serde(serialize_with = "serialize_matrix")]
    pub(crate) covariance: Option<Array2<f64>>,
    pub(crate) objective_value: f64,
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) iterations: usize,
    pub(crate) func_evals: usize,
    pub(crate) statistics: Statistics,
}

fn serialize_matrix<S>(matrix: &Option<Array2<f64>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let rows: Option<Vec<Vec<f64>>> = matrix
        .as_ref()
        .map(|m| m.rows().into_iter().map(|r| r.to_vec()).collect());
    rows.serialize(serializer)
}

impl FitResults {
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Every estimate, parameters first in declaration order.
    pub fn estimates(&self) -> &[Estimate] {
        &self.estimates
    }

    fn find(&self, arg: &Argument) -> Result<&Estimate> {
        self.estimates
            .iter()
            .find(|e| e.id == arg.id())
            .ok_or_else(|| SymfitError::NoSuchParameter(arg.name().to_string()))
    }

    fn find_by_name(&self, name: &str) -> Result<&Estimate> {
        self.estimates
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| SymfitError::NoSuchParameter(name.to_string()))
    }

    /// Fitted value of `arg`.
    ///
    /// # Errors
    ///
    /// `NoSuchParameter` if `arg` is not part of this result.
    pub fn get_value(&self, arg: impl Into<Argument>) -> Result<f64> {
        Ok(self.find(&arg.into())?.value)
    }

    /// Standard deviation of `arg`; `Ok(None)` when it exists but has none.
    pub fn get_stdev(&self, arg: impl Into<Argument>) -> Result<Option<f64>> {
        Ok(self.find(&arg.into())?.stdev)
    }

    /// Fitted value looked up by name.
    pub fn value(&self, name: &str) -> Result<f64> {
        Ok(self.find_by_name(name)?.value)
    }

    /// Standard deviation looked up by name.
    pub fn stdev(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.find_by_name(name)?.stdev)
    }

    /// Covariance of the free arguments, ordered as [`FitResults::free_arguments`].
    pub fn covariance_matrix(&self) -> Option<&Array2<f64>> {
        self.covariance.as_ref()
    }

    /// Names of the free arguments, in covariance order.
    pub fn free_arguments(&self) -> Vec<&str> {
        self.free
            .iter()
            .filter_map(|id| self.estimates.iter().find(|e| e.id == *id))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Covariance between two arguments; `Ok(None)` if either is fixed or
    /// no covariance was estimated.
    pub fn covariance(&self, a: impl Into<Argument>, b: impl Into<Argument>) -> Result<Option<f64>> {
        let (a, b) = (a.into(), b.into());
        self.find(&a)?;
        self.find(&b)?;
        let index = |arg: &Argument| self.free.iter().position(|id| *id == arg.id());
        Ok(match (&self.covariance, index(&a), index(&b)) {
            (Some(cov), Some(i), Some(j)) => Some(cov[[i, j]]),
            _ => None,
        })
    }

    /// Correlation matrix derived from the covariance.
    pub fn correlation_matrix(&self) -> Option<Array2<f64>> {
        self.covariance.as_ref().map(uncertainty::correlation)
    }

    /// Objective at the optimum, with the sign of the user's objective.
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn func_evals(&self) -> usize {
        self.func_evals
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    fn unsupported(&self, statistic: &'static str) -> SymfitError {
        SymfitError::UnsupportedStatistic {
            statistic,
            strategy: self.strategy.name(),
        }
    }

    /// Coefficient of determination, `None` when the data has no variance.
    pub fn r_squared(&self) -> Result<Option<f64>> {
        match self.statistics {
            Statistics::Residuals { r_squared, .. } => Ok(r_squared),
            _ => Err(self.unsupported("r_squared")),
        }
    }

    /// Sum of squared residuals.
    pub fn chi_squared(&self) -> Result<f64> {
        match self.statistics {
            Statistics::Residuals { chi_squared, .. } => Ok(chi_squared),
            _ => Err(self.unsupported("chi_squared")),
        }
    }

    pub fn degrees_of_freedom(&self) -> Result<usize> {
        match self.statistics {
            Statistics::Residuals {
                degrees_of_freedom, ..
            } => Ok(degrees_of_freedom),
            _ => Err(self.unsupported("degrees_of_freedom")),
        }
    }

    /// `chi_squared / degrees_of_freedom`, `None` without degrees of freedom.
    pub fn reduced_chi_squared(&self) -> Result<Option<f64>> {
        match self.statistics {
            Statistics::Residuals {
                chi_squared,
                degrees_of_freedom,
                ..
            } => Ok((degrees_of_freedom > 0).then(|| chi_squared / degrees_of_freedom as f64)),
            _ => Err(self.unsupported("reduced_chi_squared")),
        }
    }

    pub fn log_likelihood(&self) -> Result<f64> {
        match self.statistics {
            Statistics::Likelihood { log_likelihood } => Ok(log_likelihood),
            _ => Err(self.unsupported("log_likelihood")),
        }
    }

    /// Serialize the whole result as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for FitResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Parameter Value        Standard Deviation")?;
        for e in &self.estimates {
            let stdev = match e.stdev {
                Some(s) => format!("{:.6e}", s),
                None => "None".to_string(),
            };
            writeln!(f, "{:<9} {:<14.6e} {}", e.name, e.value, stdev)?;
        }
        writeln!(f, "Fitting status message: {}", self.message)?;
        writeln!(f, "Number of iterations:   {}", self.iterations)?;
        writeln!(f, "Objective value:        {:.6e}", self.objective_value)?;
        match &self.statistics {
            Statistics::Residuals {
                chi_squared,
                r_squared,
                ..
            } => {
                writeln!(f, "Chi-squared:            {:.6e}", chi_squared)?;
                match r_squared {
                    Some(r2) => writeln!(f, "Regression Coefficient: {:.6}", r2)?,
                    None => writeln!(f, "Regression Coefficient: None")?,
                }
            }
            Statistics::Likelihood { log_likelihood } => {
                writeln!(f, "Log-likelihood:         {:.6e}", log_likelihood)?;
            }
            Statistics::None => {}
        }
        Ok(())
    }
}
