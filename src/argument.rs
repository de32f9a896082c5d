//! Symbol registry: parameters and variables.
//!
//! Every [`Parameter`] and [`Variable`] receives a process-unique
//! [`ArgumentId`] when it is created. Identity, never the name, is what
//! models, constraints and fit results use as a key, so two symbols that
//! happen to share a name stay distinguishable. Names are only used for
//! display and for keyword binding.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Result, SymfitError};

/// Global counter for argument identities and auto-generated names.
static ARGUMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_id() -> ArgumentId {
    ArgumentId(ARGUMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Opaque identity of a symbol.
///
/// Ids are allocated monotonically, so ordering by id is ordering by
/// creation ("declaration order").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArgumentId(u64);

impl fmt::Display for ArgumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct ParameterInner {
    id: ArgumentId,
    name: String,
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
    fixed: bool,
}

/// A symbol whose value is estimated (or held fixed) during a fit.
///
/// Parameters are cheap to clone; clones share the same identity.
///
/// # Examples
///
/// ```
/// use symfit_rs::Parameter;
///
/// let a = Parameter::builder().name("a").value(2.0).min(0.0).build().unwrap();
/// assert_eq!(a.name(), "a");
/// assert_eq!(a.value(), 2.0);
/// assert_eq!(a.min(), Some(0.0));
/// assert!(!a.is_fixed());
///
/// // Bounds and `fixed` are mutually exclusive.
/// assert!(Parameter::builder().fixed(true).min(0.0).build().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Parameter {
    inner: Arc<ParameterInner>,
}

impl Parameter {
    /// Unbounded, non-fixed parameter with initial value 1.0 and an
    /// auto-generated name.
    pub fn new() -> Self {
        Self::from_parts(None, 1.0, None, None, false)
    }

    /// Unbounded, non-fixed parameter with initial value 1.0.
    pub fn named(name: &str) -> Self {
        Self::from_parts(Some(name.to_string()), 1.0, None, None, false)
    }

    /// Start building a parameter.
    pub fn builder() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    fn from_parts(
        name: Option<String>,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
        fixed: bool,
    ) -> Self {
        let id = next_id();
        let name = name.unwrap_or_else(|| format!("par_{}", id.0));
        Self {
            inner: Arc::new(ParameterInner {
                id,
                name,
                value,
                min,
                max,
                fixed,
            }),
        }
    }

    pub fn id(&self) -> ArgumentId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Initial guess (or the held value of a fixed parameter).
    pub fn value(&self) -> f64 {
        self.inner.value
    }

    pub fn min(&self) -> Option<f64> {
        self.inner.min
    }

    pub fn max(&self) -> Option<f64> {
        self.inner.max
    }

    /// Whether the parameter is excluded from the estimated vector.
    pub fn is_fixed(&self) -> bool {
        self.inner.fixed
    }

    /// The `(min, max)` pair forwarded to optimizers.
    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.inner.min, self.inner.max)
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Parameter {}

impl Hash for Parameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builder for [`Parameter`], mirroring the keyword constructor
/// `Parameter(value, min, max, fixed, name)`.
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    name: Option<String>,
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
    fixed: bool,
}

impl Default for ParameterBuilder {
    fn default() -> Self {
        Self {
            name: None,
            value: 1.0,
            min: None,
            max: None,
            fixed: false,
        }
    }
}

impl ParameterBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Validate and allocate a fresh identity.
    ///
    /// # Errors
    ///
    /// `SymfitError::Configuration` when bounds are combined with
    /// `fixed(true)`, when `min > max`, when a value is not finite, or when
    /// the value lies outside its bounds.
    pub fn build(self) -> Result<Parameter> {
        let label = self.name.as_deref().unwrap_or("<unnamed>");

        if self.fixed && (self.min.is_some() || self.max.is_some()) {
            return Err(SymfitError::Configuration(format!(
                "Parameter '{}' cannot be fixed and bounded at the same time",
                label
            )));
        }
        if !self.value.is_finite() {
            return Err(SymfitError::Configuration(format!(
                "Parameter '{}' has a non-finite value {}",
                label, self.value
            )));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(SymfitError::Configuration(format!(
                    "Parameter '{}' has min ({}) greater than max ({})",
                    label, min, max
                )));
            }
        }
        if self.min.is_some_and(f64::is_nan) || self.max.is_some_and(f64::is_nan) {
            return Err(SymfitError::Configuration(format!(
                "Parameter '{}' has a NaN bound",
                label
            )));
        }
        if self.min.is_some_and(|min| self.value < min)
            || self.max.is_some_and(|max| self.value > max)
        {
            return Err(SymfitError::Configuration(format!(
                "Parameter '{}' has value {} outside [{}, {}]",
                label,
                self.value,
                self.min.unwrap_or(f64::NEG_INFINITY),
                self.max.unwrap_or(f64::INFINITY)
            )));
        }

        Ok(Parameter::from_parts(
            self.name, self.value, self.min, self.max, self.fixed,
        ))
    }
}

#[derive(Debug)]
struct VariableInner {
    id: ArgumentId,
    name: String,
}

/// A symbol bound to data at evaluation time (or optimized directly by
/// `Minimize`/`Maximize`).
#[derive(Debug, Clone)]
pub struct Variable {
    inner: Arc<VariableInner>,
}

impl Variable {
    /// Variable with an auto-generated name.
    pub fn new() -> Self {
        let id = next_id();
        Self {
            inner: Arc::new(VariableInner {
                id,
                name: format!("var_{}", id.0),
            }),
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            inner: Arc::new(VariableInner {
                id: next_id(),
                name: name.to_string(),
            }),
        }
    }

    pub fn id(&self) -> ArgumentId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Either kind of symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Argument {
    Parameter(Parameter),
    Variable(Variable),
}

impl Argument {
    pub fn id(&self) -> ArgumentId {
        match self {
            Self::Parameter(p) => p.id(),
            Self::Variable(v) => v.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Parameter(p) => p.name(),
            Self::Variable(v) => v.name(),
        }
    }

    pub fn as_parameter(&self) -> Option<&Parameter> {
        match self {
            Self::Parameter(p) => Some(p),
            Self::Variable(_) => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(v) => Some(v),
            Self::Parameter(_) => None,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter(_))
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Parameter> for Argument {
    fn from(p: Parameter) -> Self {
        Self::Parameter(p)
    }
}

impl From<&Parameter> for Argument {
    fn from(p: &Parameter) -> Self {
        Self::Parameter(p.clone())
    }
}

impl From<Variable> for Argument {
    fn from(v: Variable) -> Self {
        Self::Variable(v)
    }
}

impl From<&Variable> for Argument {
    fn from(v: &Variable) -> Self {
        Self::Variable(v.clone())
    }
}

impl From<&Argument> for Argument {
    fn from(a: &Argument) -> Self {
        a.clone()
    }
}

fn split_names(names: &str) -> impl Iterator<Item = &str> {
    names.split(',').map(str::trim).filter(|n| !n.is_empty())
}

/// Create several parameters at once from a comma separated list.
///
/// ```
/// let [a, b] = <[_; 2]>::try_from(symfit_rs::parameters("a, b")).unwrap();
/// assert_eq!(a.name(), "a");
/// assert_eq!(b.value(), 1.0);
/// ```
pub fn parameters(names: &str) -> Vec<Parameter> {
    split_names(names).map(Parameter::named).collect()
}

/// Create several variables at once from a comma separated list.
pub fn variables(names: &str) -> Vec<Variable> {
    split_names(names).map(Variable::named).collect()
}
