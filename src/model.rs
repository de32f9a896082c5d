//! Symbolic models with cached derivatives and compiled evaluators.
//!
//! A [`Model`] owns one or more named output expressions, classifies their
//! free symbols into parameters and variables, and lazily derives the
//! Jacobian with respect to the non-fixed parameters. Every derived artefact
//! is cached for the lifetime of the model; the model itself is never
//! mutated by fitting, so it can be shared across threads.
//!
//! Numeric evaluation is keyword based through [`Bindings`]:
//!
//! ```
//! use symfit_rs::{Bindings, Model, Parameter, Variable};
//!
//! let a = Parameter::named("a");
//! let b = Parameter::named("b");
//! let x = Variable::named("x");
//! let model = Model::new(&a * &x + &b).unwrap();
//!
//! let y = model
//!     .evaluate(&Bindings::new().bind("x", vec![0.0, 1.0]).bind("a", 2.0).bind("b", 1.0))
//!     .unwrap();
//! assert_eq!(y[0].as_array().unwrap().to_vec(), vec![1.0, 3.0]);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use log::debug;

use crate::argument::{Argument, ArgumentId, Parameter, Variable};
use crate::error::{BindingError, Result, SymfitError};
use crate::expr::{check_names, CompiledExpr, Expr, Value};

/// Name of the output of a single-expression model.
pub const DEFAULT_OUTPUT: &str = "y";

/// An ordered set of keyword values.
///
/// Insertion order is kept; duplicates are reported when the bindings are
/// resolved against a model.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, builder style.
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.entries.push((name.to_string(), value.into()));
    }

    /// First value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail on the first name bound more than once.
    pub fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (name, _) in &self.entries {
            if !seen.insert(name.as_str()) {
                return Err(BindingError::Duplicate { name: name.clone() }.into());
            }
        }
        Ok(())
    }
}

impl<S: AsRef<str>, V: Into<Value>> FromIterator<(S, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name.as_ref(), value);
        }
        bindings
    }
}

/// A symbolic model: named outputs over parameters and variables.
#[derive(Debug)]
pub struct Model {
    outputs: Vec<(String, Expr)>,
    params: Vec<Parameter>,
    vars: Vec<Variable>,
    jacobian: OnceLock<Vec<Vec<Expr>>>,
    variable_jacobian: OnceLock<Vec<Vec<Expr>>>,
    compiled_eval: OnceLock<Vec<CompiledExpr>>,
    compiled_jacobian: OnceLock<Vec<Vec<CompiledExpr>>>,
    compiled_variable_jacobian: OnceLock<Vec<Vec<CompiledExpr>>>,
}

impl Model {
    /// Single-output model; the output is named `y`.
    pub fn new(expr: impl Into<Expr>) -> Result<Self> {
        Self::with_outputs([(DEFAULT_OUTPUT, expr.into())])
    }

    /// Model with several named outputs sharing parameters.
    ///
    /// # Errors
    ///
    /// `SymfitError::Configuration` when there are no outputs, an output name
    /// repeats, two distinct symbols (or a symbol and an output) share a
    /// name, or a symbol is named after a constant such as `pi`.
    pub fn with_outputs<I, S, E>(outputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: Into<Expr>,
    {
        let outputs: Vec<(String, Expr)> = outputs
            .into_iter()
            .map(|(name, expr)| (name.into(), expr.into()))
            .collect();

        if outputs.is_empty() {
            return Err(SymfitError::Configuration(
                "A model needs at least one output".to_string(),
            ));
        }

        let mut symbols: HashMap<ArgumentId, Argument> = HashMap::new();
        for (_, expr) in &outputs {
            for symbol in expr.free_symbols() {
                symbols.entry(symbol.id()).or_insert(symbol);
            }
        }

        check_names(symbols.values())?;

        let mut output_names = HashSet::new();
        for (name, _) in &outputs {
            if !output_names.insert(name.as_str()) {
                return Err(SymfitError::Configuration(format!(
                    "Output '{}' is defined more than once",
                    name
                )));
            }
            if symbols.values().any(|symbol| symbol.name() == name) {
                return Err(SymfitError::Configuration(format!(
                    "Output '{}' has the same name as a model symbol",
                    name
                )));
            }
        }

        let mut ordered: Vec<Argument> = symbols.into_values().collect();
        ordered.sort_by_key(Argument::id);

        let mut params = Vec::new();
        let mut vars = Vec::new();
        for symbol in ordered {
            match symbol {
                Argument::Parameter(p) => params.push(p),
                Argument::Variable(v) => vars.push(v),
            }
        }

        Ok(Self {
            outputs,
            params,
            vars,
            jacobian: OnceLock::new(),
            variable_jacobian: OnceLock::new(),
            compiled_eval: OnceLock::new(),
            compiled_jacobian: OnceLock::new(),
            compiled_variable_jacobian: OnceLock::new(),
        })
    }

    /// All parameters in declaration order, fixed ones included.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Parameters that enter the optimization vector.
    pub fn free_params(&self) -> Vec<&Parameter> {
        self.params.iter().filter(|p| !p.is_fixed()).collect()
    }

    /// Independent variables in declaration order.
    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn outputs(&self) -> &[(String, Expr)] {
        &self.outputs
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|(n, _)| n.as_str())
    }

    /// Whether the model contains the symbol `id`.
    pub fn contains(&self, id: ArgumentId) -> bool {
        self.params.iter().any(|p| p.id() == id) || self.vars.iter().any(|v| v.id() == id)
    }

    /// Slot order of compiled evaluators: variables, then parameters.
    pub fn slots(&self) -> Vec<Argument> {
        self.vars
            .iter()
            .map(Argument::from)
            .chain(self.params.iter().map(Argument::from))
            .collect()
    }

    /// Slot index of every non-fixed parameter, in Jacobian order.
    pub fn free_param_slots(&self) -> Vec<usize> {
        let offset = self.vars.len();
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_fixed())
            .map(|(i, _)| offset + i)
            .collect()
    }

    /// Slot index of every parameter (fixed ones included).
    pub fn param_slot(&self, index: usize) -> usize {
        self.vars.len() + index
    }

    /// Resolve keyword bindings into a slot vector.
    ///
    /// Every variable and non-fixed parameter must be bound. Fixed
    /// parameters fall back to their declared value.
    pub fn resolve(&self, bindings: &Bindings) -> Result<Vec<Value>> {
        bindings.check_unique()?;

        for (name, _) in bindings.iter() {
            let known = self.vars.iter().any(|v| v.name() == name)
                || self.params.iter().any(|p| p.name() == name);
            if !known {
                return Err(BindingError::Unknown {
                    name: name.to_string(),
                }
                .into());
            }
        }

        let mut slots = Vec::with_capacity(self.vars.len() + self.params.len());
        for var in &self.vars {
            slots.push(required(bindings, var.name())?);
        }
        for param in &self.params {
            match bindings.get(param.name()) {
                Some(value) => slots.push(value.clone()),
                None if param.is_fixed() => slots.push(Value::Scalar(param.value())),
                None => return Err(missing(param.name())),
            }
        }
        Ok(slots)
    }

    /// Evaluate every output, in output order.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Vec<Value>> {
        let slots = self.resolve(bindings)?;
        self.evaluate_slots(&slots)
    }

    /// Evaluate every output from a prepared slot vector.
    pub fn evaluate_slots(&self, slots: &[Value]) -> Result<Vec<Value>> {
        self.compiled_eval()?
            .iter()
            .map(|compiled| compiled.eval(slots))
            .collect()
    }

    /// Evaluate the parameter Jacobian: `[output][free parameter]`.
    pub fn evaluate_jacobian(&self, bindings: &Bindings) -> Result<Vec<Vec<Value>>> {
        let slots = self.resolve(bindings)?;
        eval_rows(self.compiled_jacobian()?, &slots)
    }

    pub fn evaluate_jacobian_slots(&self, slots: &[Value]) -> Result<Vec<Vec<Value>>> {
        eval_rows(self.compiled_jacobian()?, slots)
    }

    /// Evaluate the variable Jacobian: `[output][variable]`.
    pub fn evaluate_variable_jacobian(&self, bindings: &Bindings) -> Result<Vec<Vec<Value>>> {
        let slots = self.resolve(bindings)?;
        eval_rows(self.compiled_variable_jacobian()?, &slots)
    }

    pub fn evaluate_variable_jacobian_slots(&self, slots: &[Value]) -> Result<Vec<Vec<Value>>> {
        eval_rows(self.compiled_variable_jacobian()?, slots)
    }

    /// Partial derivatives of each output with respect to each non-fixed
    /// parameter. Derived once; later calls return the same slice.
    pub fn jacobian(&self) -> Result<&[Vec<Expr>]> {
        if let Some(derived) = self.jacobian.get() {
            return Ok(derived);
        }
        let wrt: Vec<Argument> = self.free_params().into_iter().map(Argument::from).collect();
        debug!(
            "Deriving Jacobian of {} output(s) w.r.t. {} parameter(s)",
            self.outputs.len(),
            wrt.len()
        );
        let derived = differentiate(&self.outputs, &wrt)?;
        Ok(self.jacobian.get_or_init(|| derived))
    }

    /// Partial derivatives of each output with respect to each variable.
    pub fn variable_jacobian(&self) -> Result<&[Vec<Expr>]> {
        if let Some(derived) = self.variable_jacobian.get() {
            return Ok(derived);
        }
        let wrt: Vec<Argument> = self.vars.iter().map(Argument::from).collect();
        debug!(
            "Deriving Jacobian of {} output(s) w.r.t. {} variable(s)",
            self.outputs.len(),
            wrt.len()
        );
        let derived = differentiate(&self.outputs, &wrt)?;
        Ok(self.variable_jacobian.get_or_init(|| derived))
    }

    pub fn compiled_eval(&self) -> Result<&[CompiledExpr]> {
        if let Some(compiled) = self.compiled_eval.get() {
            return Ok(compiled);
        }
        let slots = self.slots();
        let built = self
            .outputs
            .iter()
            .map(|(_, expr)| CompiledExpr::compile(expr, &slots))
            .collect::<Result<Vec<_>>>()?;
        debug!("Compiled {} output expression(s)", built.len());
        Ok(self.compiled_eval.get_or_init(|| built))
    }

    pub fn compiled_jacobian(&self) -> Result<&[Vec<CompiledExpr>]> {
        if let Some(compiled) = self.compiled_jacobian.get() {
            return Ok(compiled);
        }
        let built = compile_rows(self.jacobian()?, &self.slots())?;
        Ok(self.compiled_jacobian.get_or_init(|| built))
    }

    pub fn compiled_variable_jacobian(&self) -> Result<&[Vec<CompiledExpr>]> {
        if let Some(compiled) = self.compiled_variable_jacobian.get() {
            return Ok(compiled);
        }
        let built = compile_rows(self.variable_jacobian()?, &self.slots())?;
        Ok(self.compiled_variable_jacobian.get_or_init(|| built))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars: Vec<&str> = self.vars.iter().map(Variable::name).collect();
        let params: Vec<&str> = self.params.iter().map(Parameter::name).collect();
        for (i, (name, expr)) in self.outputs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}({}; {}) = {}",
                name,
                vars.join(", "),
                params.join(", "),
                expr
            )?;
        }
        Ok(())
    }
}

fn missing(name: &str) -> SymfitError {
    BindingError::Missing {
        name: name.to_string(),
    }
    .into()
}

fn required(bindings: &Bindings, name: &str) -> Result<Value> {
    bindings.get(name).cloned().ok_or_else(|| missing(name))
}

fn differentiate(outputs: &[(String, Expr)], wrt: &[Argument]) -> Result<Vec<Vec<Expr>>> {
    outputs
        .iter()
        .map(|(_, expr)| wrt.iter().map(|arg| expr.diff(arg)).collect())
        .collect()
}

fn compile_rows(rows: &[Vec<Expr>], slots: &[Argument]) -> Result<Vec<Vec<CompiledExpr>>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|expr| CompiledExpr::compile(expr, slots))
                .collect()
        })
        .collect()
}

fn eval_rows(rows: &[Vec<CompiledExpr>], slots: &[Value]) -> Result<Vec<Vec<Value>>> {
    rows.iter()
        .map(|row| row.iter().map(|c| c.eval(slots)).collect())
        .collect()
}
