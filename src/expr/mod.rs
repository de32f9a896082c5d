//! Symbolic expressions over parameters and variables.
//!
//! Expressions are composed with ordinary operators and handed to the
//! `symb_anafis` engine, which owns the expression tree, differentiation,
//! simplification and bytecode compilation. Each [`Argument`] is represented
//! in the engine by a symbol of the same name. An [`Expr`] additionally
//! records which arguments it was built from, so identity survives the
//! round trip through the name-keyed engine.
//!
//! ```
//! use symfit_rs::{Parameter, Symbolic, Variable};
//!
//! let a = Parameter::named("a");
//! let x = Variable::named("x");
//! let model = &a * x.exp();
//!
//! let da = model.diff(&(&a).into()).unwrap();
//! assert_eq!(da.to_string(), "exp(x)");
//! ```

mod compile;
mod parse;
mod value;

pub use compile::CompiledExpr;
pub use value::Value;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use symb_anafis::{symb, Diff};

use crate::argument::{Argument, ArgumentId, Parameter, Variable};
use crate::error::{Result, SymfitError};

/// Names the engine reads as mathematical constants.
const RESERVED_NAMES: [&str; 5] = ["pi", "PI", "Pi", "e", "E"];

/// Fail if two distinct arguments share a name, or an argument is named
/// after an engine constant.
pub(crate) fn check_names<'a>(args: impl IntoIterator<Item = &'a Argument>) -> Result<()> {
    let mut seen: BTreeMap<&str, ArgumentId> = BTreeMap::new();
    for arg in args {
        if RESERVED_NAMES.contains(&arg.name()) {
            return Err(SymfitError::Configuration(format!(
                "'{}' is reserved for a mathematical constant",
                arg.name()
            )));
        }
        if let Some(other) = seen.insert(arg.name(), arg.id()) {
            if other != arg.id() {
                return Err(SymfitError::Configuration(format!(
                    "Two distinct symbols are named '{}'",
                    arg.name()
                )));
            }
        }
    }
    Ok(())
}

/// An immutable, shareable symbolic expression.
#[derive(Debug, Clone)]
pub struct Expr {
    inner: symb_anafis::Expr,
    /// Arguments the expression was built from, sorted by id.
    args: Arc<[Argument]>,
}

impl Expr {
    fn from_parts(inner: symb_anafis::Expr, args: Arc<[Argument]>) -> Self {
        Self { inner, args }
    }

    /// Wrap an engine expression, keeping the `candidates` it still mentions.
    pub(crate) fn restricted(inner: symb_anafis::Expr, candidates: &[Argument]) -> Self {
        let names = inner.variables();
        let args: Vec<Argument> = candidates
            .iter()
            .filter(|arg| names.contains(arg.name()))
            .cloned()
            .collect();
        Self::from_parts(inner, args.into())
    }

    pub fn number(n: f64) -> Self {
        Self::from_parts(symb_anafis::Expr::number(n), Arc::from([]))
    }

    pub fn symbol(arg: impl Into<Argument>) -> Self {
        let arg = arg.into();
        Self::from_parts(symb_anafis::Expr::symbol(arg.name()), Arc::from([arg]))
    }

    /// The engine expression.
    pub fn engine(&self) -> &symb_anafis::Expr {
        &self.inner
    }

    pub fn as_number(&self) -> Option<f64> {
        self.inner.as_number()
    }

    fn unary(self, f: impl FnOnce(symb_anafis::Expr) -> symb_anafis::Expr) -> Expr {
        Self::from_parts(f(self.inner), self.args)
    }

    fn binary(
        a: Expr,
        b: Expr,
        f: impl FnOnce(symb_anafis::Expr, symb_anafis::Expr) -> symb_anafis::Expr,
    ) -> Expr {
        let args = merge(&a.args, &b.args);
        Self::from_parts(f(a.inner, b.inner), args)
    }

    pub fn negate(e: Expr) -> Expr {
        e.unary(|e| -e)
    }

    pub fn add(a: Expr, b: Expr) -> Expr {
        Self::binary(a, b, |a, b| a + b)
    }

    pub fn sub(a: Expr, b: Expr) -> Expr {
        Self::binary(a, b, |a, b| a - b)
    }

    pub fn mul(a: Expr, b: Expr) -> Expr {
        Self::binary(a, b, |a, b| a * b)
    }

    pub fn div(a: Expr, b: Expr) -> Expr {
        Self::binary(a, b, |a, b| a / b)
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        Self::binary(base, exponent, |b, e| b.pow(e))
    }

    /// Every distinct symbol in the expression, ordered by identity.
    pub fn free_symbols(&self) -> Vec<Argument> {
        self.args.to_vec()
    }

    /// Whether the symbol with `id` occurs in the expression.
    pub fn depends_on(&self, id: ArgumentId) -> bool {
        self.args.iter().any(|arg| arg.id() == id)
    }

    /// Partial derivative with respect to `wrt`, simplified by the engine.
    ///
    /// Symbols are matched by identity: an expression that does not contain
    /// `wrt` differentiates to zero without calling the engine.
    ///
    /// # Errors
    ///
    /// - `Configuration` if another symbol of the expression shares the
    ///   name of `wrt`.
    /// - `Symbolic` if the engine cannot differentiate the expression.
    pub fn diff(&self, wrt: &Argument) -> Result<Expr> {
        if !self.depends_on(wrt.id()) {
            return Ok(Expr::number(0.0));
        }
        check_names(self.args.iter())?;

        let derived = Diff::new()
            .domain_safe(true)
            .differentiate(&self.inner, &symb(wrt.name()))?;
        Ok(Self::restricted(derived, &self.args))
    }
}

fn merge(a: &Arc<[Argument]>, b: &Arc<[Argument]>) -> Arc<[Argument]> {
    if b.is_empty() || Arc::ptr_eq(a, b) {
        return a.clone();
    }
    if a.is_empty() {
        return b.clone();
    }
    let mut merged: BTreeMap<ArgumentId, Argument> =
        a.iter().map(|arg| (arg.id(), arg.clone())).collect();
    for arg in b.iter() {
        merged.entry(arg.id()).or_insert_with(|| arg.clone());
    }
    merged.into_values().collect()
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::number(n)
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

impl From<Parameter> for Expr {
    fn from(p: Parameter) -> Self {
        Expr::symbol(p)
    }
}

impl From<&Parameter> for Expr {
    fn from(p: &Parameter) -> Self {
        Expr::symbol(p)
    }
}

impl From<Variable> for Expr {
    fn from(v: Variable) -> Self {
        Expr::symbol(v)
    }
}

impl From<&Variable> for Expr {
    fn from(v: &Variable) -> Self {
        Expr::symbol(v)
    }
}

impl From<Argument> for Expr {
    fn from(a: Argument) -> Self {
        Expr::symbol(a)
    }
}

impl From<&Argument> for Expr {
    fn from(a: &Argument) -> Self {
        Expr::symbol(a.clone())
    }
}

/// Method-style builders shared by expressions and symbols.
pub trait Symbolic: Clone + Into<Expr> {
    fn pow(&self, exponent: impl Into<Expr>) -> Expr {
        Expr::pow(self.clone().into(), exponent.into())
    }

    fn sin(&self) -> Expr {
        Expr::unary(self.clone().into(), symb_anafis::Expr::sin)
    }

    fn cos(&self) -> Expr {
        Expr::unary(self.clone().into(), symb_anafis::Expr::cos)
    }

    fn tan(&self) -> Expr {
        Expr::unary(self.clone().into(), symb_anafis::Expr::tan)
    }

    fn exp(&self) -> Expr {
        Expr::unary(self.clone().into(), symb_anafis::Expr::exp)
    }

    fn ln(&self) -> Expr {
        Expr::unary(self.clone().into(), symb_anafis::Expr::ln)
    }

    fn sqrt(&self) -> Expr {
        Expr::unary(self.clone().into(), symb_anafis::Expr::sqrt)
    }
}

impl Symbolic for Expr {}
impl Symbolic for Parameter {}
impl Symbolic for Variable {}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $ctor:path) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                $ctor(self, rhs.into())
            }
        }

        impl<R: Into<Expr>> $trait<R> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                $ctor(self.clone(), rhs.into())
            }
        }

        impl<R: Into<Expr>> $trait<R> for Parameter {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                $ctor(self.into(), rhs.into())
            }
        }

        impl<R: Into<Expr>> $trait<R> for &Parameter {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                $ctor(self.into(), rhs.into())
            }
        }

        impl<R: Into<Expr>> $trait<R> for Variable {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                $ctor(self.into(), rhs.into())
            }
        }

        impl<R: Into<Expr>> $trait<R> for &Variable {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                $ctor(self.into(), rhs.into())
            }
        }

        impl_binary_op!(@scalar $trait, $method, $ctor, Expr, &Expr, Parameter, &Parameter, Variable, &Variable);
    };
    (@scalar $trait:ident, $method:ident, $ctor:path, $($rhs:ty),*) => {
        $(
            impl $trait<$rhs> for f64 {
                type Output = Expr;
                fn $method(self, rhs: $rhs) -> Expr {
                    $ctor(Expr::number(self), rhs.into())
                }
            }
        )*
    };
}

impl_binary_op!(Add, add, Expr::add);
impl_binary_op!(Sub, sub, Expr::sub);
impl_binary_op!(Mul, mul, Expr::mul);
impl_binary_op!(Div, div, Expr::div);

macro_rules! impl_neg {
    ($($t:ty),*) => {
        $(
            impl Neg for $t {
                type Output = Expr;
                fn neg(self) -> Expr {
                    Expr::negate(self.into())
                }
            }
        )*
    };
}

impl_neg!(Expr, &Expr, Parameter, &Parameter, Variable, &Variable);

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(p: &Parameter) -> Argument {
        p.into()
    }

    fn value_at(e: &Expr, slots: &[Argument], at: &[f64]) -> f64 {
        CompiledExpr::compile(e, slots).unwrap().eval_scalar(at).unwrap()
    }

    #[test]
    fn test_free_symbols_ordered_by_identity() {
        let x = Variable::named("x");
        let b = Parameter::named("b");
        let a = Parameter::named("a");
        let e = &a * &x + &b * &x;

        let names: Vec<_> = e.free_symbols().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["x", "b", "a"]);
        assert!(e.depends_on(a.id()));
        assert!(!Expr::number(1.0).depends_on(a.id()));
    }

    #[test]
    fn test_linear_derivatives() {
        let a = Parameter::named("a");
        let b = Parameter::named("b");
        let x = Variable::named("x");
        let model = &a * &x + &b;

        assert_eq!(model.diff(&arg(&a)).unwrap().to_string(), "x");
        assert_eq!(model.diff(&arg(&b)).unwrap().as_number(), Some(1.0));
        assert_eq!(model.diff(&(&x).into()).unwrap().to_string(), "a");
    }

    #[test]
    fn test_derivative_keeps_only_remaining_symbols() {
        let a = Parameter::named("a");
        let b = Parameter::named("b");
        let x = Variable::named("x");
        let d = (&a * &x + &b).diff(&arg(&a)).unwrap();

        assert!(d.depends_on(x.id()));
        assert!(!d.depends_on(a.id()));
        assert!(!d.depends_on(b.id()));
    }

    #[test]
    fn test_identity_based() {
        let a1 = Parameter::named("a");
        let a2 = Parameter::named("a");

        let model = 3.0 * &a1;
        assert_eq!(model.diff(&arg(&a2)).unwrap().as_number(), Some(0.0));
        assert_eq!(model.diff(&arg(&a1)).unwrap().as_number(), Some(3.0));

        // Both symbols would reach the engine under one name.
        assert!(matches!(
            (&a1 * &a2).diff(&arg(&a1)),
            Err(SymfitError::Configuration(_))
        ));
    }

    #[test]
    fn test_chain_and_power_rules_numerically() {
        let b = Parameter::named("b");
        let x = Variable::named("x");
        let slots: Vec<Argument> = vec![(&x).into(), (&b).into()];

        let cube = x.pow(3.0).diff(&(&x).into()).unwrap();
        assert!((value_at(&cube, &slots, &[2.0, 0.0]) - 12.0).abs() < 1e-12);

        let growth = (&b * &x).exp().diff(&arg(&b)).unwrap();
        let expected = 2.0 * (0.5f64 * 2.0).exp();
        assert!((value_at(&growth, &slots, &[2.0, 0.5]) - expected).abs() < 1e-12);

        let recip = (1.0 / &b).diff(&arg(&b)).unwrap();
        assert!((value_at(&recip, &slots, &[0.0, 2.0]) + 0.25).abs() < 1e-12);

        let wave = x.sin().diff(&(&x).into()).unwrap();
        assert!((value_at(&wave, &slots, &[0.3, 0.0]) - 0.3f64.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_name_checks() {
        let e = Parameter::named("e");
        let a1 = Parameter::named("a");
        let a2 = Parameter::named("a");
        assert!(check_names([&Argument::from(&e)]).is_err());
        assert!(check_names([&Argument::from(&a1), &Argument::from(&a2)]).is_err());
        assert!(check_names([&Argument::from(&a1), &Argument::from(&a1)]).is_ok());
    }
}
