//! Relational constraints and their optimizer encoding.
//!
//! A [`Constraint`] is a relation between two expressions. Before it reaches
//! an optimizer it is normalized to `g == 0` or `g >= 0` and compiled,
//! together with its Jacobian, against a model's slot layout. See
//! [`encode`].

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use log::{debug, warn};

use crate::argument::{Argument, ArgumentId};
use crate::error::{BindingError, Result, SymfitError};
use crate::expr::{CompiledExpr, Expr};
use crate::fit::OptimizeOver;
use crate::model::Model;

/// The relation between the two sides of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Gt | Self::Lt)
    }
}

/// Canonical kind understood by the optimizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `g == 0`
    Eq,
    /// `g >= 0`
    Ineq,
}

/// `lhs <relation> rhs`
///
/// ```
/// use symfit_rs::{Constraint, ConstraintKind, Symbolic, Variable};
///
/// let x = Variable::named("x");
/// let y = Variable::named("y");
/// let c = Constraint::le(&y, x.pow(2.0));
///
/// let (kind, g) = c.canonical().unwrap();
/// assert_eq!(kind, ConstraintKind::Ineq);
/// assert_eq!(g.free_symbols().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Constraint {
    lhs: Expr,
    rhs: Expr,
    relation: Relation,
    jacobian: OnceLock<(Vec<ArgumentId>, Vec<Expr>)>,
}

impl Constraint {
    pub fn new(lhs: impl Into<Expr>, relation: Relation, rhs: impl Into<Expr>) -> Self {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into(),
            relation,
            jacobian: OnceLock::new(),
        }
    }

    pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(lhs, Relation::Eq, rhs)
    }

    pub fn ne(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(lhs, Relation::Ne, rhs)
    }

    pub fn gt(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(lhs, Relation::Gt, rhs)
    }

    pub fn lt(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(lhs, Relation::Lt, rhs)
    }

    pub fn ge(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(lhs, Relation::Ge, rhs)
    }

    pub fn le(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::new(lhs, Relation::Le, rhs)
    }

    pub fn lhs(&self) -> &Expr {
        &self.lhs
    }

    pub fn rhs(&self) -> &Expr {
        &self.rhs
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// Normalize to `g == 0` or `g >= 0`.
    ///
    /// # Errors
    ///
    /// `SymfitError::UnsupportedConstraint` for `!=`.
    pub fn canonical(&self) -> Result<(ConstraintKind, Expr)> {
        let lhs = self.lhs.clone();
        let rhs = self.rhs.clone();
        match self.relation {
            Relation::Eq => Ok((ConstraintKind::Eq, Expr::sub(lhs, rhs))),
            Relation::Ge | Relation::Gt => Ok((ConstraintKind::Ineq, Expr::sub(lhs, rhs))),
            Relation::Le | Relation::Lt => Ok((ConstraintKind::Ineq, Expr::sub(rhs, lhs))),
            Relation::Ne => Err(SymfitError::UnsupportedConstraint(format!(
                "'{}' uses '!=', which no optimizer can enforce",
                self
            ))),
        }
    }

    /// Jacobian of the canonical expression with respect to `wrt`.
    ///
    /// The first ordering requested is cached. Any other ordering is derived
    /// on the fly and returned owned.
    pub fn jacobian(&self, wrt: &[Argument]) -> Result<Cow<'_, [Expr]>> {
        let ids: Vec<ArgumentId> = wrt.iter().map(Argument::id).collect();
        if let Some((cached_ids, cached)) = self.jacobian.get() {
            if *cached_ids == ids {
                return Ok(Cow::Borrowed(cached.as_slice()));
            }
            let (_, g) = self.canonical()?;
            return Ok(Cow::Owned(gradient(&g, wrt)?));
        }

        let (_, g) = self.canonical()?;
        let derived = gradient(&g, wrt)?;
        let (cached_ids, cached) = self.jacobian.get_or_init(|| (ids.clone(), derived));
        if *cached_ids == ids {
            Ok(Cow::Borrowed(cached.as_slice()))
        } else {
            Ok(Cow::Owned(gradient(&g, wrt)?))
        }
    }
}

fn gradient(g: &Expr, wrt: &[Argument]) -> Result<Vec<Expr>> {
    wrt.iter().map(|arg| g.diff(arg)).collect()
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.relation.symbol(), self.rhs)
    }
}

/// A constraint compiled for one model and one optimization vector.
#[derive(Debug, Clone)]
pub struct EncodedConstraint {
    pub kind: ConstraintKind,
    /// `g` over the model's slot layout.
    pub function: CompiledExpr,
    /// `dg/dz` for each free argument `z`, in optimization order.
    pub jacobian: Vec<CompiledExpr>,
    /// The original relation was `<` or `>` and is enforced as non-strict.
    pub strict: bool,
    pub description: String,
}

impl EncodedConstraint {
    pub fn value(&self, slots: &[f64]) -> Result<f64> {
        self.function.eval_scalar(slots)
    }

    pub fn gradient(&self, slots: &[f64]) -> Result<Vec<f64>> {
        self.jacobian.iter().map(|d| d.eval_scalar(slots)).collect()
    }
}

/// Compile `constraint` against `model` for the optimization vector chosen
/// by `over`.
///
/// # Errors
///
/// - `UnsupportedConstraint` for `!=`.
/// - `BindingError::Unknown` if the constraint mentions a symbol the model
///   does not contain.
/// - `Configuration` if a parameter-optimizing fit is constrained on a
///   variable.
pub fn encode(constraint: &Constraint, model: &Model, over: OptimizeOver) -> Result<EncodedConstraint> {
    let (kind, g) = constraint.canonical()?;

    for symbol in g.free_symbols() {
        if !model.contains(symbol.id()) {
            return Err(BindingError::Unknown {
                name: symbol.name().to_string(),
            }
            .into());
        }
        if over == OptimizeOver::Parameters && !symbol.is_parameter() {
            return Err(SymfitError::Configuration(format!(
                "Constraint '{}' refers to variable '{}', but only parameters are optimized",
                constraint,
                symbol.name()
            )));
        }
    }

    let wrt: Vec<Argument> = match over {
        OptimizeOver::Parameters => model.free_params().into_iter().map(Argument::from).collect(),
        OptimizeOver::Variables => model.vars().iter().map(Argument::from).collect(),
    };

    let slots = model.slots();
    let function = CompiledExpr::compile(&g, &slots)?;
    let jacobian = constraint
        .jacobian(&wrt)?
        .iter()
        .map(|d| CompiledExpr::compile(d, &slots))
        .collect::<Result<Vec<_>>>()?;

    let strict = constraint.relation().is_strict();
    if strict {
        warn!(
            "Strict constraint '{}' is enforced as non-strict by the optimizer",
            constraint
        );
    }
    debug!("Encoded constraint '{}' as {:?}", constraint, kind);

    Ok(EncodedConstraint {
        kind,
        function,
        jacobian,
        strict,
        description: constraint.to_string(),
    })
}

/// Encode several constraints, failing on the first error.
pub fn encode_all(
    constraints: &[Constraint],
    model: &Model,
    over: OptimizeOver,
) -> Result<Vec<EncodedConstraint>> {
    constraints.iter().map(|c| encode(c, model, over)).collect()
}
