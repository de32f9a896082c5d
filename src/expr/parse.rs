//! Text front end for expressions.
//!
//! Parsing is done by the engine. Identifiers are then resolved against the
//! symbols the caller passes in, so a parsed model shares identity with
//! symbols created in code.

use std::collections::HashSet;

use super::{check_names, Expr, RESERVED_NAMES};
use crate::argument::Argument;
use crate::error::{BindingError, Result, SymfitError};

impl Expr {
    /// Parse `text` into an expression over `symbols`.
    ///
    /// Accepts the engine's grammar: `+ - * / ^`, parentheses, implicit
    /// multiplication, elementary functions such as `sin exp ln sqrt`, and
    /// the constants `pi` and `e`.
    ///
    /// # Errors
    ///
    /// `BindingError::Unknown` for an identifier that is not in `symbols`,
    /// `SymfitError::Parse` for malformed text.
    ///
    /// # Examples
    ///
    /// ```
    /// use symfit_rs::{Argument, Expr, Parameter, Variable};
    ///
    /// let amp = Parameter::named("amp");
    /// let x = Variable::named("x");
    /// let symbols: Vec<Argument> = vec![(&amp).into(), (&x).into()];
    ///
    /// let e = Expr::parse("amp * exp(-x / 2)", &symbols).unwrap();
    /// assert_eq!(e.free_symbols(), symbols);
    /// assert!(Expr::parse("amp * z", &symbols).is_err());
    /// ```
    pub fn parse(text: &str, symbols: &[Argument]) -> Result<Expr> {
        check_names(symbols)?;
        let known: HashSet<String> = symbols.iter().map(|s| s.name().to_string()).collect();

        let parsed = symb_anafis::parse(text, &known, &HashSet::new(), None)
            .map_err(|e| SymfitError::Parse(e.to_string()))?;

        let mut unknown: Vec<String> = parsed
            .variables()
            .into_iter()
            .filter(|name| !known.contains(name) && !RESERVED_NAMES.contains(&name.as_str()))
            .collect();
        unknown.sort();
        if let Some(name) = unknown.into_iter().next() {
            return Err(BindingError::Unknown { name }.into());
        }

        let mut ordered = symbols.to_vec();
        ordered.sort_by_key(Argument::id);
        ordered.dedup_by_key(|s| s.id());
        Ok(Expr::restricted(parsed, &ordered))
    }
}
