//! Compiled numeric evaluators.
//!
//! A [`CompiledExpr`] is produced once per model (and per derivative) and
//! then evaluated many times by the optimizers. Inputs are addressed by
//! slot, so the caller fixes the argument order at compile time.

use std::fmt;

use ndarray::Array1;
use symb_anafis::CompiledEvaluator;

use super::{check_names, Expr, Value};
use crate::argument::Argument;
use crate::error::{BindingError, Result, SymfitError};

/// A numerical evaluator for one expression.
#[derive(Clone)]
pub struct CompiledExpr {
    evaluator: CompiledEvaluator,
    slots: usize,
}

impl CompiledExpr {
    /// Compile `expr` against the slot layout `slots`.
    ///
    /// # Errors
    ///
    /// - `BindingError::Missing` if the expression contains a symbol that
    ///   has no slot.
    /// - `Configuration` if two slots share a name.
    pub fn compile(expr: &Expr, slots: &[Argument]) -> Result<Self> {
        check_names(slots)?;
        for arg in expr.free_symbols() {
            if !slots.iter().any(|slot| slot.id() == arg.id()) {
                return Err(BindingError::Missing {
                    name: arg.name().to_string(),
                }
                .into());
            }
        }

        let names: Vec<&str> = slots.iter().map(Argument::name).collect();
        let evaluator = CompiledEvaluator::compile(expr.engine(), &names, None)?;
        Ok(Self {
            evaluator,
            slots: slots.len(),
        })
    }

    /// Evaluate with scalar or array inputs, broadcasting elementwise.
    ///
    /// All scalar inputs give a scalar; otherwise every array must have the
    /// same length and scalars are repeated to match it.
    pub fn eval(&self, inputs: &[Value]) -> Result<Value> {
        self.check_inputs(inputs.len())?;

        let mut points: Option<usize> = None;
        for input in inputs {
            if let Some(n) = input.len() {
                match points {
                    Some(m) if m != n => {
                        return Err(SymfitError::DimensionMismatch(format!(
                            "Elementwise operation on arrays of length {} and {}",
                            m, n
                        )))
                    }
                    _ => points = Some(n),
                }
            }
        }

        let Some(n) = points else {
            let scalars: Vec<f64> = inputs.iter().filter_map(Value::as_scalar).collect();
            return Ok(Value::Scalar(self.evaluator.evaluate(&scalars)));
        };

        let columns: Vec<Array1<f64>> = inputs
            .iter()
            .map(|input| input.broadcast(n))
            .collect::<Result<_>>()?;
        let views: Vec<&[f64]> = columns
            .iter()
            .map(|column| {
                column.as_slice().ok_or_else(|| {
                    SymfitError::FunctionEvaluation("Input column is not contiguous".to_string())
                })
            })
            .collect::<Result<_>>()?;

        let mut output = vec![0.0; n];
        self.evaluator.eval_batch(&views, &mut output, None)?;
        Ok(Value::Array(Array1::from_vec(output)))
    }

    /// Evaluate with scalar inputs only.
    pub fn eval_scalar(&self, inputs: &[f64]) -> Result<f64> {
        self.check_inputs(inputs.len())?;
        Ok(self.evaluator.evaluate(inputs))
    }

    fn check_inputs(&self, given: usize) -> Result<()> {
        if given != self.slots {
            return Err(SymfitError::DimensionMismatch(format!(
                "Compiled expression expects {} inputs, got {}",
                self.slots, given
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("slots", &self.slots)
            .field("instructions", &self.evaluator.instruction_count())
            .finish()
    }
}
