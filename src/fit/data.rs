//! Data binding shared by the data-driven strategies.

use ndarray::{s, Array1, Array2};

use crate::error::{BindingError, Result, SymfitError};
use crate::expr::Value;
use crate::model::{Bindings, Model};
use crate::problem::Problem;

/// Data bound against a model's slot layout.
///
/// Variables hold their observations, estimated parameters their declared
/// starting values and fixed parameters their declared (or overridden)
/// value. Dependent data is broadcast to the sample count.
#[derive(Debug, Clone)]
pub(crate) struct FitData {
    slots: Vec<Value>,
    targets: Vec<Array1<f64>>,
    free_slots: Vec<usize>,
    initial: Array1<f64>,
    n: usize,
}

impl FitData {
    /// Bind `data` to `model`. With `dependent`, every output must be bound
    /// as well; otherwise output names are rejected like any unknown name.
    pub(crate) fn new(model: &Model, data: &Bindings, dependent: bool) -> Result<Self> {
        data.check_unique()?;

        for (name, value) in data.iter() {
            let is_var = model.vars().iter().any(|v| v.name() == name);
            let is_output = dependent && model.output_names().any(|o| o == name);
            if is_var || is_output {
                continue;
            }
            match model.params().iter().find(|p| p.name() == name) {
                Some(p) if p.is_fixed() => {
                    if !value.is_scalar() {
                        return Err(SymfitError::Configuration(format!(
                            "Fixed parameter '{}' must be bound to a scalar",
                            name
                        )));
                    }
                }
                Some(_) => {
                    return Err(SymfitError::Configuration(format!(
                        "Parameter '{}' is estimated and cannot be bound to data",
                        name
                    )))
                }
                None => {
                    return Err(BindingError::Unknown {
                        name: name.to_string(),
                    }
                    .into())
                }
            }
        }

        let mut sized: Vec<&str> = model.vars().iter().map(|v| v.name()).collect();
        if dependent {
            sized.extend(model.output_names());
        }

        let mut n: Option<usize> = None;
        for name in &sized {
            let value = data.get(name).ok_or_else(|| BindingError::Missing {
                name: name.to_string(),
            })?;
            if let Some(len) = value.len() {
                match n {
                    Some(m) if m != len => {
                        return Err(SymfitError::DimensionMismatch(format!(
                            "'{}' has {} samples, expected {}",
                            name, len, m
                        )))
                    }
                    _ => n = Some(len),
                }
            }
        }
        let n = n.unwrap_or(1);
        if n == 0 {
            return Err(SymfitError::Configuration("The data arrays are empty".to_string()));
        }

        let mut slots = Vec::with_capacity(model.vars().len() + model.params().len());
        for var in model.vars() {
            slots.extend(data.get(var.name()).cloned());
        }
        for param in model.params() {
            slots.push(
                data.get(param.name())
                    .cloned()
                    .unwrap_or(Value::Scalar(param.value())),
            );
        }

        let targets = if dependent {
            model
                .output_names()
                .map(|name| match data.get(name) {
                    Some(value) => value.broadcast(n),
                    None => Err(BindingError::Missing {
                        name: name.to_string(),
                    }
                    .into()),
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            slots,
            targets,
            free_slots: model.free_param_slots(),
            initial: model.free_params().iter().map(|p| p.value()).collect(),
            n,
        })
    }

    /// Number of samples per output.
    pub(crate) fn len(&self) -> usize {
        self.n
    }

    pub(crate) fn residual_count(&self) -> usize {
        self.n * self.targets.len()
    }

    /// Declared starting values of the estimated parameters.
    pub(crate) fn initial(&self) -> Array1<f64> {
        self.initial.clone()
    }

    /// Slot vector with the estimated parameters set to `params`.
    pub(crate) fn slots_at(&self, params: &Array1<f64>) -> Vec<Value> {
        let mut slots = self.slots.clone();
        for (&slot, &value) in self.free_slots.iter().zip(params.iter()) {
            slots[slot] = Value::Scalar(value);
        }
        slots
    }

    /// Scalar value of every parameter slot, in declaration order.
    pub(crate) fn param_values(&self, model: &Model) -> Vec<f64> {
        (0..model.params().len())
            .map(|i| self.slots[model.param_slot(i)].as_scalar().unwrap_or(f64::NAN))
            .collect()
    }

    /// Total sum of squares of the dependent data around its mean.
    pub(crate) fn total_sum_of_squares(&self) -> f64 {
        self.targets
            .iter()
            .map(|y| {
                let mean = y.mean().unwrap_or(0.0);
                y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            })
            .sum()
    }
}

/// `model(x; p) - y`, stacked output after output.
pub(crate) struct ResidualProblem<'a> {
    model: &'a Model,
    data: &'a FitData,
}

impl<'a> ResidualProblem<'a> {
    pub(crate) fn new(model: &'a Model, data: &'a FitData) -> Self {
        Self { model, data }
    }
}

impl Problem for ResidualProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let n = self.data.n;
        let outputs = self.model.evaluate_slots(&self.data.slots_at(params))?;
        let mut residuals = Array1::zeros(self.data.residual_count());
        for (k, (value, target)) in outputs.iter().zip(&self.data.targets).enumerate() {
            let predicted = value.broadcast(n)?;
            residuals
                .slice_mut(s![k * n..(k + 1) * n])
                .assign(&(&predicted - target));
        }
        Ok(residuals)
    }

    fn parameter_count(&self) -> usize {
        self.data.free_slots.len()
    }

    fn residual_count(&self) -> usize {
        self.data.residual_count()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        let n = self.data.n;
        let rows = self
            .model
            .evaluate_jacobian_slots(&self.data.slots_at(params))?;
        let mut jacobian = Array2::zeros((self.residual_count(), self.parameter_count()));
        for (k, row) in rows.iter().enumerate() {
            for (j, derivative) in row.iter().enumerate() {
                jacobian
                    .slice_mut(s![k * n..(k + 1) * n, j])
                    .assign(&derivative.broadcast(n)?);
            }
        }
        Ok(jacobian)
    }
}
