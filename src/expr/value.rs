//! Scalar-or-array numeric values with elementwise broadcasting.

use ndarray::{Array1, Zip};

use crate::error::{Result, SymfitError};

/// A numeric value produced or consumed by expression evaluation.
///
/// Scalars broadcast against arrays; two arrays combine elementwise and must
/// have the same length.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Array1<f64>),
}

impl Value {
    /// Number of elements, `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(a) => Some(a.len()),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array1<f64>> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(a) => Some(a),
        }
    }

    /// Expand to an array of length `n`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if this is an array whose length is not `n`.
    pub fn broadcast(&self, n: usize) -> Result<Array1<f64>> {
        match self {
            Self::Scalar(s) => Ok(Array1::from_elem(n, *s)),
            Self::Array(a) if a.len() == n => Ok(a.clone()),
            Self::Array(a) => Err(SymfitError::DimensionMismatch(format!(
                "Cannot broadcast array of length {} to length {}",
                a.len(),
                n
            ))),
        }
    }

    /// Sum over all elements (a scalar is its own sum).
    pub fn sum(&self) -> f64 {
        match self {
            Self::Scalar(s) => *s,
            Self::Array(a) => a.sum(),
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Self::Scalar(s) => Self::Scalar(f(*s)),
            Self::Array(a) => Self::Array(a.mapv(f)),
        }
    }

    /// Combine two values elementwise.
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Ok(Self::Scalar(f(*a, *b))),
            (Self::Scalar(a), Self::Array(b)) => Ok(Self::Array(b.mapv(|b| f(*a, b)))),
            (Self::Array(a), Self::Scalar(b)) => Ok(Self::Array(a.mapv(|a| f(a, *b)))),
            (Self::Array(a), Self::Array(b)) => {
                if a.len() != b.len() {
                    return Err(SymfitError::DimensionMismatch(format!(
                        "Elementwise operation on arrays of length {} and {}",
                        a.len(),
                        b.len()
                    )));
                }
                Ok(Self::Array(Zip::from(a).and(b).map_collect(|&a, &b| f(a, b))))
            }
        }
    }
}

impl From<f64> for Value {
    fn from(s: f64) -> Self {
        Self::Scalar(s)
    }
}

impl From<Array1<f64>> for Value {
    fn from(a: Array1<f64>) -> Self {
        Self::Array(a)
    }
}

impl From<&Array1<f64>> for Value {
    fn from(a: &Array1<f64>) -> Self {
        Self::Array(a.clone())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Array(Array1::from_vec(v))
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Self::Array(Array1::from_vec(v.to_vec()))
    }
}
