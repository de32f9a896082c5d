//! Box bounds and the Minuit-style internal transform.
//!
//! Bounded least-squares parameters are optimized in an unconstrained
//! "internal" coordinate that maps onto the allowed interval:
//!
//! - lower bound only: `ext = min - 1 + sqrt(int^2 + 1)`
//! - upper bound only: `ext = max + 1 - sqrt(int^2 + 1)`
//! - both bounds: `ext = min + (sin(int) + 1) * (max - min) / 2`
//!
//! Both the least-squares solver and the constrained minimizer work in
//! these internal coordinates.

use serde::Serialize;

use crate::error::{Result, SymfitError};

/// Relative distance by which a start on a bound is moved inside.
const START_OFFSET: f64 = 1e-3;

/// Optional lower and upper bound of one optimized argument.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(SymfitError::Configuration(format!(
                    "Invalid bounds: min ({}) must not exceed max ({})",
                    lo, hi
                )));
            }
        }
        Ok(Self { min, max })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |lo| value >= lo) && self.max.map_or(true, |hi| value <= hi)
    }

    /// Project `value` onto the interval.
    pub fn clamp(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |lo| value.max(lo));
        self.max.map_or(value, |hi| value.min(hi))
    }
}

impl From<(Option<f64>, Option<f64>)> for Bounds {
    fn from((min, max): (Option<f64>, Option<f64>)) -> Self {
        Self { min, max }
    }
}

/// Maps between internal (unconstrained) and external (bounded) values.
#[derive(Debug, Clone, Copy)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn to_external(&self, internal: f64) -> f64 {
        match (self.bounds.min, self.bounds.max) {
            (None, None) => internal,
            (Some(lo), None) => lo - 1.0 + (internal * internal + 1.0).sqrt(),
            (None, Some(hi)) => hi + 1.0 - (internal * internal + 1.0).sqrt(),
            (Some(lo), Some(hi)) => lo + (internal.sin() + 1.0) * (hi - lo) / 2.0,
        }
    }

    /// Inverse of [`BoundsTransform::to_external`].
    ///
    /// # Errors
    ///
    /// `SymfitError::Configuration` if `external` is not finite or lies
    /// outside the bounds.
    pub fn to_internal(&self, external: f64) -> Result<f64> {
        if !external.is_finite() {
            return Err(SymfitError::Configuration(format!(
                "Non-finite starting value {}",
                external
            )));
        }
        if !self.bounds.contains(external) {
            return Err(SymfitError::Configuration(format!(
                "Starting value {} lies outside [{}, {}]",
                external,
                self.bounds.min.unwrap_or(f64::NEG_INFINITY),
                self.bounds.max.unwrap_or(f64::INFINITY)
            )));
        }

        Ok(match (self.bounds.min, self.bounds.max) {
            (None, None) => external,
            (Some(lo), None) => ((external - lo + 1.0).powi(2) - 1.0).sqrt(),
            (None, Some(hi)) => ((hi - external + 1.0).powi(2) - 1.0).sqrt(),
            (Some(lo), Some(hi)) if hi > lo => {
                let scaled = 2.0 * (external - lo) / (hi - lo) - 1.0;
                scaled.clamp(-1.0, 1.0).asin()
            }
            (Some(_), Some(_)) => 0.0,
        })
    }

    /// Internal starting value for `external`.
    ///
    /// `d ext / d int` vanishes on a bound, so a start exactly on one is
    /// first moved a small step into the interval.
    pub fn start_internal(&self, external: f64) -> Result<f64> {
        let internal = self.to_internal(external)?;
        let step = START_OFFSET * (1.0 + external.abs());
        let nudged = match (self.bounds.min, self.bounds.max) {
            (Some(lo), Some(hi)) if hi > lo => {
                let step = step.min(0.25 * (hi - lo));
                if external == lo {
                    lo + step
                } else if external == hi {
                    hi - step
                } else {
                    return Ok(internal);
                }
            }
            (Some(lo), None) if external == lo => lo + step,
            (None, Some(hi)) if external == hi => hi - step,
            _ => return Ok(internal),
        };
        self.to_internal(nudged)
    }

    /// `d ext / d int` at `internal`.
    pub fn derivative(&self, internal: f64) -> f64 {
        match (self.bounds.min, self.bounds.max) {
            (None, None) => 1.0,
            (Some(_), None) => internal / (internal * internal + 1.0).sqrt(),
            (None, Some(_)) => -internal / (internal * internal + 1.0).sqrt(),
            (Some(lo), Some(hi)) => (hi - lo) * internal.cos() / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip_all_bound_kinds() {
        let cases = [
            (Bounds::unbounded(), 3.5),
            (Bounds::new(Some(1.0), None).unwrap(), 4.0),
            (Bounds::new(None, Some(2.0)).unwrap(), -3.0),
            (Bounds::new(Some(0.0), Some(10.0)).unwrap(), 7.5),
        ];
        for (bounds, external) in cases {
            let t = BoundsTransform::new(bounds);
            let internal = t.to_internal(external).unwrap();
            assert_relative_eq!(t.to_external(internal), external, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_external_always_within_bounds() {
        let t = BoundsTransform::new(Bounds::new(Some(-1.0), Some(1.0)).unwrap());
        for internal in [-100.0, -3.0, 0.0, 2.0, 55.0] {
            let ext = t.to_external(internal);
            assert!((-1.0..=1.0).contains(&ext));
        }
        let lower = BoundsTransform::new(Bounds::new(Some(2.0), None).unwrap());
        assert!(lower.to_external(-40.0) >= 2.0);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let t = BoundsTransform::new(Bounds::new(Some(0.0), Some(4.0)).unwrap());
        let h = 1e-6;
        let x = 0.3;
        let numeric = (t.to_external(x + h) - t.to_external(x - h)) / (2.0 * h);
        assert_relative_eq!(t.derivative(x), numeric, epsilon = 1e-8);
    }

    #[test]
    fn test_start_on_bound_moves_inside() {
        let cases = [
            (Bounds::new(Some(0.0), None).unwrap(), 0.0),
            (Bounds::new(None, Some(2.0)).unwrap(), 2.0),
            (Bounds::new(Some(-1.0), Some(1.0)).unwrap(), -1.0),
            (Bounds::new(Some(-1.0), Some(1.0)).unwrap(), 1.0),
        ];
        for (bounds, external) in cases {
            let t = BoundsTransform::new(bounds);
            let internal = t.start_internal(external).unwrap();
            assert!(t.derivative(internal).abs() > 1e-4);
            assert!(bounds.contains(t.to_external(internal)));
            assert_relative_eq!(t.to_external(internal), external, epsilon = 1e-2);
        }

        // Interior starts are left alone
        let t = BoundsTransform::new(Bounds::new(Some(0.0), None).unwrap());
        assert_relative_eq!(t.to_external(t.start_internal(3.0).unwrap()), 3.0, epsilon = 1e-12);

        // A degenerate interval stays put
        let t = BoundsTransform::new(Bounds::new(Some(1.0), Some(1.0)).unwrap());
        assert_eq!(t.to_external(t.start_internal(1.0).unwrap()), 1.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Bounds::new(Some(2.0), Some(1.0)).is_err());
        let t = BoundsTransform::new(Bounds::new(Some(0.0), None).unwrap());
        assert!(t.to_internal(-1.0).is_err());
        assert!(t.to_internal(f64::NAN).is_err());
        assert_eq!(Bounds::new(Some(0.0), Some(1.0)).unwrap().clamp(3.0), 1.0);
    }
}
