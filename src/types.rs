//! Value types stored in the plan graph.
//!
//! - `BoundedValue`: a (lower, average, upper) reward estimate
//! - `StateInfo`: per-state policy value, completeness and visit count
//! - `ActionInfo`: per-(state, action) value, completeness and visit count
//! - `StateTransitionInfo`: per-(state, action, successor) probability and utility

use std::{
    fmt,
    ops::{Add, AddAssign, Mul},
};

use serde::{Deserialize, Serialize};

/// Bounded estimate of cumulative future reward.
///
/// `upper - lower` is expected to be non-negative but the type does not enforce
/// it; heuristics are responsible for producing sensible bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundedValue {
    pub lower: f64,
    pub average: f64,
    pub upper: f64,
}

impl BoundedValue {
    /// Relative tolerance used by [`BoundedValue::approx_eq`].
    pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-6;

    pub const fn new(lower: f64, average: f64, upper: f64) -> Self {
        Self {
            lower,
            average,
            upper,
        }
    }

    /// A value with no uncertainty.
    pub const fn point(value: f64) -> Self {
        Self::new(value, value, value)
    }

    pub const fn zero() -> Self {
        Self::point(0.0)
    }

    /// Width of the estimate (`upper - lower`).
    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    /// Largest absolute component-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &BoundedValue) -> f64 {
        (self.lower - other.lower)
            .abs()
            .max((self.average - other.average).abs())
            .max((self.upper - other.upper).abs())
    }

    /// Component-wise maximum.
    pub fn component_max(&self, other: &BoundedValue) -> BoundedValue {
        BoundedValue::new(
            self.lower.max(other.lower),
            self.average.max(other.average),
            self.upper.max(other.upper),
        )
    }

    /// Approximate equality scaled by magnitude.
    ///
    /// Each component pair must satisfy `|a - b| <= tol * max(1, |a|, |b|)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use plangraph::BoundedValue;
    ///
    /// let a = BoundedValue::point(1_000_000.0);
    /// let b = BoundedValue::point(1_000_000.5);
    /// assert!(a.approx_eq(&b, 1e-6));
    /// assert!(!BoundedValue::point(0.0).approx_eq(&BoundedValue::point(0.5), 1e-6));
    /// ```
    pub fn approx_eq(&self, other: &BoundedValue, relative_tolerance: f64) -> bool {
        fn close(a: f64, b: f64, tol: f64) -> bool {
            let scale = 1.0_f64.max(a.abs()).max(b.abs());
            (a - b).abs() <= tol * scale
        }
        close(self.lower, other.lower, relative_tolerance)
            && close(self.average, other.average, relative_tolerance)
            && close(self.upper, other.upper, relative_tolerance)
    }
}

impl Mul<f64> for BoundedValue {
    type Output = BoundedValue;

    fn mul(self, rhs: f64) -> BoundedValue {
        BoundedValue::new(self.lower * rhs, self.average * rhs, self.upper * rhs)
    }
}

impl Mul<BoundedValue> for f64 {
    type Output = BoundedValue;

    fn mul(self, rhs: BoundedValue) -> BoundedValue {
        rhs * self
    }
}

impl Add<f64> for BoundedValue {
    type Output = BoundedValue;

    fn add(self, rhs: f64) -> BoundedValue {
        BoundedValue::new(self.lower + rhs, self.average + rhs, self.upper + rhs)
    }
}

impl Add<BoundedValue> for f64 {
    type Output = BoundedValue;

    fn add(self, rhs: BoundedValue) -> BoundedValue {
        rhs + self
    }
}

impl Add for BoundedValue {
    type Output = BoundedValue;

    fn add(self, rhs: BoundedValue) -> BoundedValue {
        BoundedValue::new(
            self.lower + rhs.lower,
            self.average + rhs.average,
            self.upper + rhs.upper,
        )
    }
}

impl AddAssign for BoundedValue {
    fn add_assign(&mut self, rhs: BoundedValue) {
        *self = *self + rhs;
    }
}

impl fmt::Display for BoundedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}]",
            self.lower, self.average, self.upper
        )
    }
}

/// Per-state record owned by the plan graph.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StateInfo {
    pub policy_value: BoundedValue,
    pub complete: bool,
    pub visit_count: u32,
}

impl StateInfo {
    /// Fresh record with a single visit.
    pub fn new(policy_value: BoundedValue) -> Self {
        Self {
            policy_value,
            complete: false,
            visit_count: 1,
        }
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    pub fn with_visit_count(mut self, visit_count: u32) -> Self {
        self.visit_count = visit_count;
        self
    }
}

/// Per-(state, action) record owned by the plan graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionInfo {
    pub action_value: BoundedValue,
    pub complete: bool,
    pub visit_count: u32,
}

impl ActionInfo {
    pub fn new(action_value: BoundedValue) -> Self {
        Self {
            action_value,
            complete: false,
            visit_count: 1,
        }
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    pub fn with_visit_count(mut self, visit_count: u32) -> Self {
        self.visit_count = visit_count;
        self
    }
}

impl Default for ActionInfo {
    fn default() -> Self {
        Self::new(BoundedValue::zero())
    }
}

/// Probability and immediate utility of one (state, action, successor) triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateTransitionInfo {
    pub probability: f64,
    pub transition_utility: f64,
}

impl StateTransitionInfo {
    /// Create a transition, validating the probability lies in (0, 1].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidProbability`] for zero, negative, non-finite
    /// or greater-than-one probabilities.
    pub fn new(probability: f64, transition_utility: f64) -> Result<Self, crate::Error> {
        if probability > 0.0 && probability <= 1.0 + f64::EPSILON && probability.is_finite() {
            Ok(Self {
                probability: probability.min(1.0),
                transition_utility,
            })
        } else {
            Err(crate::Error::InvalidProbability { value: probability })
        }
    }

    /// Deterministic transition with the given utility.
    pub const fn certain(transition_utility: f64) -> Self {
        Self {
            probability: 1.0,
            transition_utility,
        }
    }

    /// Combine two outcomes of the same action that land on one successor.
    ///
    /// Probabilities add and the utility becomes the probability-weighted mean.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidProbability`] when the combined
    /// probability exceeds one.
    pub fn merged(&self, other: &StateTransitionInfo) -> Result<Self, crate::Error> {
        let probability = self.probability + other.probability;
        if probability > 1.0 + f64::EPSILON {
            return Err(crate::Error::InvalidProbability { value: probability });
        }
        let transition_utility = (self.probability * self.transition_utility
            + other.probability * other.transition_utility)
            / probability;
        Ok(Self {
            probability: probability.min(1.0),
            transition_utility,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_scalar_and_pairwise_arithmetic() {
        let value = BoundedValue::new(1.0, 2.0, 4.0);
        assert_eq!(value * 0.5, BoundedValue::new(0.5, 1.0, 2.0));
        assert_eq!(0.5 * value, value * 0.5);
        assert_eq!(value + 1.0, BoundedValue::new(2.0, 3.0, 5.0));
        assert_eq!(value + value, BoundedValue::new(2.0, 4.0, 8.0));

        let mut acc = BoundedValue::zero();
        acc += value;
        acc += value * 2.0;
        assert_eq!(acc, BoundedValue::new(3.0, 6.0, 12.0));
        assert!(approx_eq(value.range(), 3.0));
    }

    #[test]
    fn test_approx_eq_scales_with_magnitude() {
        let large = BoundedValue::point(1e9);
        assert!(large.approx_eq(&BoundedValue::point(1e9 + 100.0), 1e-6));
        assert!(!large.approx_eq(&BoundedValue::point(1e9 + 1e4), 1e-6));

        let small = BoundedValue::point(1e-3);
        assert!(small.approx_eq(&BoundedValue::point(1e-3 + 1e-7), 1e-6));
        assert!(!small.approx_eq(&BoundedValue::point(2e-3), 1e-6));
    }

    #[test]
    fn test_max_abs_diff_uses_widest_component() {
        let a = BoundedValue::new(0.0, 1.0, 2.0);
        let b = BoundedValue::new(0.1, 1.0, 2.5);
        assert!(approx_eq(a.max_abs_diff(&b), 0.5));
    }

    #[test]
    fn test_transition_probability_validation() {
        assert!(StateTransitionInfo::new(0.0, 1.0).is_err());
        assert!(StateTransitionInfo::new(-0.2, 1.0).is_err());
        assert!(StateTransitionInfo::new(1.5, 1.0).is_err());
        assert!(StateTransitionInfo::new(f64::NAN, 1.0).is_err());
        let info = StateTransitionInfo::new(0.25, -1.0).unwrap();
        assert!(approx_eq(info.probability, 0.25));
    }

    #[test]
    fn test_merged_transition_weights_utility() {
        let a = StateTransitionInfo::new(0.25, 4.0).unwrap();
        let b = StateTransitionInfo::new(0.75, 0.0).unwrap();
        let merged = a.merged(&b).unwrap();
        assert!(approx_eq(merged.probability, 1.0));
        assert!(approx_eq(merged.transition_utility, 1.0));
    }

    #[test]
    fn test_merged_transition_rejects_excess_probability() {
        let a = StateTransitionInfo::new(0.7, 1.0).unwrap();
        let err = a.merged(&a).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::InvalidProbability { value } if approx_eq(value, 1.4)
        ));
    }

    #[test]
    fn test_fresh_records_start_with_one_visit() {
        assert_eq!(StateInfo::new(BoundedValue::zero()).visit_count, 1);
        assert_eq!(ActionInfo::default().visit_count, 1);
        assert!(!ActionInfo::default().complete);
    }
}
