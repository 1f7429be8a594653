//! Interval algebra over the extended reals
//!
//! The value domain for range estimation. Every operation is a sound
//! over-approximation: the concrete result of an expression always lies
//! inside the interval computed for it. Nonsensical inputs widen to
//! `[-inf, inf]` silently; the only hard failure is division by an interval
//! that is exactly zero.

use crate::errors::{AnalyzerError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Closed interval `[low, high]` over the extended reals.
///
/// `low == high` encodes a singleton. Endpoints use f64 infinities for the
/// unbounded cases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Singleton interval `[v, v]`
    pub fn singleton(v: f64) -> Self {
        Self::new(v, v)
    }

    /// Unbounded interval `[-inf, inf]` (the domain's top element)
    pub fn top() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Non-negative half line `[0, inf]`
    pub fn positive() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    /// The unit interval `[0, 1]`
    pub fn unit() -> Self {
        Self::new(0.0, 1.0)
    }

    pub fn is_singleton(&self) -> bool {
        self.low == self.high
    }

    pub fn contains(&self, v: f64) -> bool {
        self.low <= v && v <= self.high
    }

    pub fn is_subset_of(&self, other: &Interval) -> bool {
        other.low <= self.low && self.high <= other.high
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval::new(self.low + other.low, self.high + other.high)
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        Interval::new(self.low - other.high, self.high - other.low)
    }

    pub fn neg(&self) -> Interval {
        Interval::new(-self.high, -self.low)
    }

    /// Minimum and maximum over the four endpoint products, ignoring NaN
    /// (`0 * inf` products drop out instead of poisoning the result).
    pub fn mul(&self, other: &Interval) -> Interval {
        let products = [
            self.low * other.low,
            self.low * other.high,
            self.high * other.low,
            self.high * other.high,
        ];
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for p in products {
            if p.is_nan() {
                continue;
            }
            low = low.min(p);
            high = high.max(p);
        }
        Interval::new(low, high)
    }

    /// Divide by inverting the divisor endpoint-wise.
    ///
    /// A divisor that touches zero at one endpoint yields a half-infinite
    /// inverse; a divisor that is exactly `[0, 0]` is an error.
    pub fn div(&self, other: &Interval) -> Result<Interval> {
        if other.low == f64::NEG_INFINITY && other.high == f64::INFINITY {
            return Ok(Interval::top());
        }
        let inverse = if other.low != 0.0 && other.high != 0.0 {
            Interval::new(1.0 / other.high, 1.0 / other.low)
        } else if other.low != 0.0 {
            Interval::new(f64::NEG_INFINITY, 1.0 / other.low)
        } else if other.high != 0.0 {
            Interval::new(1.0 / other.high, f64::INFINITY)
        } else {
            return Err(AnalyzerError::DivisionByZero);
        };
        Ok(self.mul(&inverse))
    }

    /// Power with a singleton exponent; non-singleton exponents widen to top.
    ///
    /// Odd (and fractional) exponents are monotone, so endpoint powers are
    /// exact. Even exponents clamp the lower endpoint at 0 when the base
    /// straddles zero.
    pub fn pow(&self, exponent: &Interval) -> Interval {
        if !exponent.is_singleton() {
            return Interval::top();
        }
        let n = exponent.low;
        if n % 2.0 != 0.0 {
            Interval::new(self.low.powf(n), self.high.powf(n))
        } else if self.low >= 0.0 {
            Interval::new(self.low.powf(n), self.high.powf(n))
        } else {
            Interval::new(0.0, self.high.powf(n))
        }
    }

    pub fn square(&self) -> Interval {
        self.pow(&Interval::singleton(2.0))
    }

    /// Endpointwise min of lows, max of highs; over-approximates a disjoint
    /// union by the covering interval.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval::new(self.low.min(other.low), self.high.max(other.high))
    }

    /// Union fold over several intervals; `None` input folds to top.
    pub fn union_all(intervals: &[Interval]) -> Interval {
        let mut iter = intervals.iter();
        match iter.next() {
            Some(first) => iter.fold(*first, |acc, iv| acc.union(iv)),
            None => Interval::top(),
        }
    }

    pub fn minimum(intervals: &[Interval]) -> Interval {
        let low = intervals.iter().map(|iv| iv.low).fold(f64::INFINITY, f64::min);
        let high = intervals
            .iter()
            .map(|iv| iv.high)
            .fold(f64::INFINITY, f64::min);
        Interval::new(low, high)
    }

    pub fn maximum(intervals: &[Interval]) -> Interval {
        let low = intervals
            .iter()
            .map(|iv| iv.low)
            .fold(f64::NEG_INFINITY, f64::max);
        let high = intervals
            .iter()
            .map(|iv| iv.high)
            .fold(f64::NEG_INFINITY, f64::max);
        Interval::new(low, high)
    }

    pub fn sqrt(&self) -> Interval {
        Interval::new(self.low.max(0.0).sqrt(), self.high.sqrt())
    }

    pub fn exp(&self) -> Interval {
        Interval::new(self.low.exp(), self.high.exp())
    }

    /// `log` of a non-positive endpoint yields `-inf`
    pub fn log(&self) -> Interval {
        let low = if self.low > 0.0 {
            self.low.ln()
        } else {
            f64::NEG_INFINITY
        };
        let high = if self.high > 0.0 {
            self.high.ln()
        } else {
            f64::NEG_INFINITY
        };
        Interval::new(low, high)
    }

    /// Over-approximates `|x|` by min/max of the endpoint magnitudes
    pub fn abs(&self) -> Interval {
        let a = self.low.abs();
        let b = self.high.abs();
        Interval::new(a.min(b), a.max(b))
    }

    /// `ifelse`/`switch` as the union of both possible outputs
    pub fn ifelse(_test: &Interval, then: &Interval, orelse: &Interval) -> Interval {
        then.union(orelse)
    }

    pub fn clip(&self, a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.low, b.high)
    }

    /// Product over an array-valued interval: stays in `[0, 1]` when every
    /// element does, otherwise unbounded.
    pub fn prod(&self) -> Interval {
        if 0.0 <= self.low && self.high <= 1.0 {
            Interval::unit()
        } else {
            Interval::top()
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

// Wire format: endpoints as strings so that +-inf survives JSON.
#[derive(Serialize, Deserialize)]
struct IntervalWire {
    low: String,
    high: String,
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        IntervalWire {
            low: self.low.to_string(),
            high: self.high.to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = IntervalWire::deserialize(deserializer)?;
        let low: f64 = wire
            .low
            .parse()
            .map_err(|_| D::Error::custom(format!("bad interval endpoint: {}", wire.low)))?;
        let high: f64 = wire
            .high
            .parse()
            .map_err(|_| D::Error::custom(format!("bad interval endpoint: {}", wire.high)))?;
        Ok(Interval::new(low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INF: f64 = f64::INFINITY;

    #[test]
    fn test_add_sub() {
        let x = Interval::new(1.0, 2.0);
        let y = Interval::new(-3.0, 5.0);
        assert_eq!(x.add(&y), Interval::new(-2.0, 7.0));
        assert_eq!(x.sub(&y), Interval::new(-4.0, 5.0));
        assert_eq!(y.neg(), Interval::new(-5.0, 3.0));
    }

    #[test]
    fn test_mul_mixed_signs() {
        let x = Interval::new(-2.0, 3.0);
        let y = Interval::new(-1.0, 4.0);
        assert_eq!(x.mul(&y), Interval::new(-8.0, 12.0));
    }

    #[test]
    fn test_mul_ignores_nan_products() {
        // [0, 0] * [-inf, inf]: 0 * inf is NaN, the remaining products are 0
        let zero = Interval::singleton(0.0);
        let result = zero.mul(&Interval::top());
        assert_eq!(result, Interval::singleton(0.0));
    }

    #[test]
    fn test_div_nonzero_divisor() {
        let x = Interval::new(1.0, 2.0);
        let y = Interval::new(2.0, 4.0);
        assert_eq!(x.div(&y).unwrap(), Interval::new(0.25, 1.0));
    }

    #[test]
    fn test_div_divisor_touching_zero() {
        let x = Interval::singleton(1.0);
        // [0, 2]: inverse is [1/2, inf]
        let q = x.div(&Interval::new(0.0, 2.0)).unwrap();
        assert_eq!(q, Interval::new(0.5, INF));
        // [-2, 0]: inverse is [-inf, -1/2]
        let q = x.div(&Interval::new(-2.0, 0.0)).unwrap();
        assert_eq!(q, Interval::new(-INF, -0.5));
    }

    #[test]
    fn test_div_by_zero_fails() {
        let x = Interval::singleton(1.0);
        assert!(matches!(
            x.div(&Interval::singleton(0.0)),
            Err(AnalyzerError::DivisionByZero)
        ));
    }

    #[test]
    fn test_div_by_top_is_top() {
        let x = Interval::new(1.0, 2.0);
        assert_eq!(x.div(&Interval::top()).unwrap(), Interval::top());
    }

    #[test]
    fn test_pow_odd_exponent_is_monotone() {
        let x = Interval::new(-2.0, 3.0);
        assert_eq!(x.pow(&Interval::singleton(3.0)), Interval::new(-8.0, 27.0));
    }

    #[test]
    fn test_pow_even_exponent_clamps_at_zero() {
        let x = Interval::new(-2.0, 3.0);
        assert_eq!(x.pow(&Interval::singleton(2.0)), Interval::new(0.0, 9.0));
        // non-negative base keeps endpoint powers
        let y = Interval::new(1.0, 3.0);
        assert_eq!(y.pow(&Interval::singleton(2.0)), Interval::new(1.0, 9.0));
    }

    #[test]
    fn test_pow_interval_exponent_widens() {
        let x = Interval::new(1.0, 2.0);
        assert_eq!(x.pow(&Interval::new(1.0, 2.0)), Interval::top());
    }

    #[test]
    fn test_union_over_approximates_disjoint() {
        let x = Interval::new(0.0, 1.0);
        let y = Interval::new(5.0, 6.0);
        assert_eq!(x.union(&y), Interval::new(0.0, 6.0));
    }

    #[test]
    fn test_union_all_empty_is_top() {
        assert_eq!(Interval::union_all(&[]), Interval::top());
    }

    #[test]
    fn test_minimum_maximum() {
        let xs = [Interval::new(0.0, 5.0), Interval::new(-1.0, 2.0)];
        assert_eq!(Interval::minimum(&xs), Interval::new(-1.0, 2.0));
        assert_eq!(Interval::maximum(&xs), Interval::new(0.0, 5.0));
    }

    #[test]
    fn test_log_of_nonpositive_endpoint() {
        let x = Interval::new(-1.0, 1.0);
        assert_eq!(x.log(), Interval::new(-INF, 0.0));
        assert_eq!(Interval::new(-2.0, -1.0).log(), Interval::new(-INF, -INF));
    }

    #[test]
    fn test_sqrt_clamps_negative_low() {
        let x = Interval::new(-4.0, 9.0);
        assert_eq!(x.sqrt(), Interval::new(0.0, 3.0));
    }

    #[test]
    fn test_abs() {
        assert_eq!(Interval::new(-3.0, 2.0).abs(), Interval::new(2.0, 3.0));
        assert_eq!(Interval::new(1.0, 2.0).abs(), Interval::new(1.0, 2.0));
    }

    #[test]
    fn test_clip() {
        let x = Interval::new(-10.0, 10.0);
        let clipped = x.clip(&Interval::singleton(0.0), &Interval::singleton(1.0));
        assert_eq!(clipped, Interval::unit());
    }

    #[test]
    fn test_prod_inside_unit_interval() {
        assert_eq!(Interval::new(0.2, 0.9).prod(), Interval::unit());
        assert_eq!(Interval::new(-0.5, 0.9).prod(), Interval::top());
        assert_eq!(Interval::new(0.0, 1.5).prod(), Interval::top());
    }

    #[test]
    fn test_subset() {
        assert!(Interval::new(0.0, 1.0).is_subset_of(&Interval::new(0.0, 2.0)));
        assert!(!Interval::new(0.0, 1.5).is_subset_of(&Interval::unit()));
        assert!(Interval::unit().is_subset_of(&Interval::top()));
    }

    #[test]
    fn test_serde_preserves_infinities() {
        let json = serde_json::to_string(&Interval::positive()).unwrap();
        assert!(json.contains("\"inf\""));
        let back: Interval = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Interval::positive());
    }

    proptest! {
        // Soundness: for points inside the operand intervals, the concrete
        // result stays inside the computed interval.
        #[test]
        fn prop_add_sound(a in -1e6f64..1e6, b in -1e6f64..1e6, da in 0.0f64..10.0, db in 0.0f64..10.0) {
            let x = Interval::new(a, a + da);
            let y = Interval::new(b, b + db);
            let sum = x.add(&y);
            prop_assert!(sum.contains(a + b));
            prop_assert!(sum.contains((a + da) + (b + db)));
        }

        #[test]
        fn prop_mul_sound(a in -1e3f64..1e3, b in -1e3f64..1e3, da in 0.0f64..10.0, db in 0.0f64..10.0) {
            let x = Interval::new(a, a + da);
            let y = Interval::new(b, b + db);
            let prod = x.mul(&y);
            prop_assert!(prod.contains(a * b));
            prop_assert!(prod.contains((a + da) * (b + db)));
        }

        #[test]
        fn prop_union_contains_both(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let u = Interval::singleton(a).union(&Interval::singleton(b));
            prop_assert!(u.contains(a));
            prop_assert!(u.contains(b));
        }
    }
}
