//! Set constraints on distribution parameters and supports
//!
//! Interval-shaped constraints project onto the interval domain for range
//! checking; structural constraints (simplex, positive-definite, ...) project
//! to generous over-approximations or not at all.

use crate::shared::models::Interval;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Constraint endpoint: a concrete value or a placeholder resolved from a
/// parameter's interval estimate at use time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bound {
    Value(f64),
    /// Parameter-dependent bound, e.g. the `a` in `Uniform(a, b)`
    Param(String),
}

impl Bound {
    pub fn value(&self) -> Option<f64> {
        match self {
            Bound::Value(v) => Some(*v),
            Bound::Param(_) => None,
        }
    }

    pub fn param(&self) -> Option<&str> {
        match self {
            Bound::Param(name) => Some(name),
            Bound::Value(_) => None,
        }
    }
}

impl From<f64> for Bound {
    fn from(v: f64) -> Self {
        Bound::Value(v)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Value(v) => write!(f, "{}", v),
            Bound::Param(name) => write!(f, "ParamDependentBound({})", name),
        }
    }
}

/// Set constraint of a parameter or support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// `(low, inf)`
    GreaterThan(Bound),
    /// `[low, inf)`
    GreaterEqThan(Bound),
    /// All of the reals
    Real,
    /// `[low, high]`
    RealInterval { low: Bound, high: Bound },
    /// All integers
    Integer,
    /// `{low, low+1, ...}`
    DiscreteGreaterEqThan(Bound),
    /// `{low, ..., high}`
    DiscreteInterval { low: Bound, high: Bound },
    Vector,
    Matrix,
    PositiveDefinite,
    Simplex,
    /// Vector with strictly increasing coordinates
    Ordered,
}

impl Constraint {
    pub fn real_interval(low: impl Into<Bound>, high: impl Into<Bound>) -> Self {
        Constraint::RealInterval {
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn discrete_interval(low: impl Into<Bound>, high: impl Into<Bound>) -> Self {
        Constraint::DiscreteInterval {
            low: low.into(),
            high: high.into(),
        }
    }

    /// Whether the constraint is interval-shaped (checkable against an
    /// interval estimate)
    pub fn is_interval_constraint(&self) -> bool {
        !matches!(
            self,
            Constraint::Vector
                | Constraint::Matrix
                | Constraint::PositiveDefinite
                | Constraint::Simplex
                | Constraint::Ordered
        )
    }

    /// Lower bound of an interval-shaped constraint
    pub fn low(&self) -> Option<Bound> {
        match self {
            Constraint::GreaterThan(low)
            | Constraint::GreaterEqThan(low)
            | Constraint::DiscreteGreaterEqThan(low) => Some(low.clone()),
            Constraint::RealInterval { low, .. } | Constraint::DiscreteInterval { low, .. } => {
                Some(low.clone())
            }
            Constraint::Real | Constraint::Integer => Some(Bound::Value(f64::NEG_INFINITY)),
            _ => None,
        }
    }

    /// Upper bound of an interval-shaped constraint
    pub fn high(&self) -> Option<Bound> {
        match self {
            Constraint::GreaterThan(_)
            | Constraint::GreaterEqThan(_)
            | Constraint::DiscreteGreaterEqThan(_) => Some(Bound::Value(f64::INFINITY)),
            Constraint::RealInterval { high, .. } | Constraint::DiscreteInterval { high, .. } => {
                Some(high.clone())
            }
            Constraint::Real | Constraint::Integer => Some(Bound::Value(f64::INFINITY)),
            _ => None,
        }
    }

    /// Replace a parameter-dependent lower bound with its resolved value
    pub fn set_low(&mut self, value: f64) {
        match self {
            Constraint::GreaterThan(low)
            | Constraint::GreaterEqThan(low)
            | Constraint::DiscreteGreaterEqThan(low) => *low = Bound::Value(value),
            Constraint::RealInterval { low, .. } | Constraint::DiscreteInterval { low, .. } => {
                *low = Bound::Value(value)
            }
            _ => {}
        }
    }

    /// Replace a parameter-dependent upper bound with its resolved value
    pub fn set_high(&mut self, value: f64) {
        match self {
            Constraint::RealInterval { high, .. } | Constraint::DiscreteInterval { high, .. } => {
                *high = Bound::Value(value)
            }
            _ => {}
        }
    }

    /// Project onto the interval domain.
    ///
    /// Element-wise constraints project to `[-inf, inf]`; a positive-definite
    /// scalar to `[0, inf]`; simplex/ordered do not project. Unresolved
    /// parameter-dependent bounds do not project either.
    pub fn to_interval(&self) -> Option<Interval> {
        match self {
            Constraint::GreaterThan(low)
            | Constraint::GreaterEqThan(low)
            | Constraint::DiscreteGreaterEqThan(low) => {
                Some(Interval::new(low.value()?, f64::INFINITY))
            }
            Constraint::Real | Constraint::Integer => Some(Interval::top()),
            Constraint::RealInterval { low, high } | Constraint::DiscreteInterval { low, high } => {
                Some(Interval::new(low.value()?, high.value()?))
            }
            // the constraint holds for each coordinate
            Constraint::Vector | Constraint::Matrix => Some(Interval::top()),
            // a covariance matrix is sometimes given by a scalar sigma with
            // Sigma = sigma * I
            Constraint::PositiveDefinite => Some(Interval::positive()),
            Constraint::Simplex | Constraint::Ordered => None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::GreaterThan(low) => write!(f, "> {}", low),
            Constraint::GreaterEqThan(low) => write!(f, ">= {}", low),
            Constraint::Real => write!(f, "Real"),
            Constraint::RealInterval { low, high } => write!(f, "[{}, {}]", low, high),
            Constraint::Integer => write!(f, "Integer"),
            Constraint::DiscreteGreaterEqThan(low) => write!(f, "{}, ...", low),
            Constraint::DiscreteInterval { low, high } => write!(f, "[{}, ..., {}]", low, high),
            Constraint::Vector => write!(f, "Vector"),
            Constraint::Matrix => write!(f, "Matrix"),
            Constraint::PositiveDefinite => write!(f, "PositiveDefinite"),
            Constraint::Simplex => write!(f, "Simplex"),
            Constraint::Ordered => write!(f, "Ordered"),
        }
    }
}
