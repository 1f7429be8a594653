//! Constraint-violation diagnostics

use crate::features::cfg::NodeId;
use crate::features::distributions::Constraint;
use crate::shared::models::{Interval, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A distribution parameter whose estimated range escapes its constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// The sample/factor node the distribution belongs to
    pub node: NodeId,
    /// Source range of the whole statement
    pub node_span: Span,
    /// Name of the offending parameter
    pub param_name: String,
    /// Source range of the parameter expression (editor highlight target)
    pub param_span: Span,
    /// The catalogued constraint the parameter must satisfy
    pub constraint: Constraint,
    /// The interval the analysis estimated for the parameter
    pub estimated_range: Interval,
    /// Distribution name
    pub distribution: String,
}

impl ConstraintViolation {
    pub fn diagnostic_ranges(&self) -> Vec<(u32, u32)> {
        vec![self.param_span.as_range()]
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Possible constraint violation at bytes {}: parameter {} of {} distribution has constraint {}, but values are estimated to be in {}.",
            self.node_span, self.param_name, self.distribution, self.constraint, self.estimated_range
        )
    }
}

/// Verification output: the violation list plus whether every distribution in
/// the program was fully catalogued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintVerificationResult {
    pub violations: Vec<ConstraintViolation>,
    pub analyzable: bool,
}

impl ConstraintVerificationResult {
    pub fn inapplicable() -> Self {
        Self {
            violations: Vec::new(),
            analyzable: false,
        }
    }
}
