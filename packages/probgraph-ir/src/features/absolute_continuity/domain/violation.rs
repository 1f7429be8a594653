//! Absolute-continuity diagnostics
//!
//! The global check proves or refutes `P << Q` in one query; the
//! finer-grained warnings localize a failure to a variable, a pair of sample
//! statements, or a support mismatch.

use crate::features::cfg::NodeId;
use crate::features::smt::SmtModel;
use crate::shared::models::{Interval, Span, SymExpr};
use serde::Serialize;
use std::fmt;

/// `P << Q` fails: some trace has positive density under P but zero density
/// under Q. Carries the solver's counter-example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalAbsoluteContinuityViolation {
    pub p_name: String,
    pub q_name: String,
    pub counterexample: SmtModel,
    pub span: Span,
}

impl fmt::Display for GlobalAbsoluteContinuityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GlobalAbsoluteContinuityViolation: density of {} greater than 0 does not imply density of {} greater than 0 (counterexample: {})",
            self.p_name, self.q_name, self.counterexample
        )
    }
}

/// Finer-grained absolute-continuity warnings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AcWarning {
    Global(GlobalAbsoluteContinuityViolation),
    /// Two sample statements for the same variable may execute on the same
    /// path
    OverlappingSampleStatements {
        function: String,
        variable: String,
        first: NodeId,
        first_span: Span,
        first_pc: SymExpr,
        second: NodeId,
        second_span: Span,
        second_pc: SymExpr,
    },
    /// P samples a variable Q never samples
    MissingSampleStatement {
        variable: String,
        p_name: String,
        q_name: String,
        span: Span,
    },
    /// Some path samples the variable in P but cannot in Q
    VariableViolation {
        variable: String,
        p_name: String,
        q_name: String,
        counterexample: Option<SmtModel>,
        span: Span,
    },
    /// Same-name sample statements with incomparable support shapes
    SupportTypeMismatch {
        variable: String,
        p_span: Span,
        q_span: Span,
    },
    /// P's support interval escapes Q's
    SupportIntervalMismatch {
        variable: String,
        p_span: Span,
        q_span: Span,
        p_support: Interval,
        q_support: Interval,
    },
}

impl AcWarning {
    pub fn diagnostic_ranges(&self) -> Vec<(u32, u32)> {
        match self {
            AcWarning::Global(violation) => vec![violation.span.as_range()],
            AcWarning::OverlappingSampleStatements {
                first_span,
                second_span,
                ..
            } => vec![first_span.as_range(), second_span.as_range()],
            AcWarning::MissingSampleStatement { span, .. }
            | AcWarning::VariableViolation { span, .. } => vec![span.as_range()],
            AcWarning::SupportTypeMismatch { p_span, q_span, .. }
            | AcWarning::SupportIntervalMismatch { p_span, q_span, .. } => {
                vec![p_span.as_range(), q_span.as_range()]
            }
        }
    }
}

impl fmt::Display for AcWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcWarning::Global(violation) => violation.fmt(f),
            AcWarning::OverlappingSampleStatements {
                function,
                variable,
                first_pc,
                second_pc,
                ..
            } => write!(
                f,
                "OverlappingSampleStatements in {} for {}: paths {} and {} may be executed at the same time",
                function, variable, first_pc, second_pc
            ),
            AcWarning::MissingSampleStatement {
                variable,
                p_name,
                q_name,
                ..
            } => write!(
                f,
                "AbsoluteContinuityViolation: sampling {} in {} does not imply sampling in {} (no sample statement in {})",
                variable, p_name, q_name, q_name
            ),
            AcWarning::VariableViolation {
                variable,
                p_name,
                q_name,
                counterexample,
                ..
            } => match counterexample {
                Some(model) => write!(
                    f,
                    "AbsoluteContinuityViolation: sampling {} in {} does not imply sampling in {} (counterexample: {})",
                    variable, p_name, q_name, model
                ),
                None => write!(
                    f,
                    "AbsoluteContinuityViolation: sampling {} in {} does not imply sampling in {}",
                    variable, p_name, q_name
                ),
            },
            AcWarning::SupportTypeMismatch { variable, .. } => write!(
                f,
                "SupportTypeMismatch for {}: support types are not equal (or could not be inferred)",
                variable
            ),
            AcWarning::SupportIntervalMismatch {
                variable,
                p_support,
                q_support,
                ..
            } => write!(
                f,
                "SupportIntervalMismatch for {}: support {} is not a subset of {}",
                variable, p_support, q_support
            ),
        }
    }
}
