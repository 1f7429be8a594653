//! Error types for the probgraph-ir crate
//!
//! One unified error enum across the builder, the dependency engine and the
//! analyses. Per-node failures (unknown distribution, cyclic symbolic
//! dependency) are downgraded by the analyses; construction and invariant
//! failures abort the run.

use crate::shared::models::Span;
use thiserror::Error;

/// Unified error type
#[derive(Debug, Clone, Error)]
pub enum AnalyzerError {
    /// The CFG violates a structural invariant (builder bug or corrupted IR)
    #[error("malformed CFG: {message}")]
    MalformedCfg { message: String },

    /// The frontend handed the builder a construct it does not cover
    #[error("unsupported construct at bytes {}..{}: {message}", .span.first_byte, .span.last_byte)]
    UnsupportedConstruct { message: String, span: Span },

    /// Interval division by an interval that is exactly zero
    #[error("interval division by zero")]
    DivisionByZero,

    /// Symbolic evaluation hit a self-referential definition (e.g. `x = x + 1`)
    #[error("cyclic dependency: {message}")]
    CyclicDependency { message: String },

    /// Distribution name not present in the catalog
    #[error("unknown distribution: {name}")]
    UnknownDistribution { name: String },

    /// Canonical symbolic-expression string failed to parse
    #[error("invalid symbolic expression: {message}")]
    SymbolicParse { message: String },

    /// Internal error (shouldn't happen in production)
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AnalyzerError {
    pub fn malformed_cfg(message: impl Into<String>) -> Self {
        Self::MalformedCfg {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        Self::UnsupportedConstruct {
            message: message.into(),
            span,
        }
    }

    pub fn cyclic(message: impl Into<String>) -> Self {
        Self::CyclicDependency {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AnalyzerError>;
