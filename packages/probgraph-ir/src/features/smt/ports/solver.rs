//! SMT solver port
//!
//! The core constructs formulas in the symbolic algebra and interprets
//! sat/unsat/unknown results; the solver itself is an external collaborator
//! behind this trait. A bridge translates the canonical operators to its
//! builtins and hands models back as opaque name-to-value maps.

use crate::errors::Result;
use crate::shared::models::SymExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The operator vocabulary a bridge must translate
pub const CANONICAL_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "^", "&", "|", "!", "==", "!=", ">", ">=", "<", "<=", "ife",
];

/// Satisfying assignment: symbol name to rendered value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SmtModel {
    pub assignments: BTreeMap<String, String>,
}

impl SmtModel {
    pub fn new(assignments: BTreeMap<String, String>) -> Self {
        Self { assignments }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            assignments: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.assignments.get(symbol).map(|s| s.as_str())
    }
}

impl fmt::Display for SmtModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .assignments
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}]", rendered)
    }
}

/// Result of one solver query
#[derive(Debug, Clone, PartialEq)]
pub enum SolveResult {
    Sat(SmtModel),
    Unsat,
    /// Timeout or incomplete theory; treated as "could not prove"
    Unknown,
}

/// External solver bridge
pub trait SmtSolver {
    fn solve(&self, formula: &SymExpr) -> Result<SolveResult>;
}
