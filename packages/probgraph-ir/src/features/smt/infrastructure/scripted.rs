//! Deterministic solver stub
//!
//! Answers queries from a scripted list of results, recording every formula
//! it was asked. Used by the test suite and by consumers running without an
//! external solver (it degrades every unscripted query to `Unknown`, which
//! the analyses treat as "could not prove").

use crate::errors::Result;
use crate::features::smt::ports::{SmtSolver, SolveResult};
use crate::shared::models::SymExpr;
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ScriptedSolver {
    results: RefCell<VecDeque<SolveResult>>,
    queries: RefCell<Vec<String>>,
}

impl ScriptedSolver {
    /// Solver that answers `Unknown` to everything
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Solver that answers the scripted results in order, then `Unknown`
    pub fn with_results(results: Vec<SolveResult>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            queries: RefCell::new(Vec::new()),
        }
    }

    /// Canonical forms of every formula solved so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl SmtSolver for ScriptedSolver {
    fn solve(&self, formula: &SymExpr) -> Result<SolveResult> {
        self.queries.borrow_mut().push(formula.canonical());
        Ok(self
            .results
            .borrow_mut()
            .pop_front()
            .unwrap_or(SolveResult::Unknown))
    }
}
