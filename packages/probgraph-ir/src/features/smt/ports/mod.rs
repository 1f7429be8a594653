//! SMT ports

pub mod solver;

pub use solver::{SmtModel, SmtSolver, SolveResult, CANONICAL_OPERATORS};
