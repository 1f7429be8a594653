//! SMT bridge: formula port and solver stubs

pub mod infrastructure;
pub mod ports;

pub use infrastructure::ScriptedSolver;
pub use ports::{SmtModel, SmtSolver, SolveResult, CANONICAL_OPERATORS};
