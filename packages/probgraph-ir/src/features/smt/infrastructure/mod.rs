//! SMT infrastructure

pub mod scripted;

pub use scripted::ScriptedSolver;
