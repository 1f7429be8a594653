//! Program IR domain models

pub mod ir;

pub use ir::{FunctionCfg, ProgramIr};
