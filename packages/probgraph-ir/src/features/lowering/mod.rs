//! Lowering: from the frontend statement tree to verified CFGs

pub mod domain;
pub mod infrastructure;

pub use domain::{FunctionDef, Param, Program, Stmt};
pub use infrastructure::{build_program, CfgBuilder};
