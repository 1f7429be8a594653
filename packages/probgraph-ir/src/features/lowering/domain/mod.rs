//! Lowering domain: the statement tree frontends produce

pub mod ast;

pub use ast::{FunctionDef, Param, Program, Stmt};
