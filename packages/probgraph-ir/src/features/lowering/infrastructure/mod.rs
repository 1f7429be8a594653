//! Lowering infrastructure: the CFG builder

pub mod builder;

pub use builder::{build_program, CfgBuilder};
