//! The IR bundle and the engines that answer queries over it

pub mod application;
pub mod domain;

pub use application::{
    branch_parents, control_deps_for_node, data_deps_for_expr, estimate_value_range,
    path_condition, reaching_definitions, symbolic_expression, IntervalAssumptions,
    SymbolicAssumptions,
};
pub use domain::{FunctionCfg, ProgramIr};
