//! Program-level analyses primitives: dependencies, abstract evaluation,
//! path conditions

pub mod dependencies;
pub mod eval;
pub mod path_condition;

pub use dependencies::{
    branch_parents, control_deps_for_node, data_deps_for_expr, reaching_definitions,
};
pub use eval::{
    estimate_value_range, symbolic_expression, IntervalAssumptions, SymbolicAssumptions,
};
pub use path_condition::path_condition;
