/*
 * probgraph-ir - Static analyzer core for probabilistic programs
 *
 * Feature-first architecture:
 * - shared/   : common models (Span, Interval, SymExpr, Expr)
 * - features/ : vertical slices (cfg -> lowering -> program -> analyses)
 *
 * A frontend adapter lowers its surface syntax into the statement tree of
 * `features::lowering`; the builder produces per-function CFGs; the four
 * analyses (constraint verification, absolute continuity, funnel detection,
 * random control flow) answer queries over the resulting IR. The SMT solver
 * is an external collaborator behind `features::smt::SmtSolver`.
 */

/// Error types
pub mod errors;

/// Shared models and utilities
pub mod shared;

/// Feature modules
pub mod features;

#[cfg(test)]
pub(crate) mod testkit;

pub use errors::{AnalyzerError, Result};

// Re-exports for the public API
pub use features::absolute_continuity::{
    check_ac, check_ac_guide, validate_guide, AcOutcome, AcWarning,
    GlobalAbsoluteContinuityViolation,
};
pub use features::cfg::{verify_cfg, Cfg, CfgArena, CfgNode, NodeId, NodeKind};
pub use features::constraint_verification::{
    verify_constraints, ConstraintVerificationResult, ConstraintViolation,
};
pub use features::distributions::{
    distribution_properties, parse_distribution, Bound, Constraint, DistributionProperties,
    DistributionType,
};
pub use features::funnel_detection::{detect_funnels, FunnelWarning};
pub use features::lowering::{build_program, CfgBuilder, FunctionDef, Param, Program, Stmt};
pub use features::model_graph::{model_graph, ModelGraph};
pub use features::program::{
    branch_parents, control_deps_for_node, data_deps_for_expr, estimate_value_range,
    path_condition, reaching_definitions, symbolic_expression, FunctionCfg, ProgramIr,
};
pub use features::random_control_flow::{
    check_hmc_assumptions, check_random_control_flow, random_control_dependencies,
    DiscreteSampleWarning, HmcWarning, RandomControlDependentWarning,
};
pub use features::smt::{ScriptedSolver, SmtModel, SmtSolver, SolveResult};
pub use shared::models::{
    AssignTarget, Distribution, Expr, ExprKind, Interval, Span, SymExpr, SymType, Value, Variable,
};
