//! Shared model types used across features

pub mod expr;
pub mod interval;
pub mod span;
pub mod symbolic;
pub mod value;

pub use expr::{is_builtin_op, AssignTarget, Distribution, Expr, ExprKind, Variable, BUILTIN_OPS};
pub use interval::Interval;
pub use span::Span;
pub use symbolic::{SymExpr, SymType};
pub use value::Value;
