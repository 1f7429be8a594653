//! Language-agnostic expression IR
//!
//! Frontend adapters lower their syntax into this tree. The analyses consume
//! it through four capabilities: free-variable enumeration, call finding, and
//! evaluation into either the interval or the symbolic domain under a
//! valuation of the free variables. Expressions are assumed pure; a frontend
//! that cannot guarantee purity must widen dependencies itself.

use crate::errors::Result;
use crate::shared::models::{Interval, Span, SymExpr, Value};
use crate::shared::utils::ExprId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Operator names with builtin interval semantics. A `Call` to one of these
/// is an operator application, not a reference to user code.
pub const BUILTIN_OPS: &[&str] = &[
    "+", "-", "*", "/", "^", "&", "|", "!", "==", "!=", ">", ">=", "<", "<=", "ife", "sqrt",
    "exp", "log", "abs", "square", "minimum", "maximum", "min", "max", "ifelse", "switch",
    "invlogit", "eq", "clip", "erf", "ones", "prod", "eye", "outer", "flatten", "stack",
    "reshape", "repeat", "constant",
];

pub fn is_builtin_op(name: &str) -> bool {
    BUILTIN_OPS.contains(&name)
}

/// Variable reference: name plus lexical scope, optionally indexed (`x[i]`).
///
/// Two variables are equal iff they refer to the same storage: same name and
/// scope, and statically equal indices. Index comparison is conservative —
/// only structurally identical index expressions compare equal, so a write
/// through a loop variable aliases arbitrary reads of the same base.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub scope: u32,
    pub index: Option<Box<Expr>>,
}

impl Variable {
    pub fn new(name: impl Into<String>, scope: u32) -> Self {
        Self {
            name: name.into(),
            scope,
            index: None,
        }
    }

    /// Toplevel-scope variable (scope 0); also how function names resolve
    pub fn global(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    pub fn indexed(name: impl Into<String>, scope: u32, index: Expr) -> Self {
        Self {
            name: name.into(),
            scope,
            index: Some(Box::new(index)),
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Same base storage, ignoring any index
    pub fn same_base(&self, other: &Variable) -> bool {
        self.name == other.name && self.scope == other.scope
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        if !self.same_base(other) {
            return false;
        }
        match (&self.index, &other.index) {
            (None, None) => true,
            (Some(a), Some(b)) => Expr::static_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // index intentionally excluded: equal variables must hash equal and
        // index comparison is structural
        self.name.hash(state);
        self.scope.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.index {
            Some(ix) => write!(f, "{}[{}]", self.name, ix),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Left-hand side of an assignment (`x = ...` or `x[i] = ...`)
#[derive(Debug, Clone)]
pub struct AssignTarget {
    pub name: String,
    pub scope: u32,
    pub index: Option<Box<Expr>>,
    pub span: Span,
}

impl AssignTarget {
    pub fn simple(name: impl Into<String>, scope: u32, span: Span) -> Self {
        Self {
            name: name.into(),
            scope,
            index: None,
            span,
        }
    }

    pub fn indexed(name: impl Into<String>, scope: u32, index: Expr, span: Span) -> Self {
        Self {
            name: name.into(),
            scope,
            index: Some(Box::new(index)),
            span,
        }
    }

    /// True when this target writes the variable's base storage
    pub fn is_equal(&self, variable: &Variable) -> bool {
        self.name == variable.name && self.scope == variable.scope
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn index_expr(&self) -> Option<&Expr> {
        self.index.as_deref()
    }

    /// Static index equality against an indexed variable; false when unsure
    pub fn index_is_equal(&self, variable: &Variable) -> bool {
        match (&self.index, &variable.index) {
            (Some(a), Some(b)) => Expr::static_eq(a, b),
            _ => false,
        }
    }

    /// The variable this target writes
    pub fn as_variable(&self) -> Variable {
        Variable {
            name: self.name.clone(),
            scope: self.scope,
            index: self.index.clone(),
        }
    }
}

impl fmt::Display for AssignTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.index {
            Some(ix) => write!(f, "{}[{}]", self.name, ix),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Distribution reference: catalog name plus parameter-name to expression map.
///
/// Names the catalog does not recognize carry an `Unknown-` prefix, applied
/// by the frontend.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub name: String,
    pub args: BTreeMap<String, Expr>,
}

impl Distribution {
    pub fn new(name: impl Into<String>, args: BTreeMap<String, Expr>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name.starts_with("Unknown")
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(|(name, arg)| format!("{}: {}", name, arg))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.name, args)
    }
}

/// Expression node kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    Var(Variable),
    Const(Value),
    /// Operator application by canonical name (`+`, `<=`, `sqrt`, ...)
    Op { name: String, args: Vec<Expr> },
    /// Call to a named function; user-defined when the callee matches a
    /// function definition in the IR, otherwise an opaque builtin
    Call { callee: String, args: Vec<Expr> },
    List(Vec<Expr>),
}

/// Expression with allocation id and source range
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            id: ExprId::fresh(),
            kind,
            span,
        }
    }

    pub fn var(name: impl Into<String>, scope: u32, span: Span) -> Self {
        Self::new(ExprKind::Var(Variable::new(name, scope)), span)
    }

    pub fn indexed_var(name: impl Into<String>, scope: u32, index: Expr, span: Span) -> Self {
        Self::new(ExprKind::Var(Variable::indexed(name, scope, index)), span)
    }

    pub fn constant(value: impl Into<Value>, span: Span) -> Self {
        Self::new(ExprKind::Const(value.into()), span)
    }

    pub fn op(name: impl Into<String>, args: Vec<Expr>, span: Span) -> Self {
        Self::new(
            ExprKind::Op {
                name: name.into(),
                args,
            },
            span,
        )
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>, span: Span) -> Self {
        Self::new(
            ExprKind::Call {
                callee: callee.into(),
                args,
            },
            span,
        )
    }

    pub fn list(items: Vec<Expr>, span: Span) -> Self {
        Self::new(ExprKind::List(items), span)
    }

    /// Structural equality, ignoring ids and spans. This is the "statically
    /// equal" notion used for indexed-target kills.
    pub fn static_eq(a: &Expr, b: &Expr) -> bool {
        match (&a.kind, &b.kind) {
            (ExprKind::Var(va), ExprKind::Var(vb)) => va == vb,
            (ExprKind::Const(ca), ExprKind::Const(cb)) => ca == cb,
            (
                ExprKind::Op { name: na, args: aa },
                ExprKind::Op { name: nb, args: ab },
            ) => na == nb && aa.len() == ab.len() && aa.iter().zip(ab).all(|(x, y)| Self::static_eq(x, y)),
            (
                ExprKind::Call { callee: na, args: aa },
                ExprKind::Call { callee: nb, args: ab },
            ) => na == nb && aa.len() == ab.len() && aa.iter().zip(ab).all(|(x, y)| Self::static_eq(x, y)),
            (ExprKind::List(aa), ExprKind::List(ab)) => {
                aa.len() == ab.len() && aa.iter().zip(ab).all(|(x, y)| Self::static_eq(x, y))
            }
            _ => false,
        }
    }

    /// Free variables in first-occurrence order, deduplicated.
    ///
    /// Callees of non-builtin calls count as (global) free variables — that
    /// is how uses of user-defined functions surface to the dependency
    /// engine.
    pub fn free_variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_free_variables(&mut out);
        out
    }

    fn collect_free_variables(&self, out: &mut Vec<Variable>) {
        match &self.kind {
            ExprKind::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
                if let Some(index) = &v.index {
                    index.collect_free_variables(out);
                }
            }
            ExprKind::Const(_) => {}
            ExprKind::Op { args, .. } | ExprKind::List(args) => {
                for arg in args {
                    arg.collect_free_variables(out);
                }
            }
            ExprKind::Call { callee, args } => {
                if !is_builtin_op(callee) {
                    let v = Variable::global(callee.clone());
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
                for arg in args {
                    arg.collect_free_variables(out);
                }
            }
        }
    }

    /// All calls to the named function, outermost first
    pub fn function_calls(&self, function_name: &str) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_function_calls(function_name, &mut out);
        out
    }

    fn collect_function_calls<'a>(&'a self, function_name: &str, out: &mut Vec<&'a Expr>) {
        match &self.kind {
            ExprKind::Call { callee, args } => {
                if callee == function_name {
                    out.push(self);
                }
                for arg in args {
                    arg.collect_function_calls(function_name, out);
                }
            }
            ExprKind::Op { args, .. } | ExprKind::List(args) => {
                for arg in args {
                    arg.collect_function_calls(function_name, out);
                }
            }
            ExprKind::Var(v) => {
                if let Some(index) = &v.index {
                    index.collect_function_calls(function_name, out);
                }
            }
            ExprKind::Const(_) => {}
        }
    }

    /// Positional argument of a call expression
    pub fn call_arg(&self, index: usize) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Call { args, .. } => args.get(index),
            _ => None,
        }
    }

    /// Evaluate into the interval domain under a valuation of free variables.
    ///
    /// Unknown operators widen to `[-inf, inf]`; comparison and boolean
    /// operators evaluate to the indicator range `[0, 1]`.
    pub fn estimate_value_range(&self, mask: &HashMap<Variable, Interval>) -> Result<Interval> {
        match &self.kind {
            ExprKind::Var(v) => Ok(mask.get(v).copied().unwrap_or_else(Interval::top)),
            ExprKind::Const(value) => Ok(Interval::singleton(value.as_f64())),
            ExprKind::Op { name, args } => Self::apply_interval_op(name, args, mask),
            ExprKind::Call { callee, args } => {
                if is_builtin_op(callee) {
                    return Self::apply_interval_op(callee, args, mask);
                }
                // user-defined function results are installed in the mask by
                // the evaluation driver; anything else is unknown
                Ok(mask
                    .get(&Variable::global(callee.clone()))
                    .copied()
                    .unwrap_or_else(Interval::top))
            }
            ExprKind::List(items) => {
                let intervals = items
                    .iter()
                    .map(|item| item.estimate_value_range(mask))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Interval::union_all(&intervals))
            }
        }
    }

    fn apply_interval_op(
        name: &str,
        args: &[Expr],
        mask: &HashMap<Variable, Interval>,
    ) -> Result<Interval> {
        let values = args
            .iter()
            .map(|arg| arg.estimate_value_range(mask))
            .collect::<Result<Vec<_>>>()?;
        Ok(match (name, values.as_slice()) {
            ("+", [x, y]) => x.add(y),
            ("-", [x]) => x.neg(),
            ("-", [x, y]) => x.sub(y),
            ("*", [x, y]) | ("outer", [x, y]) => x.mul(y),
            ("/", [x, y]) => x.div(y)?,
            ("^", [x, y]) => x.pow(y),
            ("square", [x]) => x.square(),
            ("sqrt", [x]) => x.sqrt(),
            ("exp", [x]) => x.exp(),
            ("log", [x]) => x.log(),
            ("abs", [x]) => x.abs(),
            ("minimum" | "min", _) => Interval::minimum(&values),
            ("maximum" | "max", _) => Interval::maximum(&values),
            ("ifelse" | "switch" | "ife", [test, x, y]) => Interval::ifelse(test, x, y),
            ("clip", [x, a, b]) => x.clip(a, b),
            ("prod", [x]) => x.prod(),
            ("flatten" | "stack" | "reshape" | "repeat" | "constant", [x, ..]) => *x,
            ("invlogit", _) => Interval::unit(),
            ("erf", _) => Interval::new(-1.0, 1.0),
            ("ones", _) => Interval::singleton(1.0),
            ("eye", _) => Interval::unit(),
            // comparisons and boolean connectives as indicator ranges
            ("eq" | "==" | "!=" | ">" | ">=" | "<" | "<=" | "&" | "|" | "!", _) => Interval::unit(),
            _ => Interval::top(),
        })
    }

    /// Evaluate into the symbolic domain under a valuation of free variables.
    ///
    /// Unmasked variables become fresh symbols named after their base.
    pub fn symbolic(&self, mask: &HashMap<Variable, SymExpr>) -> Result<SymExpr> {
        match &self.kind {
            ExprKind::Var(v) => Ok(mask
                .get(v)
                .cloned()
                .unwrap_or_else(|| SymExpr::symbol(v.name.clone()))),
            ExprKind::Const(value) => Ok(SymExpr::Constant(*value)),
            ExprKind::Op { name, args } => Self::apply_symbolic_op(name, args, mask),
            ExprKind::Call { callee, args } => {
                if is_builtin_op(callee) {
                    return Self::apply_symbolic_op(callee, args, mask);
                }
                let sym_args = args
                    .iter()
                    .map(|arg| arg.symbolic(mask))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SymExpr::op(callee.clone(), sym_args))
            }
            ExprKind::List(items) => {
                let sym_items = items
                    .iter()
                    .map(|item| item.symbolic(mask))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SymExpr::op("List", sym_items))
            }
        }
    }

    fn apply_symbolic_op(
        name: &str,
        args: &[Expr],
        mask: &HashMap<Variable, SymExpr>,
    ) -> Result<SymExpr> {
        let mut sym_args = args
            .iter()
            .map(|arg| arg.symbolic(mask))
            .collect::<Result<Vec<_>>>()?;
        let op = match name {
            "ifelse" | "switch" => "ife",
            "eq" => "==",
            other => other,
        };
        if op == "!" && sym_args.len() == 1 {
            return Ok(SymExpr::not(sym_args.swap_remove(0)));
        }
        Ok(SymExpr::op(op, sym_args))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Var(v) => write!(f, "{}", v),
            ExprKind::Const(value) => write!(f, "{}", value),
            ExprKind::Op { name, args } => {
                let rendered = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({})", name, rendered)
            }
            ExprKind::Call { callee, args } => {
                let rendered = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({})", callee, rendered)
            }
            ExprKind::List(items) => {
                let rendered = items
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{}]", rendered)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::zero()
    }

    #[test]
    fn test_free_variables_dedup() {
        // x + x * y
        let e = Expr::op(
            "+",
            vec![
                Expr::var("x", 0, sp()),
                Expr::op("*", vec![Expr::var("x", 0, sp()), Expr::var("y", 0, sp())], sp()),
            ],
            sp(),
        );
        let names: Vec<String> = e.free_variables().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_free_variables_include_user_callee_but_not_builtin() {
        let e = Expr::op(
            "+",
            vec![
                Expr::call("sqrt", vec![Expr::var("x", 0, sp())], sp()),
                Expr::call("my_func", vec![Expr::var("y", 0, sp())], sp()),
            ],
            sp(),
        );
        let names: Vec<String> = e.free_variables().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["x", "my_func", "y"]);
    }

    #[test]
    fn test_indexed_variable_free_vars() {
        // x[i]
        let e = Expr::indexed_var("x", 0, Expr::var("i", 0, sp()), sp());
        let names: Vec<String> = e.free_variables().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["x", "i"]);
    }

    #[test]
    fn test_function_calls_nested() {
        let inner = Expr::call("f", vec![Expr::var("a", 0, sp())], sp());
        let e = Expr::call("f", vec![inner], sp());
        assert_eq!(e.function_calls("f").len(), 2);
        assert_eq!(e.function_calls("g").len(), 0);
    }

    #[test]
    fn test_static_eq_ignores_span_and_id() {
        let a = Expr::constant(Value::Int(2), Span::new(1, 2));
        let b = Expr::constant(Value::Int(2), Span::new(7, 9));
        assert!(Expr::static_eq(&a, &b));
        let c = Expr::constant(Value::Int(3), sp());
        assert!(!Expr::static_eq(&a, &c));
    }

    #[test]
    fn test_interval_eval_arithmetic() {
        // 1 / (1 + exp(z)) with z in [-inf, inf]
        let z = Expr::var("z", 0, sp());
        let e = Expr::op(
            "/",
            vec![
                Expr::constant(1.0, sp()),
                Expr::op(
                    "+",
                    vec![Expr::constant(1.0, sp()), Expr::op("exp", vec![z], sp())],
                    sp(),
                ),
            ],
            sp(),
        );
        let mut mask = HashMap::new();
        mask.insert(Variable::new("z", 0), Interval::top());
        let range = e.estimate_value_range(&mask).unwrap();
        // exp(z) in [0, inf], 1 + exp(z) in [1, inf], quotient in [0, 1]
        assert_eq!(range, Interval::unit());
    }

    #[test]
    fn test_interval_eval_unknown_op_widens() {
        let e = Expr::op("mystery", vec![Expr::constant(1.0, sp())], sp());
        assert_eq!(e.estimate_value_range(&HashMap::new()).unwrap(), Interval::top());
    }

    #[test]
    fn test_interval_eval_unmasked_var_is_top() {
        let e = Expr::var("x", 0, sp());
        assert_eq!(e.estimate_value_range(&HashMap::new()).unwrap(), Interval::top());
    }

    #[test]
    fn test_symbolic_eval_uses_mask() {
        let e = Expr::op(
            "==",
            vec![Expr::var("b", 0, sp()), Expr::constant(Value::Int(1), sp())],
            sp(),
        );
        let mut mask = HashMap::new();
        mask.insert(Variable::new("b", 0), SymExpr::typed_symbol("b", crate::shared::models::SymType::Int));
        let sym = e.symbolic(&mask).unwrap();
        assert_eq!(sym.canonical(), "==(Int(b),Constant(1))");
    }

    #[test]
    fn test_symbolic_not_is_smart() {
        let e = Expr::op(
            "!",
            vec![Expr::op("!", vec![Expr::var("x", 0, sp())], sp())],
            sp(),
        );
        let sym = e.symbolic(&HashMap::new()).unwrap();
        assert_eq!(sym, SymExpr::symbol("x"));
    }

    #[test]
    fn test_assign_target_kills() {
        let x = Variable::new("x", 0);
        let target = AssignTarget::simple("x", 0, sp());
        assert!(target.is_equal(&x));
        assert!(!target.is_indexed());

        let indexed =
            AssignTarget::indexed("x", 0, Expr::constant(Value::Int(2), sp()), sp());
        assert!(indexed.is_equal(&x));
        assert!(indexed.is_indexed());

        let x2 = Variable::indexed("x", 0, Expr::constant(Value::Int(2), sp()));
        let x3 = Variable::indexed("x", 0, Expr::constant(Value::Int(3), sp()));
        assert!(indexed.index_is_equal(&x2));
        assert!(!indexed.index_is_equal(&x3));

        // a literal index never matches a symbolic one
        let xi = Variable::indexed("x", 0, Expr::var("i", 0, sp()));
        assert!(!indexed.index_is_equal(&xi));
    }

    #[test]
    fn test_variable_equality_and_scope() {
        assert_eq!(Variable::new("x", 0), Variable::new("x", 0));
        assert_ne!(Variable::new("x", 0), Variable::new("x", 1));
        assert_ne!(Variable::new("x", 0), Variable::new("y", 0));
    }
}
