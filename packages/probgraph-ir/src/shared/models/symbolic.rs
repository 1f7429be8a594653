//! Symbolic expression algebra
//!
//! A three-case algebraic tree (symbol, constant, operation) with structural
//! equality, a smart negation that cancels double `!`, and a canonical text
//! form that round-trips through the parser. The canonical operator set
//! consumed by SMT bridges is `+ - * / ^ & | ! == != > >= < <= ife`.

use crate::shared::models::Value;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::errors::{AnalyzerError, Result};

/// Domain tag of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymType {
    Real,
    Int,
    Bool,
}

impl SymType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymType::Real => "Real",
            SymType::Int => "Int",
            SymType::Bool => "Bool",
        }
    }
}

/// Symbolic expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum SymExpr {
    Symbol { name: String, ty: SymType },
    Constant(Value),
    Operation { op: String, args: Vec<SymExpr> },
}

impl SymExpr {
    /// Real-typed symbol (the default domain)
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::typed_symbol(name, SymType::Real)
    }

    pub fn typed_symbol(name: impl Into<String>, ty: SymType) -> Self {
        SymExpr::Symbol {
            name: name.into(),
            ty,
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        SymExpr::Constant(value.into())
    }

    /// Absent values are not modeled and coerce to `0`
    pub fn constant_or_zero(value: Option<Value>) -> Self {
        SymExpr::Constant(value.unwrap_or(Value::Int(0)))
    }

    pub fn truth() -> Self {
        SymExpr::Constant(Value::Bool(true))
    }

    pub fn op(op: impl Into<String>, args: Vec<SymExpr>) -> Self {
        SymExpr::Operation {
            op: op.into(),
            args,
        }
    }

    /// Smart negation: `!(!x)` rewrites to `x`
    pub fn not(expr: SymExpr) -> Self {
        if let SymExpr::Operation { op, mut args } = expr {
            if op == "!" {
                return args.swap_remove(0);
            }
            return SymExpr::op("!", vec![SymExpr::Operation { op, args }]);
        }
        SymExpr::op("!", vec![expr])
    }

    pub fn and(left: SymExpr, right: SymExpr) -> Self {
        SymExpr::op("&", vec![left, right])
    }

    /// N-ary conjunction; the empty conjunction is `true`
    pub fn and_all(mut conjuncts: Vec<SymExpr>) -> Self {
        match conjuncts.len() {
            0 => SymExpr::truth(),
            1 => conjuncts.swap_remove(0),
            _ => SymExpr::op("&", conjuncts),
        }
    }

    /// N-ary disjunction; the empty disjunction is `true`
    pub fn or_all(mut disjuncts: Vec<SymExpr>) -> Self {
        match disjuncts.len() {
            0 => SymExpr::truth(),
            1 => disjuncts.swap_remove(0),
            _ => SymExpr::op("|", disjuncts),
        }
    }

    /// Implication encoded over the canonical operators: `!a | b`
    pub fn implies(antecedent: SymExpr, consequent: SymExpr) -> Self {
        SymExpr::op("|", vec![SymExpr::not(antecedent), consequent])
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, SymExpr::Constant(_))
    }

    /// All symbols occurring in the tree, in first-occurrence order
    pub fn symbols(&self) -> Vec<(String, SymType)> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<(String, SymType)>) {
        match self {
            SymExpr::Symbol { name, ty } => {
                if !out.iter().any(|(n, _)| n == name) {
                    out.push((name.clone(), *ty));
                }
            }
            SymExpr::Constant(_) => {}
            SymExpr::Operation { args, .. } => {
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
        }
    }

    /// Canonical text form: `Type(name)`, `Constant(value)`, `op(a1,...,ak)`
    pub fn canonical(&self) -> String {
        let mut s = String::new();
        self.write_canonical(&mut s);
        s
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            SymExpr::Symbol { name, ty } => {
                out.push_str(ty.as_str());
                out.push('(');
                out.push_str(name);
                out.push(')');
            }
            SymExpr::Constant(value) => {
                out.push_str("Constant(");
                out.push_str(&value.to_string());
                out.push(')');
            }
            SymExpr::Operation { op, args } => {
                out.push_str(op);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.write_canonical(out);
                }
                out.push(')');
            }
        }
    }

    /// Parse the canonical grammar back into a tree
    pub fn parse(input: &str) -> Result<SymExpr> {
        let mut roots = parse_nodes(input)?;
        if roots.len() != 1 {
            return Err(AnalyzerError::SymbolicParse {
                message: format!("expected one expression, found {}", roots.len()),
            });
        }
        node_to_expr(roots.swap_remove(0))
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// Wire format per the external interface: {"expr": "<canonical string>"}.
#[derive(Serialize, Deserialize)]
struct SymExprWire {
    expr: String,
}

impl Serialize for SymExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        SymExprWire {
            expr: self.canonical(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SymExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = SymExprWire::deserialize(deserializer)?;
        SymExpr::parse(&wire.expr).map_err(|e| D::Error::custom(e.to_string()))
    }
}

/// Intermediate parse tree: either a bare word (symbol name or literal) or a
/// named node with children.
enum ParseNode {
    Word(String),
    Op { name: String, children: Vec<ParseNode> },
}

fn parse_nodes(input: &str) -> Result<Vec<ParseNode>> {
    // stack of partially built operation nodes
    let mut stack: Vec<(String, Vec<ParseNode>)> = Vec::new();
    let mut finished: Vec<ParseNode> = Vec::new();
    let mut word = String::new();

    for ch in input.chars() {
        match ch {
            '(' => {
                stack.push((std::mem::take(&mut word), Vec::new()));
            }
            ')' => {
                let (name, mut children) = stack.pop().ok_or_else(|| {
                    AnalyzerError::SymbolicParse {
                        message: "unbalanced ')'".into(),
                    }
                })?;
                if !word.is_empty() {
                    children.push(ParseNode::Word(std::mem::take(&mut word)));
                }
                let node = ParseNode::Op { name, children };
                match stack.last_mut() {
                    Some((_, parent_children)) => parent_children.push(node),
                    None => finished.push(node),
                }
            }
            ',' => {
                if !word.is_empty() {
                    let w = ParseNode::Word(std::mem::take(&mut word));
                    match stack.last_mut() {
                        Some((_, children)) => children.push(w),
                        None => {
                            return Err(AnalyzerError::SymbolicParse {
                                message: "',' outside of operation".into(),
                            })
                        }
                    }
                }
            }
            c if c.is_whitespace() => {}
            c => word.push(c),
        }
    }

    if !stack.is_empty() {
        return Err(AnalyzerError::SymbolicParse {
            message: "unbalanced '('".into(),
        });
    }
    if !word.is_empty() {
        finished.push(ParseNode::Word(word));
    }
    Ok(finished)
}

fn node_to_expr(node: ParseNode) -> Result<SymExpr> {
    match node {
        ParseNode::Word(w) => Err(AnalyzerError::SymbolicParse {
            message: format!("bare word '{}' outside of a node", w),
        }),
        ParseNode::Op { name, mut children } => match name.as_str() {
            "Constant" => {
                if children.len() != 1 {
                    return Err(AnalyzerError::SymbolicParse {
                        message: "Constant expects one value".into(),
                    });
                }
                match children.swap_remove(0) {
                    ParseNode::Word(w) => Ok(SymExpr::Constant(parse_value(&w)?)),
                    ParseNode::Op { .. } => Err(AnalyzerError::SymbolicParse {
                        message: "Constant value must be a literal".into(),
                    }),
                }
            }
            "Real" | "Int" | "Bool" => {
                let ty = match name.as_str() {
                    "Real" => SymType::Real,
                    "Int" => SymType::Int,
                    _ => SymType::Bool,
                };
                if children.len() != 1 {
                    return Err(AnalyzerError::SymbolicParse {
                        message: format!("{} expects one symbol name", name),
                    });
                }
                match children.swap_remove(0) {
                    ParseNode::Word(w) => Ok(SymExpr::typed_symbol(w, ty)),
                    ParseNode::Op { .. } => Err(AnalyzerError::SymbolicParse {
                        message: "symbol name must be a bare word".into(),
                    }),
                }
            }
            _ => {
                let args = children
                    .into_iter()
                    .map(node_to_expr)
                    .collect::<Result<Vec<_>>>()?;
                Ok(SymExpr::Operation { op: name, args })
            }
        },
    }
}

fn parse_value(word: &str) -> Result<Value> {
    if word.eq_ignore_ascii_case("true") {
        return Ok(Value::Bool(true));
    }
    if word.eq_ignore_ascii_case("false") {
        return Ok(Value::Bool(false));
    }
    if let Ok(i) = word.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if let Ok(f) = word.parse::<f64>() {
        return Ok(Value::Float(f));
    }
    Err(AnalyzerError::SymbolicParse {
        message: format!("bad constant: {}", word),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_negation_cancels() {
        let x = SymExpr::symbol("x");
        let negated = SymExpr::not(SymExpr::not(x.clone()));
        assert_eq!(negated, x);
    }

    #[test]
    fn test_single_negation_wraps() {
        let x = SymExpr::symbol("x");
        let negated = SymExpr::not(x.clone());
        assert_eq!(negated, SymExpr::op("!", vec![x]));
    }

    #[test]
    fn test_structural_equality() {
        let a = SymExpr::op(
            "+",
            vec![SymExpr::symbol("x"), SymExpr::constant(Value::Int(1))],
        );
        let b = SymExpr::op(
            "+",
            vec![SymExpr::symbol("x"), SymExpr::constant(Value::Int(1))],
        );
        let c = SymExpr::op(
            "+",
            vec![SymExpr::symbol("y"), SymExpr::constant(Value::Int(1))],
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, SymExpr::symbol("x"));
    }

    #[test]
    fn test_canonical_form() {
        let e = SymExpr::op(
            ">=",
            vec![
                SymExpr::typed_symbol("n", SymType::Int),
                SymExpr::constant(Value::Int(0)),
            ],
        );
        assert_eq!(e.canonical(), ">=(Int(n),Constant(0))");
    }

    #[test]
    fn test_round_trip() {
        let exprs = vec![
            SymExpr::symbol("theta"),
            SymExpr::constant(Value::Float(0.5)),
            SymExpr::constant(Value::Bool(true)),
            SymExpr::op(
                "&",
                vec![
                    SymExpr::op(
                        "==",
                        vec![SymExpr::typed_symbol("b", SymType::Int), SymExpr::constant(Value::Int(1))],
                    ),
                    SymExpr::not(SymExpr::op(
                        "<",
                        vec![SymExpr::symbol("z"), SymExpr::constant(Value::Float(0.0))],
                    )),
                ],
            ),
            SymExpr::op(
                "ife",
                vec![
                    SymExpr::typed_symbol("flag", SymType::Bool),
                    SymExpr::constant(Value::Int(1)),
                    SymExpr::constant(Value::Int(2)),
                ],
            ),
        ];
        for e in exprs {
            let parsed = SymExpr::parse(&e.canonical()).unwrap();
            assert_eq!(parsed, e, "round trip failed for {}", e.canonical());
        }
    }

    #[test]
    fn test_parse_rejects_unbalanced() {
        assert!(SymExpr::parse("&(Real(x),").is_err());
        assert!(SymExpr::parse("Real(x))").is_err());
    }

    #[test]
    fn test_absent_constant_coerces_to_zero() {
        assert_eq!(
            SymExpr::constant_or_zero(None),
            SymExpr::constant(Value::Int(0))
        );
        assert_eq!(
            SymExpr::constant_or_zero(Some(Value::Float(2.0))),
            SymExpr::constant(2.0)
        );
    }

    #[test]
    fn test_and_all() {
        assert_eq!(SymExpr::and_all(vec![]), SymExpr::truth());
        let x = SymExpr::symbol("x");
        assert_eq!(SymExpr::and_all(vec![x.clone()]), x.clone());
        let both = SymExpr::and_all(vec![x.clone(), x.clone()]);
        assert_eq!(both, SymExpr::op("&", vec![x.clone(), x]));
    }

    #[test]
    fn test_implies_encoding() {
        let a = SymExpr::symbol("a");
        let b = SymExpr::symbol("b");
        let impl_ = SymExpr::implies(a.clone(), b.clone());
        assert_eq!(impl_, SymExpr::op("|", vec![SymExpr::not(a), b]));
    }

    #[test]
    fn test_serde_wire_format() {
        let e = SymExpr::op("!", vec![SymExpr::symbol("x")]);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"expr":"!(Real(x))"}"#);
        let back: SymExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_symbols_first_occurrence_order() {
        let e = SymExpr::op(
            "&",
            vec![
                SymExpr::symbol("b"),
                SymExpr::op("+", vec![SymExpr::symbol("a"), SymExpr::symbol("b")]),
            ],
        );
        let syms: Vec<String> = e.symbols().into_iter().map(|(n, _)| n).collect();
        assert_eq!(syms, vec!["b", "a"]);
    }
}
