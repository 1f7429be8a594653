//! The frontend contract: a language-agnostic statement tree
//!
//! Frontend adapters parse their surface syntax (Pyro, Stan, ...) and lower
//! it into this tree; the CFG builder consumes it. Every construct carries
//! the byte range of the source text it came from.

use crate::shared::models::{AssignTarget, Distribution, Expr, Span};

/// One statement of the lowered program
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `x = e`
    Assign {
        target: AssignTarget,
        value: Expr,
        span: Span,
    },
    /// `x ~ D(...)` — a random draw recorded under a trace address
    Sample {
        target: AssignTarget,
        /// trace address label (usually the target name)
        name: String,
        /// address expression as written (participates in dependency analysis)
        address: Expr,
        dist: Distribution,
        /// the full right-hand side (the distribution call)
        value: Expr,
        span: Span,
    },
    /// Observation / `target +=` log-density contribution
    Factor {
        value: Expr,
        dist: Option<Distribution>,
        span: Span,
    },
    /// Bare expression statement
    Expr { value: Expr, span: Span },
    If {
        test: Expr,
        then: Vec<Stmt>,
        orelse: Vec<Stmt>,
        span: Span,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    For {
        target: AssignTarget,
        iter: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Return { value: Option<Expr>, span: Span },
    Break { span: Span },
    Continue { span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign { span, .. }
            | Stmt::Sample { span, .. }
            | Stmt::Factor { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span } => *span,
        }
    }
}

/// Function parameter with optional default
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            default: None,
            span,
        }
    }

    pub fn with_default(name: impl Into<String>, default: Expr, span: Span) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
            span,
        }
    }
}

/// A function definition. `scope` is the lexical scope id the frontend
/// assigned to names bound inside the body.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub scope: u32,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl FunctionDef {
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| match &p.default {
                Some(d) => format!("{}={}", p.name, d),
                None => p.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.name, params)
    }
}

/// A whole lowered program: function definitions, the top-level statement
/// list, and which functions play the model / guide roles (if any).
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub functions: Vec<FunctionDef>,
    pub body: Vec<Stmt>,
    pub model: Option<String>,
    pub guide: Option<String>,
}

impl Program {
    pub fn new(functions: Vec<FunctionDef>, body: Vec<Stmt>) -> Self {
        Self {
            functions,
            body,
            model: None,
            guide: None,
        }
    }

    pub fn with_model_and_guide(
        mut self,
        model: impl Into<String>,
        guide: impl Into<String>,
    ) -> Self {
        self.model = Some(model.into());
        self.guide = Some(guide.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_rendering() {
        let f = FunctionDef {
            name: "model".into(),
            scope: 1,
            params: vec![
                Param::new("xs", Span::zero()),
                Param::with_default("n", Expr::constant(10i64, Span::zero()), Span::zero()),
            ],
            body: vec![],
            span: Span::zero(),
        };
        assert_eq!(f.signature(), "model(xs, n=10)");
    }
}
