//! Builders for constructing small lowered programs in unit tests

use crate::errors::Result;
use crate::features::lowering::{build_program, FunctionDef, Param, Program, Stmt};
use crate::features::program::domain::ProgramIr;
use crate::shared::models::{AssignTarget, Distribution, Expr, Span, Value};
use std::collections::BTreeMap;

pub fn sp() -> Span {
    Span::zero()
}

pub fn v(name: &str) -> Expr {
    Expr::var(name, 0, sp())
}

pub fn scoped(name: &str, scope: u32) -> Expr {
    Expr::var(name, scope, sp())
}

pub fn cf(value: f64) -> Expr {
    Expr::constant(value, sp())
}

pub fn ci(value: i64) -> Expr {
    Expr::constant(value, sp())
}

pub fn op(name: &str, args: Vec<Expr>) -> Expr {
    Expr::op(name, args, sp())
}

pub fn t(name: &str) -> AssignTarget {
    AssignTarget::simple(name, 0, sp())
}

pub fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: t(name),
        value,
        span: sp(),
    }
}

pub fn dist(name: &str, params: Vec<(&str, Expr)>) -> Distribution {
    let args: BTreeMap<String, Expr> = params
        .into_iter()
        .map(|(k, e)| (k.to_string(), e))
        .collect();
    Distribution::new(name, args)
}

/// `name ~ dist` with the trace address `name` and the distribution call as
/// the right-hand side
pub fn sample(name: &str, dist: Distribution) -> Stmt {
    let value = Expr::call(
        dist.name.clone(),
        dist.args.values().cloned().collect(),
        sp(),
    );
    Stmt::Sample {
        target: t(name),
        name: name.to_string(),
        address: Expr::constant(Value::Int(0), sp()),
        dist,
        value,
        span: sp(),
    }
}

/// Observation of `dist` (a factor node carrying the distribution)
pub fn observe(dist: Distribution) -> Stmt {
    let value = Expr::call(
        dist.name.clone(),
        dist.args.values().cloned().collect(),
        sp(),
    );
    Stmt::Factor {
        value,
        dist: Some(dist),
        span: sp(),
    }
}

pub fn if_else(test: Expr, then: Vec<Stmt>, orelse: Vec<Stmt>) -> Stmt {
    Stmt::If {
        test,
        then,
        orelse,
        span: sp(),
    }
}

pub fn while_loop(test: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While {
        test,
        body,
        span: sp(),
    }
}

pub fn for_loop(name: &str, iter: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::For {
        target: t(name),
        iter,
        body,
        span: sp(),
    }
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return {
        value: Some(value),
        span: sp(),
    }
}

pub fn func(name: &str, scope: u32, params: Vec<&str>, body: Vec<Stmt>) -> FunctionDef {
    FunctionDef {
        name: name.to_string(),
        scope,
        params: params.into_iter().map(|p| Param::new(p, sp())).collect(),
        body,
        span: sp(),
    }
}

pub fn build(stmts: Vec<Stmt>) -> Result<ProgramIr> {
    build_program(&Program::new(vec![], stmts))
}

pub fn build_with_functions(functions: Vec<FunctionDef>, stmts: Vec<Stmt>) -> Result<ProgramIr> {
    build_program(&Program::new(functions, stmts))
}
