//! Abstract expression evaluation
//!
//! One recursive driver per domain. The driver computes a valuation of the
//! expression's free variables by chaining reaching definitions, then hands
//! the valuation to the expression itself.
//!
//! Cycles (loop-carried definitions): the interval driver returns the
//! domain's top element `[-inf, inf]`; the symbolic domain has no natural
//! top, so the driver signals a cyclic-dependency error and callers downgrade
//! the affected node to "analysis inapplicable".

use crate::errors::{AnalyzerError, Result};
use crate::features::cfg::{NodeId, NodeKind};
use crate::features::program::application::dependencies::reaching_definitions;
use crate::features::program::application::path_condition::path_condition;
use crate::features::program::domain::ProgramIr;
use crate::shared::models::{Expr, Interval, SymExpr, Variable};
use crate::shared::utils::ExprId;
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Per-node assumptions override the recursion: when a reaching definition is
/// present in the map its assumed value is used instead of its expansion.
pub type IntervalAssumptions = BTreeMap<NodeId, Interval>;
pub type SymbolicAssumptions = BTreeMap<NodeId, SymExpr>;

type WorkingSet = FxHashSet<(NodeId, ExprId)>;

/// Estimate the value range of `expr` as evaluated at `node`
pub fn estimate_value_range(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
    assumptions: &IntervalAssumptions,
) -> Result<Interval> {
    let mut working = WorkingSet::default();
    estimate_rec(ir, node, expr, assumptions, &mut working)
}

fn estimate_rec(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
    assumptions: &IntervalAssumptions,
    working: &mut WorkingSet,
) -> Result<Interval> {
    if working.contains(&(node, expr.id)) {
        // expr depends on itself (e.g. in loops): widen to top
        return Ok(Interval::top());
    }
    working.insert((node, expr.id));

    let mut mask: HashMap<Variable, Interval> = HashMap::new();
    for variable in expr.free_variables() {
        let mut intervals: Vec<Interval> = Vec::new();
        if ir.is_user_defined_function(&variable) {
            if let Some(function) = ir.user_function_cfg(&variable.name) {
                for return_node in ir.return_nodes(&function.cfg) {
                    match &ir.node(return_node).kind {
                        NodeKind::Return { value: Some(value) } => {
                            intervals.push(estimate_rec(ir, return_node, value, assumptions, working)?);
                        }
                        _ => intervals.push(Interval::top()),
                    }
                }
            }
        } else {
            for rd in reaching_definitions(ir.arena(), node, &variable) {
                if let Some(assumed) = assumptions.get(&rd) {
                    intervals.push(*assumed);
                } else if let Some(value) = ir.node(rd).value_expr() {
                    intervals.push(estimate_rec(ir, rd, value, assumptions, working)?);
                } else {
                    // parameter binding without a default
                    intervals.push(Interval::top());
                }
            }
        }
        let interval = Interval::union_all(&intervals);
        trace!(%variable, %interval, "interval mask");
        mask.insert(variable, interval);
    }

    working.remove(&(node, expr.id));
    expr.estimate_value_range(&mask)
}

/// Compute the symbolic form of `expr` as evaluated at `node`.
///
/// Multiple reaching definitions of a variable stitch into an ite-chain over
/// their path conditions, newest definition outermost. Function-argument
/// nodes short-circuit to a fresh symbol carrying the argument's name.
pub fn symbolic_expression(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
    assumptions: &SymbolicAssumptions,
) -> Result<SymExpr> {
    let mut working = WorkingSet::default();
    symbolic_rec(ir, node, expr, assumptions, &mut working)
}

pub(crate) fn symbolic_rec(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
    assumptions: &SymbolicAssumptions,
    working: &mut WorkingSet,
) -> Result<SymExpr> {
    if let NodeKind::FuncArg { name, .. } = &ir.node(node).kind {
        // no callsite unification in the symbolic domain
        return Ok(SymExpr::symbol(name.clone()));
    }
    if working.contains(&(node, expr.id)) {
        return Err(AnalyzerError::cyclic(format!(
            "symbolic evaluation of '{}' at {} depends on itself",
            expr, node
        )));
    }
    working.insert((node, expr.id));

    let result = symbolic_mask_and_eval(ir, node, expr, assumptions, working);
    working.remove(&(node, expr.id));
    result
}

fn symbolic_mask_and_eval(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
    assumptions: &SymbolicAssumptions,
    working: &mut WorkingSet,
) -> Result<SymExpr> {
    let mut mask: HashMap<Variable, SymExpr> = HashMap::new();
    for variable in expr.free_variables() {
        if ir.is_user_defined_function(&variable) {
            // user-defined function results are not supported symbolically
            continue;
        }
        let rds = reaching_definitions(ir.arena(), node, &variable);
        if rds.is_empty() {
            trace!(%variable, "no reaching definitions, leaving free symbol");
            continue;
        }
        let mut iter = rds.iter();
        let first = *iter.next().expect("checked non-empty");
        let mut sexpr = symbolic_of_rd(ir, first, assumptions, working)?;
        for &rd in iter {
            let rd_sexpr = symbolic_of_rd(ir, rd, assumptions, working)?;
            let rd_pc = path_condition(ir, rd, assumptions)?;
            sexpr = SymExpr::op("ife", vec![rd_pc, rd_sexpr, sexpr]);
        }
        mask.insert(variable, sexpr);
    }
    expr.symbolic(&mask)
}

fn symbolic_of_rd(
    ir: &ProgramIr,
    rd: NodeId,
    assumptions: &SymbolicAssumptions,
    working: &mut WorkingSet,
) -> Result<SymExpr> {
    if let Some(assumed) = assumptions.get(&rd) {
        return Ok(assumed.clone());
    }
    match &ir.node(rd).kind {
        NodeKind::FuncArg { name, .. } => Ok(SymExpr::symbol(name.clone())),
        _ => match ir.node(rd).value_expr() {
            Some(value) => symbolic_rec(ir, rd, value, assumptions, working),
            None => Err(AnalyzerError::internal(format!(
                "reaching definition {} has no value expression",
                ir.node(rd)
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AnalyzerError;
    use crate::features::program::domain::ProgramIr;
    use crate::testkit::*;

    fn node_assigning(ir: &ProgramIr, name: &str) -> NodeId {
        ir.cfgs()
            .flat_map(|f| f.cfg.nodes.iter().copied())
            .find(|&id| {
                matches!(&ir.node(id).kind, NodeKind::Assign { target, .. } if target.name == name)
            })
            .expect("assignment not found")
    }

    #[test]
    fn test_interval_of_straight_line_chain() {
        // a = 2; b = a * 3; c = b + 1
        let ir = build(vec![
            assign("a", cf(2.0)),
            assign("b", op("*", vec![v("a"), cf(3.0)])),
            assign("c", op("+", vec![v("b"), cf(1.0)])),
        ])
        .unwrap();
        let c = node_assigning(&ir, "c");
        let value = ir.node(c).value_expr().unwrap().clone();
        let range = estimate_value_range(&ir, c, &value, &IntervalAssumptions::new()).unwrap();
        assert_eq!(range, Interval::singleton(7.0));
    }

    #[test]
    fn test_interval_union_over_diamond() {
        let ir = build(vec![
            assign("cond", cf(0.0)),
            if_else(
                v("cond"),
                vec![assign("x", cf(1.0))],
                vec![assign("x", cf(5.0))],
            ),
            assign("y", v("x")),
        ])
        .unwrap();
        let y = node_assigning(&ir, "y");
        let value = ir.node(y).value_expr().unwrap().clone();
        let range = estimate_value_range(&ir, y, &value, &IntervalAssumptions::new()).unwrap();
        assert_eq!(range, Interval::new(1.0, 5.0));
    }

    #[test]
    fn test_interval_assumption_overrides_expansion() {
        let ir = build(vec![assign("x", cf(3.0)), assign("y", v("x"))]).unwrap();
        let x = node_assigning(&ir, "x");
        let y = node_assigning(&ir, "y");
        let value = ir.node(y).value_expr().unwrap().clone();

        let mut assumptions = IntervalAssumptions::new();
        assumptions.insert(x, Interval::unit());
        let range = estimate_value_range(&ir, y, &value, &assumptions).unwrap();
        assert_eq!(range, Interval::unit());
    }

    #[test]
    fn test_interval_loop_carried_cycle_widens_to_top() {
        // x = x + 1 in a loop: the self-dependent expansion widens to top
        let ir = build(vec![
            assign("x", cf(0.0)),
            while_loop(v("x"), vec![assign("x", op("+", vec![v("x"), cf(1.0)]))]),
            assign("y", v("x")),
        ])
        .unwrap();
        let y = node_assigning(&ir, "y");
        let value = ir.node(y).value_expr().unwrap().clone();
        let range = estimate_value_range(&ir, y, &value, &IntervalAssumptions::new()).unwrap();
        assert_eq!(range, Interval::top());
    }

    #[test]
    fn test_symbolic_cycle_is_an_error() {
        let ir = build(vec![
            assign("x", cf(0.0)),
            while_loop(v("x"), vec![assign("x", op("+", vec![v("x"), cf(1.0)]))]),
            assign("y", v("x")),
        ])
        .unwrap();
        let y = node_assigning(&ir, "y");
        let value = ir.node(y).value_expr().unwrap().clone();
        let err = symbolic_expression(&ir, y, &value, &SymbolicAssumptions::new()).unwrap_err();
        assert!(matches!(err, AnalyzerError::CyclicDependency { .. }));
    }

    #[test]
    fn test_symbolic_single_definition_expands() {
        let ir = build(vec![
            assign("x", cf(2.0)),
            assign("y", op("+", vec![v("x"), cf(1.0)])),
        ])
        .unwrap();
        let y = node_assigning(&ir, "y");
        let value = ir.node(y).value_expr().unwrap().clone();
        let sym = symbolic_expression(&ir, y, &value, &SymbolicAssumptions::new()).unwrap();
        assert_eq!(sym.canonical(), "+(Constant(2.0),Constant(1.0))");
    }

    #[test]
    fn test_symbolic_multiple_definitions_stitch_ite() {
        let ir = build(vec![
            assign("c", cf(1.0)),
            assign("x", cf(1.0)),
            if_else(v("c"), vec![assign("x", cf(2.0))], vec![]),
            assign("y", v("x")),
        ])
        .unwrap();
        let y = node_assigning(&ir, "y");
        let value = ir.node(y).value_expr().unwrap().clone();
        let sym = symbolic_expression(&ir, y, &value, &SymbolicAssumptions::new()).unwrap();
        // ite(pc(x=2), 2, 1) with pc(x=2) = the branch test
        assert_eq!(
            sym.canonical(),
            "ife(Constant(1.0),Constant(2.0),Constant(1.0))"
        );
    }

    #[test]
    fn test_symbolic_funcarg_becomes_symbol() {
        let ir = build_with_functions(
            vec![func(
                "f",
                1,
                vec!["a"],
                vec![ret(op("*", vec![scoped("a", 1), cf(2.0)]))],
            )],
            vec![assign("y", Expr::call("f", vec![cf(1.0)], sp()))],
        )
        .unwrap();
        let ret_node = ir
            .cfgs()
            .flat_map(|f| f.cfg.nodes.iter().copied())
            .find(|&id| matches!(ir.node(id).kind, NodeKind::Return { .. }))
            .unwrap();
        let value = match &ir.node(ret_node).kind {
            NodeKind::Return { value: Some(v) } => v.clone(),
            _ => unreachable!(),
        };
        let sym = symbolic_expression(&ir, ret_node, &value, &SymbolicAssumptions::new()).unwrap();
        assert_eq!(sym.canonical(), "*(Real(a),Constant(2.0))");
    }

    #[test]
    fn test_symbolic_assumption_short_circuits() {
        let ir = build(vec![
            sample("z", dist("Normal", vec![("location", cf(0.0)), ("scale", cf(1.0))])),
            assign("y", op("+", vec![v("z"), cf(1.0)])),
        ])
        .unwrap();
        let z = ir.sample_nodes()[0];
        let y = node_assigning(&ir, "y");
        let value = ir.node(y).value_expr().unwrap().clone();

        let mut assumptions = SymbolicAssumptions::new();
        assumptions.insert(z, SymExpr::symbol("z"));
        let sym = symbolic_expression(&ir, y, &value, &assumptions).unwrap();
        assert_eq!(sym.canonical(), "+(Real(z),Constant(1.0))");
    }
}
