//! Reaching definitions, branch parents and their interprocedural extension
//!
//! RD walks parent edges upward until a write to the queried variable kills
//! the path; cycles terminate by path membership and diamonds are tamed by
//! memoizing the RD set at Branch nodes. BP is the set of Branch nodes whose
//! arms disagree about reachability of the target while the Branch itself is
//! blocked.

use crate::errors::Result;
use crate::features::cfg::{Cfg, CfgArena, NodeId, NodeKind};
use crate::features::program::domain::ProgramIr;
use crate::shared::models::{Expr, Variable};
use crate::shared::utils::ExprId;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::trace;

/// Reaching definitions of `variable` at `node`: every
/// assign/sample/loop-iter/func-arg whose written value can be read there.
pub fn reaching_definitions(
    arena: &CfgArena,
    node: NodeId,
    variable: &Variable,
) -> BTreeSet<NodeId> {
    let mut rds = BTreeSet::new();
    let mut memo: FxHashMap<NodeId, BTreeSet<NodeId>> = FxHashMap::default();
    let mut path = Vec::new();
    collect_rds(arena, node, variable, &mut path, &mut rds, &mut memo);
    trace!(%node, %variable, count = rds.len(), "reaching definitions");
    rds
}

fn collect_rds(
    arena: &CfgArena,
    node: NodeId,
    variable: &Variable,
    path: &mut Vec<NodeId>,
    rds: &mut BTreeSet<NodeId>,
    memo: &mut FxHashMap<NodeId, BTreeSet<NodeId>>,
) {
    for &parent in &arena.node(node).parents {
        let parent_node = arena.node(parent);
        let mut descend = true;
        match &parent_node.kind {
            NodeKind::Assign { .. } | NodeKind::Sample { .. } => {
                if let Some(target) = parent_node.target() {
                    if target.is_equal(variable) {
                        rds.insert(parent);
                        if !target.is_indexed() {
                            // x = ... kills the whole base
                            descend = false;
                        } else if variable.is_indexed() && target.index_is_equal(variable) {
                            // x[2] = ... kills exactly x[2]
                            descend = false;
                        }
                        // x[i] = ... with a different / dynamic index: the
                        // write may alias, older definitions still reach
                    }
                }
            }
            NodeKind::FuncArg { .. } | NodeKind::LoopIter { .. } => {
                // these targets are never indexed
                if let Some(target) = parent_node.target() {
                    if target.is_equal(variable) {
                        rds.insert(parent);
                        descend = false;
                    }
                }
            }
            _ => {}
        }
        if !descend {
            continue;
        }
        if path.contains(&parent) {
            // loop back-edge: this path has been walked already
            continue;
        }
        path.push(parent);
        if parent_node.is_branch() {
            // memoize at branch nodes to avoid path explosion across
            // diamond-shaped control flow
            if let Some(cached) = memo.get(&parent) {
                rds.extend(cached.iter().copied());
            } else {
                let mut branch_rds = BTreeSet::new();
                collect_rds(arena, parent, variable, path, &mut branch_rds, memo);
                memo.insert(parent, branch_rds.clone());
                rds.extend(branch_rds);
            }
        } else {
            collect_rds(arena, parent, variable, path, rds, memo);
        }
        path.pop();
    }
}

/// Branch parents of `node` within its CFG: the Branch nodes whose decision
/// affects whether control reaches `node`.
///
/// `BP(N) = { B : reach(B.then, N) XOR reach(B.orelse, N) }`, with `B`
/// blocked during the two queries to isolate each successor subgraph.
pub fn branch_parents(arena: &CfgArena, cfg: &Cfg, node: NodeId) -> BTreeSet<NodeId> {
    let mut bps = BTreeSet::new();
    for &branch in &cfg.nodes {
        if !arena.node(branch).is_branch() {
            continue;
        }
        let Ok((then, orelse)) = arena.branch_successors(branch) else {
            continue;
        };
        arena.block(branch);
        let then_reaches = arena.is_reachable(then, node);
        let orelse_reaches = arena.is_reachable(orelse, node);
        arena.unblock(branch);
        if then_reaches != orelse_reaches {
            bps.insert(branch);
        }
    }
    bps
}

/// Data dependencies of `expr` as used at `node`, crossing function
/// boundaries:
///
/// - at a FuncArg node they are the union over all call sites of the
///   dependencies of the corresponding argument expression;
/// - a use of a user-defined function folds in the dependencies collected at
///   every Return of that function.
pub fn data_deps_for_expr(ir: &ProgramIr, node: NodeId, expr: &Expr) -> Result<BTreeSet<NodeId>> {
    let mut out = BTreeSet::new();
    let mut seen = FxHashSet::default();
    collect_data_deps(ir, node, expr, &mut seen, &mut out)?;
    Ok(out)
}

fn collect_data_deps(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
    seen: &mut FxHashSet<(NodeId, ExprId)>,
    out: &mut BTreeSet<NodeId>,
) -> Result<()> {
    // recursive user functions terminate here
    if !seen.insert((node, expr.id)) {
        return Ok(());
    }

    if let NodeKind::FuncArg { index, .. } = &ir.node(node).kind {
        let index = *index;
        let function = ir.cfg_for_node(node)?;
        if let Some(fname) = function.name.clone() {
            for (call_node, call) in ir.all_function_calls(&fname) {
                if let Some(arg_expr) = call.call_arg(index) {
                    collect_data_deps(ir, call_node, arg_expr, seen, out)?;
                }
            }
        }
        return Ok(());
    }

    for variable in expr.free_variables() {
        if ir.is_user_defined_function(&variable) {
            if let Some(function) = ir.user_function_cfg(&variable.name) {
                for return_node in ir.return_nodes(&function.cfg) {
                    if let NodeKind::Return { value: Some(value) } = &ir.node(return_node).kind {
                        collect_data_deps(ir, return_node, value, seen, out)?;
                    }
                }
            }
        } else {
            out.extend(reaching_definitions(ir.arena(), node, &variable));
        }
    }
    Ok(())
}

/// Control dependencies of `expr` as used at `node`: the branch parents of
/// the node itself, extended across function boundaries the same way as data
/// dependencies.
pub fn control_deps_for_node(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
) -> Result<BTreeSet<NodeId>> {
    let mut out = BTreeSet::new();
    let mut seen = FxHashSet::default();
    collect_control_deps(ir, node, expr, &mut seen, &mut out)?;
    Ok(out)
}

fn collect_control_deps(
    ir: &ProgramIr,
    node: NodeId,
    expr: &Expr,
    seen: &mut FxHashSet<(NodeId, ExprId)>,
    out: &mut BTreeSet<NodeId>,
) -> Result<()> {
    if !seen.insert((node, expr.id)) {
        return Ok(());
    }

    if let NodeKind::FuncArg { .. } = &ir.node(node).kind {
        let function = ir.cfg_for_node(node)?;
        if let Some(fname) = function.name.clone() {
            for (call_node, call) in ir.all_function_calls(&fname) {
                collect_control_deps(ir, call_node, call, seen, out)?;
            }
        }
        return Ok(());
    }

    let function = ir.cfg_for_node(node)?;
    out.extend(branch_parents(ir.arena(), &function.cfg, node));

    for variable in expr.free_variables() {
        if ir.is_user_defined_function(&variable) {
            if let Some(function) = ir.user_function_cfg(&variable.name) {
                for return_node in ir.return_nodes(&function.cfg) {
                    if let NodeKind::Return { value: Some(value) } = &ir.node(return_node).kind {
                        collect_control_deps(ir, return_node, value, seen, out)?;
                    }
                }
            }
        }
    }
    Ok(())
}
