//! Path-condition generation
//!
//! `pc(N)` characterizes exactly the program paths that reach `N`: a
//! conjunction over the branch parents of `N`, taking each test positively
//! when the then-arm reaches `N` with the branch blocked and negatively
//! otherwise.

use crate::errors::{AnalyzerError, Result};
use crate::features::cfg::NodeId;
use crate::features::program::application::dependencies::branch_parents;
use crate::features::program::application::eval::{symbolic_expression, SymbolicAssumptions};
use crate::features::program::domain::ProgramIr;
use crate::shared::models::SymExpr;

/// Symbolic formula over branch decisions; `true` when `node` is
/// unconditionally reachable.
pub fn path_condition(
    ir: &ProgramIr,
    node: NodeId,
    assumptions: &SymbolicAssumptions,
) -> Result<SymExpr> {
    let mut pc = SymExpr::truth();
    let function = ir.cfg_for_node(node)?;
    let bps = branch_parents(ir.arena(), &function.cfg, node);
    for branch in bps {
        let test = ir.arena().branch_test(branch)?;
        let test_sym = symbolic_expression(ir, branch, test, assumptions)?;
        let (then, orelse) = ir.arena().branch_successors(branch)?;

        ir.arena().block(branch);
        let then_reaches = ir.arena().is_reachable(then, node);
        let orelse_reaches = ir.arena().is_reachable(orelse, node);
        ir.arena().unblock(branch);

        let conjunct = if then_reaches {
            test_sym
        } else if orelse_reaches {
            SymExpr::not(test_sym)
        } else {
            return Err(AnalyzerError::malformed_cfg(format!(
                "neither branch arm of {} reaches {}",
                ir.node(branch),
                node
            )));
        };
        pc = if pc.is_constant() {
            conjunct
        } else {
            SymExpr::and(pc, conjunct)
        };
    }
    Ok(pc)
}
