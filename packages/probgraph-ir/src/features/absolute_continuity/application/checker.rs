//! Absolute-continuity checking (`P << Q`)
//!
//! A sufficient condition is discharged to the SMT solver: under matching
//! path conditions, every sample's support in P must be contained in the
//! corresponding support in Q. The global query proves the implication in one
//! shot; the finer-grained queries localize failures per variable and per
//! pair of sample statements.

use crate::errors::{AnalyzerError, Result};
use crate::features::absolute_continuity::domain::{AcWarning, GlobalAbsoluteContinuityViolation};
use crate::features::cfg::NodeId;
use crate::features::constraint_verification::application::verifier::resolve_support_bounds;
use crate::features::distributions::distribution_properties;
use crate::features::program::application::eval::{IntervalAssumptions, SymbolicAssumptions};
use crate::features::program::application::path_condition::path_condition;
use crate::features::program::domain::{FunctionCfg, ProgramIr};
use crate::features::smt::{SmtModel, SmtSolver, SolveResult};
use crate::shared::models::{Interval, SymExpr, SymType, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of the global `P << Q` query
#[derive(Debug, Clone, PartialEq)]
pub enum AcOutcome {
    /// The solver proved the implication (`unsat` on its negation)
    Proved,
    /// Counter-example trace: positive density under P, zero under Q
    Violation(SmtModel),
    /// The solver could not decide
    Unknown,
}

/// Fresh symbol for a sample node; discrete distributions get Int symbols,
/// everything else (unknown included) defaults to Real.
fn sample_symbol(ir: &ProgramIr, node: NodeId) -> SymExpr {
    let name = ir
        .node(node)
        .symbolic_name()
        .unwrap_or_default()
        .to_string();
    let ty = ir
        .node(node)
        .distribution()
        .and_then(|dist| distribution_properties(&dist.name))
        .map(|properties| {
            if properties.is_discrete() {
                SymType::Int
            } else {
                SymType::Real
            }
        })
        .unwrap_or(SymType::Real);
    SymExpr::typed_symbol(name, ty)
}

/// The sample's support, projected to an interval with parameter-dependent
/// bounds resolved. `None` when the support has no interval shape.
pub(crate) fn support_interval(ir: &ProgramIr, node: NodeId) -> Result<Option<Interval>> {
    let Some(dist) = ir.node(node).distribution().cloned() else {
        return Ok(None);
    };
    let Some(properties) = distribution_properties(&dist.name) else {
        return Ok(None);
    };
    let mut support = properties.support.clone();
    resolve_support_bounds(ir, node, &dist, &mut support, &IntervalAssumptions::new())?;
    Ok(support.to_interval())
}

/// The distribution constraint `dc(n)`: the sample's value lies in its
/// support, as a formula over the node's symbol. Unbounded supports
/// contribute the trivial constraint; non-interval supports contribute none.
fn distribution_constraint(ir: &ProgramIr, node: NodeId) -> Result<Option<SymExpr>> {
    let Some(interval) = support_interval(ir, node)? else {
        return Ok(None);
    };
    let var = sample_symbol(ir, node);
    let lower = (interval.low > f64::NEG_INFINITY).then(|| {
        SymExpr::op(
            "<=",
            vec![SymExpr::Constant(Value::Float(interval.low)), var.clone()],
        )
    });
    let upper = (interval.high < f64::INFINITY).then(|| {
        SymExpr::op(
            "<=",
            vec![var.clone(), SymExpr::Constant(Value::Float(interval.high))],
        )
    });
    Ok(Some(match (lower, upper) {
        (Some(lo), Some(hi)) => SymExpr::and(lo, hi),
        (Some(lo), None) => lo,
        (None, Some(hi)) => hi,
        (None, None) => SymExpr::truth(),
    }))
}

struct AcContext {
    pcs: BTreeMap<NodeId, SymExpr>,
    dcs: BTreeMap<NodeId, Option<SymExpr>>,
}

impl AcContext {
    /// Introduce symbols for every sample so cross-references expand to the
    /// symbol instead of the sampled expression, then compute path and
    /// distribution constraints per node. Nodes whose path condition hits a
    /// symbolic cycle are omitted from every formula.
    fn prepare(ir: &ProgramIr, nodes: &[NodeId]) -> Result<Self> {
        let mut assumptions = SymbolicAssumptions::new();
        for &node in nodes {
            assumptions.insert(node, sample_symbol(ir, node));
        }
        let mut pcs = BTreeMap::new();
        let mut dcs = BTreeMap::new();
        for &node in nodes {
            match path_condition(ir, node, &assumptions) {
                Ok(pc) => {
                    pcs.insert(node, pc);
                }
                Err(AnalyzerError::CyclicDependency { message }) => {
                    warn!(%node, %message, "omitting sample from absolute-continuity formula");
                }
                Err(err) => return Err(err),
            }
            dcs.insert(node, distribution_constraint(ir, node)?);
        }
        Ok(Self { pcs, dcs })
    }

    /// `pc(n) => dc(n)` for every node with both pieces available
    fn implications(&self, nodes: &[NodeId]) -> Vec<SymExpr> {
        nodes
            .iter()
            .filter_map(|node| {
                let pc = self.pcs.get(node)?;
                let dc = self.dcs.get(node)?.as_ref()?;
                Some(SymExpr::implies(pc.clone(), dc.clone()))
            })
            .collect()
    }

    fn constrained_pc(&self, node: NodeId) -> Option<SymExpr> {
        let pc = self.pcs.get(&node)?;
        let dc = self.dcs.get(&node)?.as_ref()?;
        Some(SymExpr::and(pc.clone(), dc.clone()))
    }
}

/// Check `P << Q` for two sets of sample nodes over a shared IR.
///
/// Submits `not((AND pc=>dc over P) => (AND pc=>dc over Q))`; a `sat` model
/// witnesses the failure.
pub fn check_ac(
    ir: &ProgramIr,
    p_nodes: &[NodeId],
    q_nodes: &[NodeId],
    solver: &dyn SmtSolver,
) -> Result<AcOutcome> {
    let mut all = p_nodes.to_vec();
    all.extend_from_slice(q_nodes);
    let ctx = AcContext::prepare(ir, &all)?;

    let formula = SymExpr::not(SymExpr::implies(
        SymExpr::and_all(ctx.implications(p_nodes)),
        SymExpr::and_all(ctx.implications(q_nodes)),
    ));
    debug!(formula = %formula, "global absolute-continuity query");
    Ok(match solver.solve(&formula)? {
        SolveResult::Sat(model) => AcOutcome::Violation(model),
        SolveResult::Unsat => AcOutcome::Proved,
        SolveResult::Unknown => AcOutcome::Unknown,
    })
}

fn role_name(function: &FunctionCfg) -> String {
    function
        .name
        .clone()
        .unwrap_or_else(|| "<toplevel>".to_string())
}

fn samples_in(ir: &ProgramIr, function: &FunctionCfg) -> Vec<NodeId> {
    ir.sample_nodes()
        .into_iter()
        .filter(|&n| function.cfg.contains(n))
        .collect()
}

/// Convenience entry point for the guide obligation: every trace the guide
/// can produce must have positive density under the model (`guide << model`).
pub fn check_ac_guide(
    ir: &ProgramIr,
    solver: &dyn SmtSolver,
) -> Result<Option<GlobalAbsoluteContinuityViolation>> {
    let model = ir
        .model()
        .ok_or_else(|| AnalyzerError::internal("IR has no model reference"))?;
    let guide = ir
        .guide()
        .ok_or_else(|| AnalyzerError::internal("IR has no guide reference"))?;

    let p_nodes = samples_in(ir, guide);
    let q_nodes = samples_in(ir, model);

    match check_ac(ir, &p_nodes, &q_nodes, solver)? {
        AcOutcome::Violation(counterexample) => Ok(Some(GlobalAbsoluteContinuityViolation {
            p_name: role_name(guide),
            q_name: role_name(model),
            counterexample,
            span: ir.node(guide.cfg.start).span,
        })),
        _ => Ok(None),
    }
}

fn group_by_name(ir: &ProgramIr, nodes: &[NodeId]) -> BTreeMap<String, Vec<NodeId>> {
    let mut groups: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
    for &node in nodes {
        if let Some(name) = ir.node(node).symbolic_name() {
            groups.entry(name.to_string()).or_default().push(node);
        }
    }
    groups
}

/// Overlapping same-name sample statements within one function
fn check_disjointness(
    ir: &ProgramIr,
    solver: &dyn SmtSolver,
    function: &str,
    ctx: &AcContext,
    by_name: &BTreeMap<String, Vec<NodeId>>,
    warnings: &mut Vec<AcWarning>,
) -> Result<()> {
    for (name, stmts) in by_name {
        for (i, &first) in stmts.iter().enumerate() {
            for &second in &stmts[i + 1..] {
                let (Some(first_pc), Some(second_pc)) =
                    (ctx.pcs.get(&first), ctx.pcs.get(&second))
                else {
                    continue;
                };
                let both = SymExpr::and(first_pc.clone(), second_pc.clone());
                if let SolveResult::Sat(_) = solver.solve(&both)? {
                    warnings.push(AcWarning::OverlappingSampleStatements {
                        function: function.to_string(),
                        variable: name.clone(),
                        first,
                        first_span: ir.node(first).span,
                        first_pc: first_pc.clone(),
                        second,
                        second_span: ir.node(second).span,
                        second_pc: second_pc.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Full guide validation: the global query plus the finer-grained
/// diagnostics (overlap, missing variable, per-variable counter-examples,
/// support mismatches). P is the guide, Q the model.
pub fn validate_guide(ir: &ProgramIr, solver: &dyn SmtSolver) -> Result<Vec<AcWarning>> {
    let model = ir
        .model()
        .ok_or_else(|| AnalyzerError::internal("IR has no model reference"))?;
    let guide = ir
        .guide()
        .ok_or_else(|| AnalyzerError::internal("IR has no guide reference"))?;

    let p_name = role_name(guide);
    let q_name = role_name(model);
    let p_nodes = samples_in(ir, guide);
    let q_nodes = samples_in(ir, model);

    let mut all = p_nodes.clone();
    all.extend_from_slice(&q_nodes);
    let ctx = AcContext::prepare(ir, &all)?;

    let mut warnings = Vec::new();

    // (1) the global implication
    let formula = SymExpr::not(SymExpr::implies(
        SymExpr::and_all(ctx.implications(&p_nodes)),
        SymExpr::and_all(ctx.implications(&q_nodes)),
    ));
    if let SolveResult::Sat(counterexample) = solver.solve(&formula)? {
        warnings.push(AcWarning::Global(GlobalAbsoluteContinuityViolation {
            p_name: p_name.clone(),
            q_name: q_name.clone(),
            counterexample,
            span: ir.node(guide.cfg.start).span,
        }));
    }

    let p_by_name = group_by_name(ir, &p_nodes);
    let q_by_name = group_by_name(ir, &q_nodes);

    // (2) same-name sample statements must live on disjoint paths
    check_disjointness(ir, solver, &p_name, &ctx, &p_by_name, &mut warnings)?;
    check_disjointness(ir, solver, &q_name, &ctx, &q_by_name, &mut warnings)?;

    // (3) sampling a variable in P must imply it can be sampled in Q
    for (name, p_stmts) in &p_by_name {
        let Some(q_stmts) = q_by_name.get(name) else {
            warnings.push(AcWarning::MissingSampleStatement {
                variable: name.clone(),
                p_name: p_name.clone(),
                q_name: q_name.clone(),
                span: ir.node(p_stmts[0]).span,
            });
            continue;
        };

        let p_pcs: Vec<SymExpr> = p_stmts
            .iter()
            .filter_map(|&n| ctx.constrained_pc(n))
            .collect();
        let q_pcs: Vec<SymExpr> = q_stmts
            .iter()
            .filter_map(|&n| ctx.constrained_pc(n))
            .collect();
        if p_pcs.len() != p_stmts.len() || q_pcs.len() != q_stmts.len() {
            // some support had no interval shape; covered by (1)
            continue;
        }

        let implication = SymExpr::not(SymExpr::implies(
            SymExpr::or_all(p_pcs),
            SymExpr::or_all(q_pcs),
        ));
        match solver.solve(&implication)? {
            SolveResult::Sat(model) => warnings.push(AcWarning::VariableViolation {
                variable: name.clone(),
                p_name: p_name.clone(),
                q_name: q_name.clone(),
                counterexample: Some(model),
                span: ir.node(p_stmts[0]).span,
            }),
            SolveResult::Unknown => {
                warn!(variable = %name, "could not prove or refute per-variable implication");
            }
            SolveResult::Unsat => {}
        }
    }

    // (4) when a P statement and a Q statement can execute on the same path,
    // their supports must satisfy containment
    for (name, p_stmts) in &p_by_name {
        let Some(q_stmts) = q_by_name.get(name) else {
            continue;
        };
        for &p_rv in p_stmts {
            for &q_rv in q_stmts {
                let (Some(p_pc), Some(q_pc)) = (ctx.pcs.get(&p_rv), ctx.pcs.get(&q_rv)) else {
                    continue;
                };
                let intersect = SymExpr::and(p_pc.clone(), q_pc.clone());
                if !matches!(solver.solve(&intersect)?, SolveResult::Sat(_)) {
                    continue;
                }
                let (Some(p_dist), Some(q_dist)) =
                    (ir.node(p_rv).distribution(), ir.node(q_rv).distribution())
                else {
                    continue;
                };
                let (Some(p_props), Some(q_props)) = (
                    distribution_properties(&p_dist.name),
                    distribution_properties(&q_dist.name),
                ) else {
                    continue;
                };

                if p_props.ty == q_props.ty
                    && p_props.support.is_interval_constraint()
                        == q_props.support.is_interval_constraint()
                {
                    let (Some(p_support), Some(q_support)) =
                        (support_interval(ir, p_rv)?, support_interval(ir, q_rv)?)
                    else {
                        continue;
                    };
                    if !p_support.is_subset_of(&q_support) {
                        warnings.push(AcWarning::SupportIntervalMismatch {
                            variable: name.clone(),
                            p_span: ir.node(p_rv).span,
                            q_span: ir.node(q_rv).span,
                            p_support,
                            q_support,
                        });
                    }
                } else if p_props.ty != q_props.ty || p_props.support != q_props.support {
                    warnings.push(AcWarning::SupportTypeMismatch {
                        variable: name.clone(),
                        p_span: ir.node(p_rv).span,
                        q_span: ir.node(q_rv).span,
                    });
                }
            }
        }
    }

    Ok(warnings)
}
