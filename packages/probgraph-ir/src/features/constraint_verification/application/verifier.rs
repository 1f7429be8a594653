//! Distribution-parameter constraint verification
//!
//! Two passes over the sample/factor nodes: first install each sample's
//! support interval as an assumption (resolving parameter-dependent bounds),
//! then check every distribution argument's interval estimate against its
//! catalogued constraint.

use crate::errors::Result;
use crate::features::cfg::NodeId;
use crate::features::constraint_verification::domain::{
    ConstraintVerificationResult, ConstraintViolation,
};
use crate::features::distributions::{distribution_properties, Constraint};
use crate::features::program::application::eval::{estimate_value_range, IntervalAssumptions};
use crate::features::program::domain::ProgramIr;
use crate::shared::models::Distribution;
use tracing::{debug, warn};

/// Resolve parameter-dependent support bounds against the argument
/// expressions at the node, under the assumptions gathered so far.
pub(crate) fn resolve_support_bounds(
    ir: &ProgramIr,
    node: NodeId,
    dist: &Distribution,
    support: &mut Constraint,
    assumptions: &IntervalAssumptions,
) -> Result<()> {
    if let Some(param) = support.low().and_then(|b| b.param().map(str::to_string)) {
        if let Some(arg) = dist.args.get(&param) {
            let estimated = estimate_value_range(ir, node, arg, assumptions)?;
            support.set_low(estimated.low);
        }
    }
    if let Some(param) = support.high().and_then(|b| b.param().map(str::to_string)) {
        if let Some(arg) = dist.args.get(&param) {
            let estimated = estimate_value_range(ir, node, arg, assumptions)?;
            support.set_high(estimated.high);
        }
    }
    Ok(())
}

/// Check every distribution parameter in the program against the catalog.
///
/// Returns the violations plus `analyzable = false` (and no violations) when
/// any node draws from a distribution the catalog cannot fully describe with
/// interval constraints.
pub fn verify_constraints(ir: &ProgramIr) -> Result<ConstraintVerificationResult> {
    // applicability: every distribution known, support and parameter
    // constraints all interval-shaped
    for &node in &ir.random_nodes() {
        let Some(dist) = ir.node(node).distribution() else {
            continue;
        };
        if dist.is_unknown() {
            debug!(%node, name = %dist.name, "unknown distribution, verification inapplicable");
            return Ok(ConstraintVerificationResult::inapplicable());
        }
        match distribution_properties(&dist.name) {
            Some(properties) if properties.is_fully_interval_constrained() => {}
            _ => {
                debug!(%node, name = %dist.name, "not fully interval-constrained, verification inapplicable");
                return Ok(ConstraintVerificationResult::inapplicable());
            }
        }
    }

    // record every sample's support interval as an assumption for the
    // parameter estimates below
    let mut assumptions = IntervalAssumptions::new();
    for &node in &ir.sample_nodes() {
        let Some(dist) = ir.node(node).distribution().cloned() else {
            continue;
        };
        let Some(properties) = distribution_properties(&dist.name) else {
            continue;
        };
        let mut support = properties.support.clone();
        resolve_support_bounds(ir, node, &dist, &mut support, &assumptions)?;
        if let Some(interval) = support.to_interval() {
            assumptions.insert(node, interval);
        }
    }

    let mut violations = Vec::new();
    for &node in &ir.random_nodes() {
        let Some(dist) = ir.node(node).distribution().cloned() else {
            continue;
        };
        let Some(properties) = distribution_properties(&dist.name) else {
            continue;
        };
        for (param_name, param_expr) in &dist.args {
            let estimated = estimate_value_range(ir, node, param_expr, &assumptions)?;
            let Some(constraint) = properties.param_constraints.get(param_name) else {
                warn!(%node, param = %param_name, dist = %dist.name, "no catalogued constraint for parameter");
                continue;
            };
            let Some(required) = constraint.to_interval() else {
                continue;
            };
            if estimated.low < required.low || required.high < estimated.high {
                violations.push(ConstraintViolation {
                    node,
                    node_span: ir.node(node).span,
                    param_name: param_name.clone(),
                    param_span: param_expr.span,
                    constraint: constraint.clone(),
                    estimated_range: estimated,
                    distribution: dist.name.clone(),
                });
            }
        }
    }

    Ok(ConstraintVerificationResult {
        violations,
        analyzable: true,
    })
}
