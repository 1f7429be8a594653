//! Funnel detection
//!
//! A funnel is a model structure in which a scale parameter depends on
//! another random variable (`tau ~ HalfCauchy(5); theta ~ Normal(mu, tau)`),
//! which is numerically hazardous for gradient-based inference. The analysis
//! traverses the data dependencies of every scale expression; a sample node
//! terminates its branch with a warning, non-sample assignments are
//! traversed through.

use crate::errors::Result;
use crate::features::cfg::NodeId;
use crate::features::program::application::dependencies::data_deps_for_expr;
use crate::features::program::domain::ProgramIr;
use crate::shared::models::{Expr, Span};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A scale parameter fed by another random draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelWarning {
    /// The sample/factor node whose scale is affected
    pub funnel_node: NodeId,
    pub funnel_span: Span,
    /// The sample node the scale depends on
    pub scale_node: NodeId,
    pub scale_span: Span,
}

impl FunnelWarning {
    pub fn diagnostic_ranges(&self) -> Vec<(u32, u32)> {
        vec![self.funnel_span.as_range(), self.scale_span.as_range()]
    }
}

impl fmt::Display for FunnelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Funnel detected: scale parameter of the statement at bytes {} depends on the random variable at bytes {}, which may lead to poor inference performance.",
            self.funnel_span, self.scale_span
        )
    }
}

/// Find every funnel relationship in the program
pub fn detect_funnels(ir: &ProgramIr) -> Result<Vec<FunnelWarning>> {
    let mut warnings = Vec::new();
    // value expression stand-in for parameter bindings without a default
    let empty = Expr::constant(0i64, Span::zero());

    for node in ir.random_nodes() {
        let Some(dist) = ir.node(node).distribution() else {
            continue;
        };
        let Some(scale_expr) = dist.args.get("scale") else {
            continue;
        };

        let mut marked: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<(NodeId, &Expr)> = VecDeque::from([(node, scale_expr)]);
        while let Some((at, expr)) = queue.pop_front() {
            for dep in data_deps_for_expr(ir, at, expr)? {
                if !marked.insert(dep) {
                    continue;
                }
                let dep_node = ir.node(dep);
                if dep_node.is_sample() {
                    warnings.push(FunnelWarning {
                        funnel_node: node,
                        funnel_span: ir.node(node).span,
                        scale_node: dep,
                        scale_span: dep_node.span,
                    });
                    // a random variable terminates this branch
                    continue;
                }
                queue.push_back((dep, dep_node.value_expr().unwrap_or(&empty)));
                if let Some(target) = dep_node.target() {
                    if let Some(index) = target.index_expr() {
                        queue.push_back((dep, index));
                    }
                }
            }
        }
    }
    Ok(warnings)
}
