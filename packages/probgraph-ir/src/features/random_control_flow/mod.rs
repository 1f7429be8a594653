//! Random-control-flow detection (HMC suitability)
//!
//! A worklist over data and control dependencies carries an "inside-control"
//! bit: data dependencies inherit it, control dependencies set it and then
//! explore their test expressions. Any sample node reached with the bit set
//! is a random control dependency — a discontinuity hazard for HMC/NUTS.
//! Discrete non-observed draws are reported as well; a discrete latent
//! invalidates HMC independently of control flow.

use crate::errors::Result;
use crate::features::cfg::{NodeId, NodeKind};
use crate::features::distributions::distribution_properties;
use crate::features::program::application::dependencies::{
    control_deps_for_node, data_deps_for_expr,
};
use crate::features::program::domain::ProgramIr;
use crate::shared::models::{Expr, Span};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A sample/factor statement whose execution depends on random control flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomControlDependentWarning {
    pub node: NodeId,
    pub span: Span,
    /// The sample nodes controlling the statement, with their source ranges
    pub dependencies: Vec<(NodeId, Span)>,
}

impl RandomControlDependentWarning {
    pub fn diagnostic_ranges(&self) -> Vec<(u32, u32)> {
        vec![self.span.as_range()]
    }
}

impl fmt::Display for RandomControlDependentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "RandomControlDependentWarning: the random variable at bytes {} is control dependent on:",
            self.span
        )?;
        for (_, span) in &self.dependencies {
            writeln!(f, "        the random variable at bytes {}", span)?;
        }
        write!(
            f,
            "    Random control dependencies may cause discontinuities in the posterior distribution, which are challenging for HMC/NUTS."
        )
    }
}

/// A discrete latent variable (not supported by HMC/NUTS)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteSampleWarning {
    pub node: NodeId,
    pub span: Span,
    pub distribution: String,
}

impl DiscreteSampleWarning {
    pub fn diagnostic_ranges(&self) -> Vec<(u32, u32)> {
        vec![self.span.as_range()]
    }
}

impl fmt::Display for DiscreteSampleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DiscreteDistributionWarning: the {} distribution at bytes {} is discrete, which is not supported by HMC/NUTS.",
            self.distribution, self.span
        )
    }
}

/// Union of the HMC-assumption diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HmcWarning {
    RandomControl(RandomControlDependentWarning),
    DiscreteSample(DiscreteSampleWarning),
}

impl HmcWarning {
    pub fn diagnostic_ranges(&self) -> Vec<(u32, u32)> {
        match self {
            HmcWarning::RandomControl(w) => w.diagnostic_ranges(),
            HmcWarning::DiscreteSample(w) => w.diagnostic_ranges(),
        }
    }
}

impl fmt::Display for HmcWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HmcWarning::RandomControl(w) => w.fmt(f),
            HmcWarning::DiscreteSample(w) => w.fmt(f),
        }
    }
}

/// Sample nodes that control whether `target` executes
pub fn random_control_dependencies(ir: &ProgramIr, target: NodeId) -> Result<Vec<NodeId>> {
    let mut dependencies: Vec<NodeId> = Vec::new();
    let mut marked: FxHashSet<(NodeId, bool)> = FxHashSet::default();
    let empty = Expr::constant(0i64, Span::zero());

    let mut queue: VecDeque<(NodeId, &Expr, bool)> = VecDeque::new();
    match &ir.node(target).kind {
        NodeKind::Sample { address, value, .. } => {
            queue.push_back((target, address, false));
            queue.push_back((target, value, false));
        }
        NodeKind::Factor { value, .. } => {
            queue.push_back((target, value, false));
        }
        _ => return Ok(dependencies),
    }

    while let Some((node, expr, is_control)) = queue.pop_front() {
        for dep in data_deps_for_expr(ir, node, expr)? {
            if marked.contains(&(dep, is_control)) {
                continue;
            }
            let dep_node = ir.node(dep);
            match &dep_node.kind {
                NodeKind::Sample { address, .. } => {
                    // a random variable stops the recursion; record it when
                    // we got here through control flow
                    if is_control {
                        dependencies.push(dep);
                    }
                    queue.push_back((dep, address, is_control));
                }
                _ => {
                    queue.push_back((dep, dep_node.value_expr().unwrap_or(&empty), is_control));
                    if let Some(index) = dep_node.target().and_then(|t| t.index_expr()) {
                        queue.push_back((dep, index, is_control));
                    }
                }
            }
            marked.insert((dep, is_control));
        }

        for control_dep in control_deps_for_node(ir, node, expr)? {
            if marked.contains(&(control_dep, true)) {
                continue;
            }
            if let NodeKind::Branch { test, .. } = &ir.node(control_dep).kind {
                queue.push_back((control_dep, test, true));
                marked.insert((control_dep, true));
            }
        }
    }
    Ok(dependencies)
}

/// Random-control-flow detection over every sample/factor node
pub fn check_random_control_flow(ir: &ProgramIr) -> Result<Vec<RandomControlDependentWarning>> {
    let mut warnings = Vec::new();
    for node in ir.random_nodes() {
        let dependencies = random_control_dependencies(ir, node)?;
        if !dependencies.is_empty() {
            warnings.push(RandomControlDependentWarning {
                node,
                span: ir.node(node).span,
                dependencies: dependencies
                    .into_iter()
                    .map(|dep| (dep, ir.node(dep).span))
                    .collect(),
            });
        }
    }
    Ok(warnings)
}

/// The full HMC-assumption check: discrete latents plus random control flow
pub fn check_hmc_assumptions(ir: &ProgramIr) -> Result<Vec<HmcWarning>> {
    let mut warnings = Vec::new();
    for node in ir.sample_nodes() {
        let Some(dist) = ir.node(node).distribution() else {
            continue;
        };
        if let Some(properties) = distribution_properties(&dist.name) {
            if properties.is_discrete() {
                warnings.push(HmcWarning::DiscreteSample(DiscreteSampleWarning {
                    node,
                    span: ir.node(node).span,
                    distribution: dist.name.clone(),
                }));
            }
        }
    }
    for warning in check_random_control_flow(ir)? {
        warnings.push(HmcWarning::RandomControl(warning));
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::*;

    fn state_controls_obs() -> crate::features::program::domain::ProgramIr {
        // state ~ Bernoulli(0.5); if state == 1: mu = 5 else: mu = 6;
        // obs ~ Normal(mu, 1)
        build(vec![
            sample("state", dist("Bernoulli", vec![("p", cf(0.5))])),
            if_else(
                op("==", vec![v("state"), ci(1)]),
                vec![assign("mu", cf(5.0))],
                vec![assign("mu", cf(6.0))],
            ),
            sample(
                "obs",
                dist("Normal", vec![("location", v("mu")), ("scale", cf(1.0))]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_discrete_control_of_continuous_draw() {
        let ir = state_controls_obs();
        let warnings = check_random_control_flow(&ir).unwrap();
        assert_eq!(warnings.len(), 1);

        let samples = ir.sample_nodes();
        let state = samples[0];
        let obs = samples[1];
        assert_eq!(warnings[0].node, obs);
        assert_eq!(
            warnings[0].dependencies.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
            vec![state]
        );
    }

    #[test]
    fn test_data_dependency_alone_is_quiet() {
        // y depends on x through data flow only
        let ir = build(vec![
            sample("x", dist("Normal", vec![("location", cf(0.0)), ("scale", cf(1.0))])),
            sample(
                "y",
                dist("Normal", vec![("location", v("x")), ("scale", cf(1.0))]),
            ),
        ])
        .unwrap();
        assert!(check_random_control_flow(&ir).unwrap().is_empty());
    }

    #[test]
    fn test_hmc_assumptions_report_discrete_latents() {
        let ir = state_controls_obs();
        let warnings = check_hmc_assumptions(&ir).unwrap();
        let discrete: Vec<_> = warnings
            .iter()
            .filter(|w| matches!(w, HmcWarning::DiscreteSample(_)))
            .collect();
        let control: Vec<_> = warnings
            .iter()
            .filter(|w| matches!(w, HmcWarning::RandomControl(_)))
            .collect();
        assert_eq!(discrete.len(), 1);
        assert_eq!(control.len(), 1);
    }

    #[test]
    fn test_factor_under_random_branch() {
        // the observation itself sits under stochastic control
        let ir = build(vec![
            sample("flip", dist("Bernoulli", vec![("p", cf(0.5))])),
            if_else(
                op("==", vec![v("flip"), ci(1)]),
                vec![observe(dist(
                    "Normal",
                    vec![("location", cf(0.0)), ("scale", cf(1.0))],
                ))],
                vec![],
            ),
        ])
        .unwrap();
        let warnings = check_random_control_flow(&ir).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].node, ir.factor_nodes()[0]);
    }
}
