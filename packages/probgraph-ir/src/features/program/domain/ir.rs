//! The IR bundle: every CFG of a lowered program plus model/guide roles
//!
//! Analyses are stateless over this structure; the only mutation after
//! construction is the scratch blocked bit used by reachability queries.

use crate::errors::{AnalyzerError, Result};
use crate::features::cfg::{Cfg, CfgArena, CfgNode, NodeId};
use crate::shared::models::{Expr, Variable};
use rustc_hash::FxHashMap;

/// A built CFG with its function metadata. The toplevel CFG has no name.
#[derive(Debug)]
pub struct FunctionCfg {
    pub name: Option<String>,
    pub signature: String,
    pub scope: u32,
    pub cfg: Cfg,
}

impl FunctionCfg {
    pub fn is_toplevel(&self) -> bool {
        self.name.is_none()
    }
}

/// Mapping from function definition to CFG, plus optional model and guide
/// references.
#[derive(Debug)]
pub struct ProgramIr {
    arena: CfgArena,
    /// index 0 is the toplevel CFG, function CFGs follow in definition order
    cfgs: Vec<FunctionCfg>,
    model: Option<usize>,
    guide: Option<usize>,
    node_cfg: FxHashMap<NodeId, usize>,
}

impl ProgramIr {
    pub fn new(
        arena: CfgArena,
        cfgs: Vec<FunctionCfg>,
        model: Option<usize>,
        guide: Option<usize>,
    ) -> Self {
        let mut node_cfg = FxHashMap::default();
        for (index, function) in cfgs.iter().enumerate() {
            node_cfg.insert(function.cfg.start, index);
            node_cfg.insert(function.cfg.end, index);
            for &id in &function.cfg.nodes {
                node_cfg.insert(id, index);
            }
        }
        Self {
            arena,
            cfgs,
            model,
            guide,
            node_cfg,
        }
    }

    pub fn arena(&self) -> &CfgArena {
        &self.arena
    }

    pub fn node(&self, id: NodeId) -> &CfgNode {
        self.arena.node(id)
    }

    pub fn cfgs(&self) -> impl Iterator<Item = &FunctionCfg> {
        self.cfgs.iter()
    }

    pub fn toplevel(&self) -> &FunctionCfg {
        &self.cfgs[0]
    }

    pub fn model(&self) -> Option<&FunctionCfg> {
        self.model.map(|i| &self.cfgs[i])
    }

    pub fn guide(&self) -> Option<&FunctionCfg> {
        self.guide.map(|i| &self.cfgs[i])
    }

    /// The CFG owning a node
    pub fn cfg_for_node(&self, id: NodeId) -> Result<&FunctionCfg> {
        self.node_cfg
            .get(&id)
            .map(|&i| &self.cfgs[i])
            .ok_or_else(|| {
                AnalyzerError::internal(format!("node {} belongs to no CFG", id))
            })
    }

    /// True when the variable names a user-defined function
    pub fn is_user_defined_function(&self, variable: &Variable) -> bool {
        !variable.is_indexed()
            && self
                .cfgs
                .iter()
                .any(|f| f.name.as_deref() == Some(variable.name.as_str()))
    }

    pub fn user_function_cfg(&self, name: &str) -> Option<&FunctionCfg> {
        self.cfgs.iter().find(|f| f.name.as_deref() == Some(name))
    }

    /// All sample nodes across every CFG, in node-id order
    pub fn sample_nodes(&self) -> Vec<NodeId> {
        self.collect_nodes(|node| node.is_sample())
    }

    /// All factor nodes across every CFG, in node-id order
    pub fn factor_nodes(&self) -> Vec<NodeId> {
        self.collect_nodes(|node| node.is_factor())
    }

    /// Sample nodes followed by factor nodes — the canonical iteration order
    /// of the analyses
    pub fn random_nodes(&self) -> Vec<NodeId> {
        let mut nodes = self.sample_nodes();
        nodes.extend(self.factor_nodes());
        nodes
    }

    fn collect_nodes(&self, keep: impl Fn(&CfgNode) -> bool) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .cfgs
            .iter()
            .flat_map(|f| f.cfg.nodes.iter().copied())
            .filter(|&id| keep(self.arena.node(id)))
            .collect();
        out.sort_unstable();
        out
    }

    /// Return nodes of a CFG, in node-id order
    pub fn return_nodes(&self, cfg: &Cfg) -> Vec<NodeId> {
        cfg.nodes
            .iter()
            .copied()
            .filter(|&id| {
                matches!(
                    self.arena.node(id).kind,
                    crate::features::cfg::NodeKind::Return { .. }
                )
            })
            .collect()
    }

    /// Every call to the named function anywhere in the program, paired with
    /// the node the call occurs in. Ordered by node id.
    pub fn all_function_calls(&self, function_name: &str) -> Vec<(NodeId, &Expr)> {
        let mut out = Vec::new();
        let mut ids: Vec<NodeId> = self
            .cfgs
            .iter()
            .flat_map(|f| f.cfg.nodes.iter().copied())
            .collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(expr) = self.arena.node(id).primary_expr() {
                for call in expr.function_calls(function_name) {
                    out.push((id, call));
                }
            }
        }
        out
    }
}
