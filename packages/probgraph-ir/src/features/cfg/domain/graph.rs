//! Node arena, edge primitives, reachability and the CFG verifier
//!
//! The arena owns every node of every CFG in a program. Edges are kept in
//! both directions; reachability walks parent edges with an explicit stack so
//! adversarial inputs cannot overflow the native stack.

use super::node::{CfgNode, NodeId, NodeKind};
use crate::errors::{AnalyzerError, Result};
use crate::shared::models::Span;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// Arena of CFG nodes with bidirectional edges
#[derive(Debug, Default)]
pub struct CfgArena {
    nodes: Vec<CfgNode>,
}

impl CfgArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(CfgNode::new(id, kind, span));
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &CfgNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut CfgNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> {
        self.nodes.iter()
    }

    /// Insert the edge `from -> to` (multiedges collapse, sets on both ends)
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.node_mut(from).children.insert(to);
        self.node_mut(to).parents.insert(from);
    }

    pub fn delete_edge(&mut self, from: NodeId, to: NodeId) {
        self.node_mut(from).children.remove(&to);
        self.node_mut(to).parents.remove(&from);
    }

    /// The single child of a node; an error when the arity is off
    pub fn only_child(&self, id: NodeId) -> Result<NodeId> {
        let children = &self.node(id).children;
        if children.len() != 1 {
            return Err(AnalyzerError::malformed_cfg(format!(
                "{} expected exactly one child, has {}",
                self.node(id),
                children.len()
            )));
        }
        Ok(*children.iter().next().expect("checked length"))
    }

    /// The single parent of a node; an error when the arity is off
    pub fn only_parent(&self, id: NodeId) -> Result<NodeId> {
        let parents = &self.node(id).parents;
        if parents.len() != 1 {
            return Err(AnalyzerError::malformed_cfg(format!(
                "{} expected exactly one parent, has {}",
                self.node(id),
                parents.len()
            )));
        }
        Ok(*parents.iter().next().expect("checked length"))
    }

    pub fn block(&self, id: NodeId) {
        self.node(id).blocked.set(true);
    }

    pub fn unblock(&self, id: NodeId) {
        self.node(id).blocked.set(false);
    }

    pub fn is_blocked(&self, id: NodeId) -> bool {
        self.node(id).blocked.get()
    }

    /// True iff `start` lies upstream of `end`: depth-first traversal of
    /// parent edges from `end`, not expanding past blocked nodes.
    pub fn is_reachable(&self, start: NodeId, end: NodeId) -> bool {
        if start == end {
            return true;
        }
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut stack = vec![end];
        visited.insert(end);
        while let Some(current) = stack.pop() {
            for &parent in &self.node(current).parents {
                if visited.contains(&parent) {
                    continue;
                }
                visited.insert(parent);
                // a blocked node terminates the walk but still counts as seen
                if !self.is_blocked(parent) {
                    stack.push(parent);
                }
            }
        }
        visited.contains(&start)
    }

    /// Branch accessors; errors on non-branch nodes
    pub fn branch_test(&self, id: NodeId) -> Result<&crate::shared::models::Expr> {
        match &self.node(id).kind {
            NodeKind::Branch { test, .. } => Ok(test),
            _ => Err(AnalyzerError::malformed_cfg(format!(
                "{} is not a Branch",
                self.node(id)
            ))),
        }
    }

    pub fn branch_successors(&self, id: NodeId) -> Result<(NodeId, NodeId)> {
        match &self.node(id).kind {
            NodeKind::Branch { then, orelse, .. } => {
                let then = then.ok_or_else(|| {
                    AnalyzerError::malformed_cfg(format!("then not set for {}", self.node(id)))
                })?;
                let orelse = orelse.ok_or_else(|| {
                    AnalyzerError::malformed_cfg(format!("orelse not set for {}", self.node(id)))
                })?;
                Ok((then, orelse))
            }
            _ => Err(AnalyzerError::malformed_cfg(format!(
                "{} is not a Branch",
                self.node(id)
            ))),
        }
    }
}

/// One CFG: start/end sentinels plus the interior node set
#[derive(Debug, Clone)]
pub struct Cfg {
    pub start: NodeId,
    pub nodes: BTreeSet<NodeId>,
    pub end: NodeId,
}

impl Cfg {
    pub fn new(start: NodeId, nodes: BTreeSet<NodeId>, end: NodeId) -> Self {
        Self { start, nodes, end }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.start == id || self.end == id || self.nodes.contains(&id)
    }
}

/// Check the structural invariants of a completed CFG.
///
/// A failure here is a builder bug, never a property of the input program.
pub fn verify_cfg(arena: &CfgArena, cfg: &Cfg) -> Result<()> {
    let start = arena.node(cfg.start);
    if !matches!(start.kind, NodeKind::Start | NodeKind::FuncStart { .. }) {
        return Err(AnalyzerError::malformed_cfg(format!(
            "start node has wrong kind: {}",
            start
        )));
    }
    let end = arena.node(cfg.end);
    if !matches!(end.kind, NodeKind::End) {
        return Err(AnalyzerError::malformed_cfg(format!(
            "end node has wrong kind: {}",
            end
        )));
    }
    if !start.parents.is_empty() || start.children.len() != 1 {
        return Err(AnalyzerError::malformed_cfg(format!(
            "start node has wrong arity: {} parents / {} children",
            start.parents.len(),
            start.children.len()
        )));
    }
    if end.parents.len() != 1 || !end.children.is_empty() {
        return Err(AnalyzerError::malformed_cfg(format!(
            "end node has wrong arity: {} parents / {} children",
            end.parents.len(),
            end.children.len()
        )));
    }

    for &id in &cfg.nodes {
        let node = arena.node(id);
        for &parent in &node.parents {
            if !arena.node(parent).children.contains(&id) {
                return Err(AnalyzerError::malformed_cfg(format!(
                    "{} is a parent of {}, but the child edge is missing",
                    arena.node(parent),
                    node
                )));
            }
        }
        for &child in &node.children {
            if !arena.node(child).parents.contains(&id) {
                return Err(AnalyzerError::malformed_cfg(format!(
                    "{} is a child of {}, but the parent edge is missing",
                    arena.node(child),
                    node
                )));
            }
        }

        match &node.kind {
            NodeKind::Branch { then, orelse, .. } => {
                if node.parents.len() != 1 || node.children.is_empty() {
                    return Err(AnalyzerError::malformed_cfg(format!(
                        "{} has wrong arity: {} parents / {} children",
                        node,
                        node.parents.len(),
                        node.children.len()
                    )));
                }
                if then.is_none() {
                    return Err(AnalyzerError::malformed_cfg(format!(
                        "then branch not set for {}",
                        node
                    )));
                }
                if orelse.is_none() {
                    return Err(AnalyzerError::malformed_cfg(format!(
                        "else branch not set for {}",
                        node
                    )));
                }
            }
            NodeKind::Join => {
                if node.children.len() != 1 || node.parents.is_empty() {
                    return Err(AnalyzerError::malformed_cfg(format!(
                        "{} has wrong arity: {} parents / {} children",
                        node,
                        node.parents.len(),
                        node.children.len()
                    )));
                }
            }
            _ => {
                if node.parents.len() != 1 || node.children.len() != 1 {
                    return Err(AnalyzerError::malformed_cfg(format!(
                        "{} has wrong arity: {} parents / {} children",
                        node,
                        node.parents.len(),
                        node.children.len()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Graphviz rendering of a CFG, for debugging builder output
pub fn cfg_dot(arena: &CfgArena, cfg: &Cfg, draw_branch_join_pairs: bool) -> String {
    let mut s = String::from("digraph CFG {\nnode [shape=box];\n");
    let all = std::iter::once(cfg.start)
        .chain(cfg.nodes.iter().copied())
        .chain(std::iter::once(cfg.end));
    for id in all {
        let node = arena.node(id);
        for &child in &node.children {
            let from = node.to_string().replace('"', "\\\"");
            let to = arena.node(child).to_string().replace('"', "\\\"");
            s.push_str(&format!("\"{}\" -> \"{}\"\n", from, to));
        }
    }
    if draw_branch_join_pairs {
        for &id in &cfg.nodes {
            if let NodeKind::Branch { join_nodes, .. } = &arena.node(id).kind {
                for &join in join_nodes {
                    let from = arena.node(id).to_string().replace('"', "\\\"");
                    let to = arena.node(join).to_string().replace('"', "\\\"");
                    s.push_str(&format!(
                        "\"{}\" -> \"{}\" [dir=none, color=red]\n",
                        from, to
                    ));
                }
            }
        }
    }
    s.push('}');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(arena: &mut CfgArena, kinds: Vec<NodeKind>) -> Vec<NodeId> {
        let ids: Vec<NodeId> = kinds
            .into_iter()
            .map(|k| arena.alloc(k, Span::zero()))
            .collect();
        for pair in ids.windows(2) {
            arena.add_edge(pair[0], pair[1]);
        }
        ids
    }

    #[test]
    fn test_add_delete_edge_bidirectional() {
        let mut arena = CfgArena::new();
        let a = arena.alloc(NodeKind::Start, Span::zero());
        let b = arena.alloc(NodeKind::End, Span::zero());
        arena.add_edge(a, b);
        assert!(arena.node(a).children.contains(&b));
        assert!(arena.node(b).parents.contains(&a));
        arena.delete_edge(a, b);
        assert!(arena.node(a).children.is_empty());
        assert!(arena.node(b).parents.is_empty());
    }

    #[test]
    fn test_reachable_chain() {
        let mut arena = CfgArena::new();
        let ids = chain(
            &mut arena,
            vec![NodeKind::Start, NodeKind::Skip, NodeKind::End],
        );
        assert!(arena.is_reachable(ids[0], ids[2]));
        assert!(!arena.is_reachable(ids[2], ids[0]));
        assert!(arena.is_reachable(ids[1], ids[1]));
    }

    #[test]
    fn test_reachable_respects_blocking() {
        let mut arena = CfgArena::new();
        let ids = chain(
            &mut arena,
            vec![NodeKind::Start, NodeKind::Skip, NodeKind::Skip, NodeKind::End],
        );
        assert!(arena.is_reachable(ids[0], ids[3]));
        arena.block(ids[1]);
        // the walk stops at the blocked node: start is no longer seen
        assert!(!arena.is_reachable(ids[0], ids[3]));
        // the blocked node itself still counts as visited
        assert!(arena.is_reachable(ids[1], ids[3]));
        arena.unblock(ids[1]);
        assert!(arena.is_reachable(ids[0], ids[3]));
    }

    #[test]
    fn test_reachable_terminates_on_cycles() {
        let mut arena = CfgArena::new();
        let a = arena.alloc(NodeKind::Skip, Span::zero());
        let b = arena.alloc(NodeKind::Skip, Span::zero());
        let c = arena.alloc(NodeKind::Skip, Span::zero());
        arena.add_edge(a, b);
        arena.add_edge(b, a);
        arena.add_edge(b, c);
        assert!(arena.is_reachable(a, c));
        assert!(arena.is_reachable(b, c));
    }

    #[test]
    fn test_verify_rejects_dangling_arity() {
        let mut arena = CfgArena::new();
        let start = arena.alloc(NodeKind::Start, Span::zero());
        let skip = arena.alloc(NodeKind::Skip, Span::zero());
        let end = arena.alloc(NodeKind::End, Span::zero());
        arena.add_edge(start, skip);
        // missing skip -> end edge
        let cfg = Cfg::new(start, BTreeSet::from([skip]), end);
        assert!(verify_cfg(&arena, &cfg).is_err());
        arena.add_edge(skip, end);
        assert!(verify_cfg(&arena, &cfg).is_ok());
    }

    #[test]
    fn test_dot_renders_edges() {
        let mut arena = CfgArena::new();
        let ids = chain(
            &mut arena,
            vec![NodeKind::Start, NodeKind::Skip, NodeKind::End],
        );
        let cfg = Cfg::new(ids[0], BTreeSet::from([ids[1]]), ids[2]);
        let dot = cfg_dot(&arena, &cfg, false);
        assert!(dot.starts_with("digraph CFG"));
        assert!(dot.contains("Start(n0)"));
        assert!(dot.contains("->"));
    }
}
