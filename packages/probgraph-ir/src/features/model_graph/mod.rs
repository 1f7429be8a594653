//! Model graph export
//!
//! The directed graph of random variables: an edge `a -> b` means the draw at
//! `b` depends (through data flow, possibly across intermediate assignments)
//! on the draw at `a`. Control dependencies are traversed so draws feeding
//! branch tests are reached, but only sample-to-sample data edges are
//! materialized. Shells use this for visualization.

use crate::errors::Result;
use crate::features::cfg::{NodeId, NodeKind};
use crate::features::program::application::dependencies::{
    control_deps_for_node, data_deps_for_expr,
};
use crate::features::program::domain::ProgramIr;
use crate::shared::models::{Expr, Span};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Dependency graph over the program's sample/factor nodes
#[derive(Debug)]
pub struct ModelGraph {
    pub graph: DiGraph<NodeId, ()>,
    /// Every random statement, in node-id order
    pub nodes: Vec<NodeId>,
    /// `(from, to)` pairs mirroring the graph edges
    pub edges: Vec<(NodeId, NodeId)>,
}

/// Build the random-variable dependency graph
pub fn model_graph(ir: &ProgramIr) -> Result<ModelGraph> {
    let random_nodes = ir.random_nodes();
    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
    let empty = Expr::constant(0i64, Span::zero());

    for &target in &random_nodes {
        let mut marked: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<(NodeId, &Expr)> = VecDeque::new();
        match &ir.node(target).kind {
            NodeKind::Sample { address, value, .. } => {
                queue.push_back((target, address));
                queue.push_back((target, value));
            }
            NodeKind::Factor { value, .. } => {
                queue.push_back((target, value));
            }
            _ => continue,
        }

        while let Some((node, expr)) = queue.pop_front() {
            for dep in data_deps_for_expr(ir, node, expr)? {
                if marked.contains(&dep) {
                    continue;
                }
                let dep_node = ir.node(dep);
                match &dep_node.kind {
                    NodeKind::Sample { address, .. } => {
                        edges.push((dep, target));
                        queue.push_back((dep, address));
                    }
                    _ => {
                        queue.push_back((dep, dep_node.value_expr().unwrap_or(&empty)));
                        if let Some(index) = dep_node.target().and_then(|t| t.index_expr()) {
                            queue.push_back((dep, index));
                        }
                    }
                }
                marked.insert(dep);
            }

            for control_dep in control_deps_for_node(ir, node, expr)? {
                if marked.contains(&control_dep) {
                    continue;
                }
                if let NodeKind::Branch { test, .. } = &ir.node(control_dep).kind {
                    queue.push_back((control_dep, test));
                    marked.insert(control_dep);
                }
            }
        }
    }

    let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
    let mut indices: FxHashMap<NodeId, NodeIndex> = FxHashMap::default();
    for &node in &random_nodes {
        indices.insert(node, graph.add_node(node));
    }
    for &(from, to) in &edges {
        if let (Some(&a), Some(&b)) = (indices.get(&from), indices.get(&to)) {
            graph.add_edge(a, b, ());
        }
    }

    Ok(ModelGraph {
        graph,
        nodes: random_nodes,
        edges,
    })
}
