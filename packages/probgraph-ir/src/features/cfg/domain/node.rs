//! CFG node types
//!
//! Nodes live in an arena and reference each other by dense integer ids in
//! construction order. Parent and child edges are kept on both endpoints so
//! the dependency engine can walk upward.

use crate::shared::models::{AssignTarget, Distribution, Expr, Span};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeSet;
use std::fmt;

/// Arena index of a CFG node (construction order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Tagged node variants
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// CFG entry sentinel
    Start,
    /// Function entry sentinel, carries the rendered signature
    FuncStart { signature: String },
    /// CFG exit sentinel
    End,
    /// Explicit no-op (empty branch arm, empty body)
    Skip,
    /// Ordinary `x = e`
    Assign { target: AssignTarget, value: Expr },
    /// Random draw `x ~ D(...)`
    Sample {
        target: AssignTarget,
        /// Trace address of the draw (the name its value is recorded under)
        name: String,
        address: Expr,
        dist: Distribution,
        value: Expr,
    },
    /// Log-density contribution (observation / `target +=`)
    Factor { value: Expr, dist: Option<Distribution> },
    /// For-loop induction binding
    LoopIter { target: AssignTarget, iter: Expr },
    /// Function parameter binding
    FuncArg {
        target: AssignTarget,
        default: Option<Expr>,
        name: String,
        index: usize,
    },
    /// if / while / for test
    Branch {
        test: Expr,
        then: Option<NodeId>,
        orelse: Option<NodeId>,
        /// Every Join some control edge from this Branch can flow to,
        /// including Joins reached via break/continue/return
        join_nodes: BTreeSet<NodeId>,
    },
    /// Control-flow merge
    Join,
    Return { value: Option<Expr> },
    Break,
    Continue,
    /// Expression statement
    Expr { value: Expr },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::FuncStart { .. } => "FuncStart",
            NodeKind::End => "End",
            NodeKind::Skip => "Skip",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Sample { .. } => "Sample",
            NodeKind::Factor { .. } => "Factor",
            NodeKind::LoopIter { .. } => "LoopIter",
            NodeKind::FuncArg { .. } => "FuncArg",
            NodeKind::Branch { .. } => "Branch",
            NodeKind::Join => "Join",
            NodeKind::Return { .. } => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Expr { .. } => "Expr",
        }
    }
}

/// A node plus its bidirectional edge sets and the scratch blocked flag
#[derive(Debug)]
pub struct CfgNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub span: Span,
    pub parents: BTreeSet<NodeId>,
    pub children: BTreeSet<NodeId>,
    /// Scratch bit for reachability-under-blocking queries; every query that
    /// sets it clears it before returning
    pub(crate) blocked: Cell<bool>,
}

impl CfgNode {
    pub fn new(id: NodeId, kind: NodeKind, span: Span) -> Self {
        Self {
            id,
            kind,
            span,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            blocked: Cell::new(false),
        }
    }

    /// Assignment-like nodes: the writes the RD algorithm can stop at
    pub fn is_assign_like(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Assign { .. }
                | NodeKind::Sample { .. }
                | NodeKind::LoopIter { .. }
                | NodeKind::FuncArg { .. }
        )
    }

    pub fn is_sample(&self) -> bool {
        matches!(self.kind, NodeKind::Sample { .. })
    }

    pub fn is_factor(&self) -> bool {
        matches!(self.kind, NodeKind::Factor { .. })
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::Branch { .. })
    }

    pub fn is_join(&self) -> bool {
        matches!(self.kind, NodeKind::Join)
    }

    pub fn target(&self) -> Option<&AssignTarget> {
        match &self.kind {
            NodeKind::Assign { target, .. }
            | NodeKind::Sample { target, .. }
            | NodeKind::LoopIter { target, .. }
            | NodeKind::FuncArg { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Right-hand side of an assignment-like node: the expression whose value
    /// the target receives
    pub fn value_expr(&self) -> Option<&Expr> {
        match &self.kind {
            NodeKind::Assign { value, .. } | NodeKind::Sample { value, .. } => Some(value),
            NodeKind::LoopIter { iter, .. } => Some(iter),
            NodeKind::FuncArg { default, .. } => default.as_ref(),
            _ => None,
        }
    }

    /// The expression searched for function calls at this node
    pub fn primary_expr(&self) -> Option<&Expr> {
        match &self.kind {
            NodeKind::Assign { value, .. } | NodeKind::Sample { value, .. } => Some(value),
            NodeKind::LoopIter { iter, .. } => Some(iter),
            NodeKind::FuncArg { default, .. } => default.as_ref(),
            NodeKind::Branch { test, .. } => Some(test),
            NodeKind::Return { value } => value.as_ref(),
            NodeKind::Factor { value, .. } | NodeKind::Expr { value } => Some(value),
            _ => None,
        }
    }

    pub fn distribution(&self) -> Option<&Distribution> {
        match &self.kind {
            NodeKind::Sample { dist, .. } => Some(dist),
            NodeKind::Factor { dist, .. } => dist.as_ref(),
            _ => None,
        }
    }

    /// Trace address of a sample node, used to name its SMT symbol
    pub fn symbolic_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Sample { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for CfgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Assign { target, value } => {
                write!(f, "Assign({} = {}, {})", target, value, self.id)
            }
            NodeKind::Sample { target, value, .. } => {
                write!(f, "Sample({} = {}, {})", target, value, self.id)
            }
            NodeKind::Factor { value, .. } => write!(f, "Factor({}, {})", value, self.id),
            NodeKind::LoopIter { target, iter } => {
                write!(f, "LoopIter({} in {}, {})", target, iter, self.id)
            }
            NodeKind::FuncArg { name, index, .. } => {
                write!(f, "FuncArg({}#{}, {})", name, index, self.id)
            }
            NodeKind::Branch { test, .. } => write!(f, "Branch({}, {})", test, self.id),
            NodeKind::Return { value: Some(v) } => write!(f, "Return({}, {})", v, self.id),
            NodeKind::FuncStart { signature } => {
                write!(f, "FuncStart({}, {})", signature, self.id)
            }
            NodeKind::Expr { value } => write!(f, "Expr({}, {})", value, self.id),
            other => write!(f, "{}({})", other.name(), self.id),
        }
    }
}
