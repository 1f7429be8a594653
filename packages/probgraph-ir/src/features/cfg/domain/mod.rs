//! CFG domain models

pub mod graph;
pub mod node;

pub use graph::{cfg_dot, verify_cfg, Cfg, CfgArena};
pub use node::{CfgNode, NodeId, NodeKind};
