//! Control flow graph: node kinds, arena, reachability, verification

pub mod domain;

pub use domain::{cfg_dot, verify_cfg, Cfg, CfgArena, CfgNode, NodeId, NodeKind};
