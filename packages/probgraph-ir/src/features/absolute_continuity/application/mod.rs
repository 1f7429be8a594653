//! Absolute-continuity application services

pub mod checker;

pub use checker::{check_ac, check_ac_guide, validate_guide, AcOutcome};
