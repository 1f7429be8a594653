//! Absolute-continuity verification between a model and its guide

pub mod application;
pub mod domain;

pub use application::{check_ac, check_ac_guide, validate_guide, AcOutcome};
pub use domain::{AcWarning, GlobalAbsoluteContinuityViolation};
