//! Absolute-continuity domain models

pub mod violation;

pub use violation::{AcWarning, GlobalAbsoluteContinuityViolation};
