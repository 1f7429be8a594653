//! Constraint verification domain models

pub mod violation;

pub use violation::{ConstraintVerificationResult, ConstraintViolation};
