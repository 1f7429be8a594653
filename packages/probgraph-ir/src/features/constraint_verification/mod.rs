//! Distribution-parameter constraint verification

pub mod application;
pub mod domain;

pub use application::verify_constraints;
pub use domain::{ConstraintVerificationResult, ConstraintViolation};
