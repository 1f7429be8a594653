//! Constraint verification application services

pub mod verifier;

pub use verifier::verify_constraints;
