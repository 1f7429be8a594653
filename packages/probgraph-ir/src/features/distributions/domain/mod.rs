//! Distribution catalog domain models

pub mod canonicalize;
pub mod catalog;
pub mod constraint;

pub use canonicalize::parse_distribution;
pub use catalog::{
    distribution_properties, Dimensionality, DistributionProperties, DistributionType,
};
pub use constraint::{Bound, Constraint};
