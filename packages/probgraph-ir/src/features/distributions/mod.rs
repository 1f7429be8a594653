//! Distribution property catalog and constraint types

pub mod domain;

pub use domain::{
    distribution_properties, parse_distribution, Bound, Constraint, Dimensionality,
    DistributionProperties, DistributionType,
};
