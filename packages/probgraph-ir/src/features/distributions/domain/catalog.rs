//! Static distribution property catalog
//!
//! Maps each supported distribution name to its per-parameter constraints,
//! support constraint and classification. Entries are immutable; lookups
//! hand out clones so parameter-dependent bound resolution never touches the
//! table itself.

use super::constraint::{Bound, Constraint};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionType {
    Continuous,
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimensionality {
    Univariate,
    Multivariate,
}

/// Catalog row for one distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionProperties {
    pub name: String,
    pub param_constraints: BTreeMap<String, Constraint>,
    pub support: Constraint,
    pub ty: DistributionType,
    pub dimensionality: Dimensionality,
}

impl DistributionProperties {
    pub fn is_discrete(&self) -> bool {
        self.ty == DistributionType::Discrete
    }

    pub fn is_continuous(&self) -> bool {
        self.ty == DistributionType::Continuous
    }

    pub fn is_univariate(&self) -> bool {
        self.dimensionality == Dimensionality::Univariate
    }

    pub fn is_multivariate(&self) -> bool {
        self.dimensionality == Dimensionality::Multivariate
    }

    /// Support plus every parameter constraint is interval-shaped
    pub fn is_fully_interval_constrained(&self) -> bool {
        self.support.is_interval_constraint()
            && self
                .param_constraints
                .values()
                .all(|c| c.is_interval_constraint())
    }
}

fn row(
    name: &str,
    params: Vec<(&str, Constraint)>,
    support: Constraint,
    ty: DistributionType,
    dimensionality: Dimensionality,
) -> (String, DistributionProperties) {
    (
        name.to_string(),
        DistributionProperties {
            name: name.to_string(),
            param_constraints: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            support,
            ty,
            dimensionality,
        },
    )
}

static CATALOG: Lazy<BTreeMap<String, DistributionProperties>> = Lazy::new(|| {
    use Constraint::*;
    use Dimensionality::{Multivariate, Univariate};
    use DistributionType::{Continuous, Discrete};

    let gt0 = || GreaterThan(Bound::Value(0.0));
    let ge0 = || GreaterEqThan(Bound::Value(0.0));
    let unit = || Constraint::real_interval(0.0, 1.0);
    let dep = |p: &str| Bound::Param(p.to_string());

    BTreeMap::from([
        row(
            "Beta",
            vec![("alpha", gt0()), ("beta", gt0())],
            unit(),
            Continuous,
            Univariate,
        ),
        row(
            "Cauchy",
            vec![("location", Real), ("scale", gt0())],
            Real,
            Continuous,
            Univariate,
        ),
        row("HalfCauchy", vec![("scale", gt0())], gt0(), Continuous, Univariate),
        row(
            "LogNormal",
            vec![("location", Real), ("scale", gt0())],
            Real,
            Continuous,
            Univariate,
        ),
        row(
            "Normal",
            vec![("location", Real), ("scale", gt0()), ("precision", gt0())],
            Real,
            Continuous,
            Univariate,
        ),
        row("HalfNormal", vec![("scale", gt0())], gt0(), Continuous, Univariate),
        row("HalfFlat", vec![], gt0(), Continuous, Univariate),
        row(
            "ChiSquared",
            vec![("df", DiscreteGreaterEqThan(Bound::Value(1.0)))],
            ge0(),
            Continuous,
            Univariate,
        ),
        row(
            "Exponential",
            vec![("scale", gt0()), ("rate", gt0())],
            ge0(),
            Continuous,
            Univariate,
        ),
        row(
            "Gamma",
            vec![("shape", gt0()), ("scale", gt0()), ("rate", gt0())],
            gt0(),
            Continuous,
            Univariate,
        ),
        row(
            "InverseGamma",
            vec![("shape", gt0()), ("scale", gt0()), ("rate", gt0())],
            gt0(),
            Continuous,
            Univariate,
        ),
        row(
            "StudentT",
            vec![("df", gt0()), ("location", Real), ("scale", gt0())],
            Real,
            Continuous,
            Univariate,
        ),
        row(
            "Triangular",
            // c is the mode
            vec![("a", Real), ("b", Real), ("c", Real)],
            Constraint::RealInterval {
                low: dep("a"),
                high: dep("b"),
            },
            Continuous,
            Univariate,
        ),
        row(
            "Uniform",
            vec![("a", Real), ("b", Real)],
            Constraint::RealInterval {
                low: dep("a"),
                high: dep("b"),
            },
            Continuous,
            Univariate,
        ),
        row(
            "DiscreteUniform",
            vec![("a", Integer), ("b", Integer)],
            Constraint::DiscreteInterval {
                low: dep("a"),
                high: dep("b"),
            },
            Discrete,
            Univariate,
        ),
        row(
            "Bernoulli",
            vec![("p", unit())],
            Constraint::discrete_interval(0.0, 1.0),
            Discrete,
            Univariate,
        ),
        row(
            "Categorical",
            vec![("p", Simplex)],
            // over-approximate: the exact support 0..len(p)-1 is not expressible
            Constraint::discrete_interval(0.0, f64::INFINITY),
            Discrete,
            Univariate,
        ),
        row(
            "Geometric",
            vec![("p", unit())],
            DiscreteGreaterEqThan(Bound::Value(0.0)),
            Discrete,
            Univariate,
        ),
        row(
            "Binomial",
            vec![("p", unit()), ("n", DiscreteGreaterEqThan(Bound::Value(0.0)))],
            Constraint::DiscreteInterval {
                low: Bound::Value(0.0),
                high: dep("n"),
            },
            Discrete,
            Univariate,
        ),
        row(
            "Dirac",
            vec![("location", Real)],
            Constraint::DiscreteInterval {
                low: dep("location"),
                high: dep("location"),
            },
            Discrete,
            Univariate,
        ),
        row(
            "Deterministic",
            vec![("location", Real)],
            Constraint::DiscreteInterval {
                low: dep("location"),
                high: dep("location"),
            },
            Discrete,
            Univariate,
        ),
        row(
            "Poisson",
            vec![("rate", ge0())],
            DiscreteGreaterEqThan(Bound::Value(0.0)),
            Discrete,
            Univariate,
        ),
        row(
            "Multinomial",
            vec![("n", DiscreteGreaterEqThan(Bound::Value(1.0))), ("p", Simplex)],
            Constraint::DiscreteInterval {
                low: Bound::Value(0.0),
                high: dep("n"),
            },
            Discrete,
            Univariate,
        ),
        row(
            "MultivariateNormal",
            vec![
                ("location", Real),
                ("covariance", PositiveDefinite),
                ("precision", PositiveDefinite),
            ],
            Vector,
            Continuous,
            Multivariate,
        ),
        row("Dirichlet", vec![("alpha", gt0())], Simplex, Continuous, Multivariate),
        row(
            "Wishart",
            vec![("df", gt0()), ("scale", PositiveDefinite)],
            Matrix,
            Continuous,
            Multivariate,
        ),
        row(
            "InverseWishart",
            vec![("df", gt0()), ("scale", PositiveDefinite)],
            Matrix,
            Continuous,
            Multivariate,
        ),
        row(
            "LKJCholesky",
            vec![
                ("size", DiscreteGreaterEqThan(Bound::Value(1.0))),
                ("shape", gt0()),
            ],
            Matrix,
            Continuous,
            Multivariate,
        ),
        row(
            "TruncatedNormal",
            vec![
                ("location", Real),
                ("scale", gt0()),
                ("lower", Real),
                ("upper", Real),
            ],
            Constraint::RealInterval {
                low: dep("lower"),
                high: dep("upper"),
            },
            Continuous,
            Univariate,
        ),
        row(
            "NegativeBinomial",
            vec![("r", gt0()), ("p", unit())],
            Constraint::discrete_interval(0.0, f64::INFINITY),
            Discrete,
            Univariate,
        ),
        row(
            "OrderedLogistic",
            vec![("eta", Real), ("c", Ordered)],
            // over-approximates 1..len(c)+1
            Constraint::discrete_interval(0.0, f64::INFINITY),
            Discrete,
            Univariate,
        ),
        row("ImproperUniform", vec![], Real, Continuous, Univariate),
        row(
            // left open
            "ImproperUniformLO",
            vec![("upper", Real)],
            Constraint::RealInterval {
                low: Bound::Value(f64::NEG_INFINITY),
                high: dep("upper"),
            },
            Continuous,
            Univariate,
        ),
        row(
            // right open
            "ImproperUniformRO",
            vec![("lower", Real)],
            Constraint::RealInterval {
                low: dep("lower"),
                high: Bound::Value(f64::INFINITY),
            },
            Continuous,
            Univariate,
        ),
        row(
            "Laplace",
            vec![("location", Real), ("scale", gt0())],
            Real,
            Continuous,
            Univariate,
        ),
        row(
            "NormalGLM",
            vec![
                ("data", Real),
                ("slope", Real),
                ("intercept", Real),
                ("sigma", gt0()),
            ],
            Real,
            Continuous,
            Univariate,
        ),
        row(
            "Logistic",
            vec![("location", Real), ("scale", gt0())],
            Real,
            Continuous,
            Univariate,
        ),
    ])
});

/// Look up a distribution by name, returning a private copy.
///
/// Unknown names return `None`; callers treat that as "analysis not
/// applicable" for the node in question.
pub fn distribution_properties(name: &str) -> Option<DistributionProperties> {
    CATALOG.get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Interval;

    #[test]
    fn test_lookup_known_distribution() {
        let normal = distribution_properties("Normal").unwrap();
        assert!(normal.is_continuous());
        assert!(normal.is_univariate());
        assert_eq!(normal.support.to_interval(), Some(Interval::top()));
        assert_eq!(
            normal.param_constraints.get("scale").unwrap().to_interval(),
            Some(Interval::positive())
        );
    }

    #[test]
    fn test_lookup_unknown_returns_none() {
        assert!(distribution_properties("Unknown-Foo").is_none());
        assert!(distribution_properties("").is_none());
    }

    #[test]
    fn test_lookup_returns_copies() {
        let mut first = distribution_properties("Uniform").unwrap();
        first.support.set_low(-2.0);
        first.support.set_high(2.0);
        let second = distribution_properties("Uniform").unwrap();
        // the catalog entry is untouched by resolution on the copy
        assert_eq!(second.support.to_interval(), None);
        assert!(second.support.low().unwrap().param().is_some());
    }

    #[test]
    fn test_geometric_probability_constraint() {
        let geometric = distribution_properties("Geometric").unwrap();
        assert!(geometric.is_discrete());
        assert_eq!(
            geometric.param_constraints.get("p").unwrap().to_interval(),
            Some(Interval::unit())
        );
        assert_eq!(
            geometric.support.to_interval(),
            Some(Interval::positive())
        );
    }

    #[test]
    fn test_categorical_not_fully_interval_constrained() {
        let categorical = distribution_properties("Categorical").unwrap();
        assert!(!categorical.is_fully_interval_constrained());
        let bernoulli = distribution_properties("Bernoulli").unwrap();
        assert!(bernoulli.is_fully_interval_constrained());
    }
}
