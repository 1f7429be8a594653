//! Frontend distribution-name canonicalization
//!
//! Frontends spell distributions in their host API's vocabulary
//! (`Chi2(df=...)`, `Normal(loc=..., scale=...)`); the catalog speaks
//! canonical names and parameter names. This table maps positional and
//! keyword arguments onto catalog parameters; unrecognized distributions are
//! prefixed `Unknown-` and keep their arguments under positional names.

use crate::shared::models::{Distribution, Expr};
use std::collections::BTreeMap;

type Args = Vec<Expr>;
type Kwargs = BTreeMap<String, Expr>;

fn pick(kwargs: &mut Kwargs, key: &str, args: &mut Args, index: usize) -> Option<Expr> {
    if let Some(expr) = kwargs.remove(key) {
        return Some(expr);
    }
    if index < args.len() {
        // arguments are consumed positionally left to right, so the index is
        // relative to the original argument list
        return Some(args[index].clone());
    }
    None
}

fn insert(params: &mut BTreeMap<String, Expr>, name: &str, expr: Option<Expr>) {
    if let Some(expr) = expr {
        params.insert(name.to_string(), expr);
    }
}

/// Map a frontend distribution call onto a catalog [`Distribution`]
pub fn parse_distribution(name: &str, mut args: Args, mut kwargs: Kwargs) -> Distribution {
    let mut params = BTreeMap::new();
    let canonical_name = match name {
        "Bernoulli" | "Geometric" => {
            insert(&mut params, "p", pick(&mut kwargs, "probs", &mut args, 0));
            name
        }
        "Categorical" | "OneHotCategorical" => {
            insert(&mut params, "p", pick(&mut kwargs, "probs", &mut args, 0));
            "Categorical"
        }
        "Beta" => {
            insert(
                &mut params,
                "alpha",
                pick(&mut kwargs, "concentration1", &mut args, 0),
            );
            insert(
                &mut params,
                "beta",
                pick(&mut kwargs, "concentration0", &mut args, 1),
            );
            name
        }
        "Binomial" => {
            insert(&mut params, "n", pick(&mut kwargs, "total_count", &mut args, 0));
            insert(&mut params, "p", pick(&mut kwargs, "probs", &mut args, 1));
            name
        }
        "Cauchy" | "Laplace" | "Logistic" => {
            insert(&mut params, "location", pick(&mut kwargs, "loc", &mut args, 0));
            insert(&mut params, "scale", pick(&mut kwargs, "scale", &mut args, 1));
            name
        }
        "Chi2" | "ChiSquared" => {
            insert(&mut params, "df", pick(&mut kwargs, "df", &mut args, 0));
            "ChiSquared"
        }
        "Dirichlet" => {
            insert(
                &mut params,
                "alpha",
                pick(&mut kwargs, "concentration", &mut args, 0),
            );
            name
        }
        "Exponential" | "Poisson" => {
            insert(&mut params, "rate", pick(&mut kwargs, "rate", &mut args, 0));
            name
        }
        "Gamma" | "InverseGamma" => {
            insert(
                &mut params,
                "shape",
                pick(&mut kwargs, "concentration", &mut args, 0),
            );
            insert(&mut params, "rate", pick(&mut kwargs, "rate", &mut args, 1));
            name
        }
        "HalfCauchy" | "HalfNormal" => {
            insert(&mut params, "scale", pick(&mut kwargs, "scale", &mut args, 0));
            name
        }
        "LKJ" | "LKJCholesky" => {
            insert(&mut params, "size", pick(&mut kwargs, "dim", &mut args, 0));
            insert(
                &mut params,
                "shape",
                pick(&mut kwargs, "concentration", &mut args, 1),
            );
            "LKJCholesky"
        }
        "LogNormal" | "Normal" => {
            insert(&mut params, "location", pick(&mut kwargs, "loc", &mut args, 0));
            insert(&mut params, "scale", pick(&mut kwargs, "scale", &mut args, 1));
            name
        }
        "Multinomial" => {
            insert(&mut params, "n", pick(&mut kwargs, "total_count", &mut args, 0));
            insert(&mut params, "p", pick(&mut kwargs, "probs", &mut args, 1));
            name
        }
        "MultivariateNormal" => {
            insert(&mut params, "location", pick(&mut kwargs, "loc", &mut args, 0));
            insert(
                &mut params,
                "covariance",
                pick(&mut kwargs, "covariance_matrix", &mut args, 1),
            );
            insert(
                &mut params,
                "precision",
                kwargs.remove("precision_matrix"),
            );
            name
        }
        "StudentT" => {
            insert(&mut params, "df", pick(&mut kwargs, "df", &mut args, 0));
            insert(&mut params, "location", pick(&mut kwargs, "loc", &mut args, 1));
            insert(&mut params, "scale", pick(&mut kwargs, "scale", &mut args, 2));
            name
        }
        "Uniform" => {
            insert(&mut params, "a", pick(&mut kwargs, "low", &mut args, 0));
            insert(&mut params, "b", pick(&mut kwargs, "high", &mut args, 1));
            name
        }
        "TruncatedNormal" => {
            insert(&mut params, "location", pick(&mut kwargs, "loc", &mut args, 0));
            insert(&mut params, "scale", pick(&mut kwargs, "scale", &mut args, 1));
            insert(&mut params, "lower", pick(&mut kwargs, "low", &mut args, 2));
            insert(&mut params, "upper", pick(&mut kwargs, "high", &mut args, 3));
            name
        }
        "Wishart" => {
            insert(&mut params, "df", pick(&mut kwargs, "df", &mut args, 0));
            insert(
                &mut params,
                "scale",
                pick(&mut kwargs, "covariance_matrix", &mut args, 1),
            );
            name
        }
        "Delta" | "Dirac" => {
            insert(&mut params, "location", pick(&mut kwargs, "v", &mut args, 0));
            "Dirac"
        }
        "Deterministic" => {
            insert(&mut params, "location", pick(&mut kwargs, "v", &mut args, 0));
            name
        }
        _ => {
            for (i, arg) in args.iter().enumerate() {
                params.insert(format!("param_{}", i), arg.clone());
            }
            for (key, arg) in kwargs {
                params.insert(key, arg);
            }
            return Distribution::new(format!("Unknown-{}", name), params);
        }
    };
    Distribution::new(canonical_name, params)
}
