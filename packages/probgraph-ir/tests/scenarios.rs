//! End-to-end scenarios: each test lowers a small probabilistic program
//! through the public API and runs one of the analyses against it.

use pretty_assertions::assert_eq;
use probgraph_ir::{
    build_program, check_ac, check_ac_guide, check_random_control_flow, detect_funnels,
    distribution_properties, estimate_value_range, symbolic_expression, verify_constraints,
    AcOutcome, AnalyzerError, AssignTarget, Distribution, Expr, FunctionDef, Interval, Program,
    ProgramIr, ScriptedSolver, SmtModel, SolveResult, Span, Stmt, Value,
};
use std::collections::BTreeMap;

fn sp() -> Span {
    Span::zero()
}

fn v(name: &str) -> Expr {
    Expr::var(name, 0, sp())
}

fn c(value: f64) -> Expr {
    Expr::constant(value, sp())
}

fn i(value: i64) -> Expr {
    Expr::constant(value, sp())
}

fn op(name: &str, args: Vec<Expr>) -> Expr {
    Expr::op(name, args, sp())
}

fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: AssignTarget::simple(name, 0, sp()),
        value,
        span: sp(),
    }
}

fn dist(name: &str, params: Vec<(&str, Expr)>) -> Distribution {
    let args: BTreeMap<String, Expr> = params
        .into_iter()
        .map(|(k, e)| (k.to_string(), e))
        .collect();
    Distribution::new(name, args)
}

fn sample_at(name: &str, dist: Distribution, span: Span) -> Stmt {
    let value = Expr::call(
        dist.name.clone(),
        dist.args.values().cloned().collect(),
        span,
    );
    Stmt::Sample {
        target: AssignTarget::simple(name, 0, span),
        name: name.to_string(),
        address: Expr::constant(Value::Int(0), span),
        dist,
        value,
        span,
    }
}

fn sample(name: &str, dist: Distribution) -> Stmt {
    sample_at(name, dist, sp())
}

fn observe(dist: Distribution) -> Stmt {
    let value = Expr::call(
        dist.name.clone(),
        dist.args.values().cloned().collect(),
        sp(),
    );
    Stmt::Factor {
        value,
        dist: Some(dist),
        span: sp(),
    }
}

fn if_else(test: Expr, then: Vec<Stmt>, orelse: Vec<Stmt>) -> Stmt {
    Stmt::If {
        test,
        then,
        orelse,
        span: sp(),
    }
}

fn build(stmts: Vec<Stmt>) -> ProgramIr {
    build_program(&Program::new(vec![], stmts)).expect("program should lower")
}

/// S1: the probability fed to Geometric can escape [0, 1]
#[test]
fn bernoulli_probability_range_violation() {
    let prob_arg_span = Span::new(120, 124);
    let prob_use = Expr::var("prob", 0, prob_arg_span);

    let ir = build(vec![
        sample("b", dist("Bernoulli", vec![("p", c(0.99))])),
        sample("z", dist("Normal", vec![("location", c(0.0)), ("scale", c(1.0))])),
        sample("u", dist("Beta", vec![("alpha", c(1.0)), ("beta", c(1.0))])),
        // prob = if b == 1 then 1 / (1 + exp(z)) else 1.5 * u
        if_else(
            op("==", vec![v("b"), i(1)]),
            vec![assign(
                "prob",
                op(
                    "/",
                    vec![c(1.0), op("+", vec![c(1.0), op("exp", vec![v("z")])])],
                ),
            )],
            vec![assign("prob", op("*", vec![c(1.5), v("u")]))],
        ),
        sample("g", dist("Geometric", vec![("p", prob_use)])),
    ]);

    let result = verify_constraints(&ir).unwrap();
    assert!(result.analyzable);
    assert_eq!(result.violations.len(), 1);

    let violation = &result.violations[0];
    assert_eq!(violation.distribution, "Geometric");
    assert_eq!(violation.param_name, "p");
    assert_eq!(violation.estimated_range, Interval::new(0.0, 1.5));
    assert_eq!(violation.constraint.to_interval(), Some(Interval::unit()));
    // the diagnostic points at the prob argument
    assert_eq!(violation.diagnostic_ranges(), vec![(120, 124)]);
}

/// S2: a well-formed linear regression produces no violations
#[test]
fn linear_regression_is_well_formed() {
    let ir = build(vec![
        sample("a", dist("Normal", vec![("location", c(0.0)), ("scale", c(10.0))])),
        sample("b", dist("Normal", vec![("location", c(0.0)), ("scale", c(10.0))])),
        sample(
            "s2",
            dist("InverseGamma", vec![("shape", c(1.0)), ("rate", c(1.0))]),
        ),
        observe(dist(
            "Normal",
            vec![
                (
                    "location",
                    op("+", vec![op("*", vec![v("a"), v("x")]), v("b")]),
                ),
                ("scale", v("s2")),
            ],
        )),
    ]);

    let result = verify_constraints(&ir).unwrap();
    assert!(result.analyzable);
    assert_eq!(result.violations, vec![]);
}

/// S3: a scale parameter fed by another draw is a funnel
#[test]
fn scale_depends_on_sample_is_a_funnel() {
    let tau_span = Span::new(10, 30);
    let theta_span = Span::new(40, 70);

    let ir = build(vec![
        sample_at("tau", dist("HalfCauchy", vec![("scale", c(5.0))]), tau_span),
        sample_at(
            "theta",
            dist("Normal", vec![("location", v("mu")), ("scale", v("tau"))]),
            theta_span,
        ),
    ]);

    let warnings = detect_funnels(&ir).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].diagnostic_ranges(),
        vec![theta_span.as_range(), tau_span.as_range()]
    );
}

fn branching_support_program() -> ProgramIr {
    let body = |dist_stmt: Stmt| {
        vec![
            sample("A", dist("Bernoulli", vec![("p", c(0.5))])),
            if_else(op("==", vec![v("A"), i(1)]), vec![dist_stmt], vec![]),
        ]
    };
    let model = FunctionDef {
        name: "model".into(),
        scope: 1,
        params: vec![],
        body: body(sample(
            "B",
            dist("Normal", vec![("location", c(0.0)), ("scale", c(1.0))]),
        )),
        span: sp(),
    };
    let guide = FunctionDef {
        name: "guide".into(),
        scope: 2,
        params: vec![],
        body: body(sample(
            "B",
            dist("Gamma", vec![("shape", c(1.0)), ("rate", c(1.0))]),
        )),
        span: sp(),
    };
    build_program(
        &Program::new(vec![model, guide], vec![]).with_model_and_guide("model", "guide"),
    )
    .unwrap()
}

/// S4: guide and model draw the same address from different supports under
/// the same branch; the counter-example surfaces through the global check
#[test]
fn guide_support_mismatch_yields_counterexample() {
    let ir = branching_support_program();
    let counterexample = SmtModel::from_pairs([("A", "1"), ("B", "-1")]);
    let solver = ScriptedSolver::with_results(vec![SolveResult::Sat(counterexample.clone())]);

    let violation = check_ac_guide(&ir, &solver).unwrap().expect("violation");
    assert_eq!(violation.counterexample, counterexample);
    assert_eq!(violation.p_name, "guide");
    assert_eq!(violation.q_name, "model");

    // the submitted formula is the negated implication over both sets of
    // samples, conditioned on the shared branch decision
    let queries = solver.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].starts_with("!("));
    assert!(queries[0].contains("==(Int(A),Constant(1))"));
}

/// S5: a discrete draw steering control flow over a continuous draw
#[test]
fn discrete_variable_controlling_continuous_draw() {
    let ir = build(vec![
        sample("state", dist("Bernoulli", vec![("p", c(0.5))])),
        if_else(
            op("==", vec![v("state"), i(1)]),
            vec![assign("mu", c(5.0))],
            vec![assign("mu", c(6.0))],
        ),
        sample(
            "obs",
            dist("Normal", vec![("location", v("mu")), ("scale", c(1.0))]),
        ),
    ]);

    let warnings = check_random_control_flow(&ir).unwrap();
    assert_eq!(warnings.len(), 1);

    let samples = ir.sample_nodes();
    assert_eq!(warnings[0].node, samples[1]);
    let deps: Vec<_> = warnings[0].dependencies.iter().map(|(n, _)| *n).collect();
    assert_eq!(deps, vec![samples[0]]);
}

/// S6: a loop-carried variable used as a distribution argument
#[test]
fn cycle_guard_widens_interval_and_refuses_symbolic() {
    let ir = build(vec![
        assign("x", c(0.0)),
        Stmt::While {
            test: v("x"),
            body: vec![assign("x", op("+", vec![v("x"), c(1.0)]))],
            span: sp(),
        },
        sample(
            "g",
            dist("Normal", vec![("location", v("x")), ("scale", c(1.0))]),
        ),
    ]);
    let g = ir.sample_nodes()[0];
    let location = v("x");

    // interval evaluation widens the self-dependent variable to top
    let range = estimate_value_range(&ir, g, &location, &BTreeMap::new()).unwrap();
    assert_eq!(range, Interval::top());

    // the symbolic driver refuses the cycle
    let err = symbolic_expression(&ir, g, &location, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, AnalyzerError::CyclicDependency { .. }));

    // the enclosing analyses downgrade instead of crashing
    let result = verify_constraints(&ir).unwrap();
    assert!(result.analyzable);
    let outcome = check_ac(&ir, &[g], &[g], &ScriptedSolver::unknown()).unwrap();
    assert_eq!(outcome, AcOutcome::Unknown);
}

/// P7: verification output is byte-identical across runs
#[test]
fn constraint_verification_is_deterministic() {
    let build_ir = || {
        build(vec![
            sample("u", dist("Beta", vec![("alpha", c(1.0)), ("beta", c(1.0))])),
            sample(
                "g",
                dist("Geometric", vec![("p", op("*", vec![c(2.0), v("u")]))]),
            ),
            sample(
                "h",
                dist("Geometric", vec![("p", op("*", vec![c(3.0), v("u")]))]),
            ),
        ])
    };
    let first = serde_json::to_string(&verify_constraints(&build_ir()).unwrap()).unwrap();
    let second = serde_json::to_string(&verify_constraints(&build_ir()).unwrap()).unwrap();
    assert_eq!(first, second);
}

/// P8: analyses never mutate the catalog
#[test]
fn catalog_entries_survive_analyses() {
    let uniform_before = distribution_properties("Uniform").unwrap();
    let geometric_before = distribution_properties("Geometric").unwrap();

    let ir = build(vec![
        sample("x", dist("Uniform", vec![("a", c(-1.0)), ("b", c(2.0))])),
        sample("g", dist("Geometric", vec![("p", v("x"))])),
    ]);
    let _ = verify_constraints(&ir).unwrap();
    let _ = detect_funnels(&ir).unwrap();
    let _ = check_random_control_flow(&ir).unwrap();

    assert_eq!(distribution_properties("Uniform").unwrap(), uniform_before);
    assert_eq!(
        distribution_properties("Geometric").unwrap(),
        geometric_before
    );
}

/// Interval wire format: endpoints as strings so infinities survive JSON
#[test]
fn interval_serialization_round_trips_infinities() {
    let json = serde_json::to_string(&Interval::positive()).unwrap();
    let back: Interval = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Interval::positive());
}
