//! End-to-end analysis scenarios on small epidemic and identity models

use std::collections::BTreeMap;

use polyreach_algebra::{Polynomial, Symbol};
use polyreach_engine::{build_model, Analyzer, Model, ModelData, ProblemType};
use polyreach_geometry::{Polytope, PolytopesUnion};
use polyreach_stl::StlFormula;

const TOLERANCE: f64 = 1e-12;

/// Axis-aligned bounds of the single polytope of a union
fn box_bounds(union: &PolytopesUnion) -> Vec<(f64, f64)> {
    assert_eq!(union.size(), 1);
    let polytope = union.iter().next().unwrap();
    let dim = polytope.dim();
    (0..dim)
        .map(|j| {
            let mut axis = vec![0.0; dim];
            axis[j] = 1.0;
            (
                polytope.minimize(&axis).optimum(),
                polytope.maximize(&axis).optimum(),
            )
        })
        .collect()
}

fn assert_box(union: &PolytopesUnion, expected: &[(f64, f64)]) {
    let bounds = box_bounds(union);
    for (axis, ((lo, hi), (want_lo, want_hi))) in
        bounds.iter().zip(expected).enumerate()
    {
        assert!(
            (lo - want_lo).abs() < TOLERANCE && (hi - want_hi).abs() < TOLERANCE,
            "axis {axis}: got [{lo}, {hi}], expected [{want_lo}, {want_hi}]"
        );
    }
}

/// `x' = x, y' = y, z' = z` over `[0, 5]^3`
fn identity_model(iterations: u32) -> Model {
    let mut data = ModelData::new(vec![Symbol::new("x"), Symbol::new("y"), Symbol::new("z")]);
    data.variables = vec![
        (Symbol::new("x"), Some((0.0, 5.0))),
        (Symbol::new("y"), Some((0.0, 5.0))),
        (Symbol::new("z"), Some((0.0, 5.0))),
    ];
    for name in ["x", "y", "z"] {
        data.dynamics
            .insert(Symbol::new(name), Polynomial::variable(name));
    }
    data.options.horizon = iterations;
    build_model(data).unwrap()
}

/// The non-parametric SIR map over the unit box
fn sir_model(iterations: u32) -> Model {
    let s = Polynomial::variable("s");
    let i = Polynomial::variable("i");
    let r = Polynomial::variable("r");

    let mut data = ModelData::new(vec![Symbol::new("s"), Symbol::new("i"), Symbol::new("r")]);
    data.variables = vec![
        (Symbol::new("s"), Some((0.0, 1.0))),
        (Symbol::new("i"), Some((0.0, 1.0))),
        (Symbol::new("r"), Some((0.0, 1.0))),
    ];
    data.dynamics
        .insert(Symbol::new("s"), s.clone() - 0.1 * s.clone() * i.clone());
    data.dynamics.insert(
        Symbol::new("i"),
        i.clone() + 0.1 * s * i.clone() - 0.5 * i.clone(),
    );
    data.dynamics.insert(Symbol::new("r"), r + 0.5 * i);
    data.options.horizon = iterations;
    build_model(data).unwrap()
}

/// The parametric SIR map with `alpha in [0.5, 0.6]`, `beta in [0.1, 0.2]`
fn parametric_sir_data() -> ModelData {
    let s = Polynomial::variable("s");
    let i = Polynomial::variable("i");
    let r = Polynomial::variable("r");
    let alpha = Polynomial::variable("alpha");
    let beta = Polynomial::variable("beta");

    let mut data = ModelData::new(vec![Symbol::new("s"), Symbol::new("i"), Symbol::new("r")]);
    data.variables = vec![
        (Symbol::new("s"), Some((0.0, 1.0))),
        (Symbol::new("i"), Some((0.0, 1.0))),
        (Symbol::new("r"), Some((0.0, 1.0))),
    ];
    data.parameters = vec![
        (Symbol::new("alpha"), Some((0.5, 0.6))),
        (Symbol::new("beta"), Some((0.1, 0.2))),
    ];
    data.dynamics.insert(
        Symbol::new("s"),
        s.clone() - beta.clone() * s.clone() * i.clone(),
    );
    data.dynamics.insert(
        Symbol::new("i"),
        i.clone() + beta * s * i.clone() - alpha.clone() * i.clone(),
    );
    data.dynamics.insert(Symbol::new("r"), r + alpha * i);
    data
}

#[test]
fn identity_map_keeps_the_box() {
    let model = identity_model(1);
    let analyzer = Analyzer::new(&model, 1).unwrap();
    let flowpipe = analyzer.reach(None).unwrap();

    assert_eq!(flowpipe.len(), 2);
    let expected = model.initial_set.get_polytope();
    assert_eq!(flowpipe.get(1).unwrap().iter().next().unwrap(), &expected);
}

#[test]
fn zero_iterations_yield_the_initial_set_only() {
    let model = sir_model(0);
    let analyzer = Analyzer::new(&model, 1).unwrap();
    let flowpipe = analyzer.reach(None).unwrap();
    assert_eq!(flowpipe.len(), 1);
    assert_box(flowpipe.get(0).unwrap(), &[(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)]);
}

#[test]
fn sir_two_steps() {
    let model = sir_model(2);
    let analyzer = Analyzer::new(&model, 1).unwrap();
    let flowpipe = analyzer.reach(None).unwrap();

    assert_eq!(flowpipe.len(), 3);
    assert_box(
        flowpipe.get(1).unwrap(),
        &[(0.0, 1.0), (0.0, 0.6), (0.0, 1.5)],
    );
    assert_box(
        flowpipe.get(2).unwrap(),
        &[(0.0, 1.0), (0.0, 0.36), (0.0, 1.8)],
    );
}

#[test]
fn parametric_sir_two_steps() {
    let mut data = parametric_sir_data();
    data.options.horizon = 2;
    let model = build_model(data).unwrap();
    let analyzer = Analyzer::new(&model, 2).unwrap();
    let flowpipe = analyzer.reach(None).unwrap();

    assert_eq!(flowpipe.len(), 3);
    assert_box(
        flowpipe.get(1).unwrap(),
        &[(0.0, 1.0), (0.0, 0.7), (0.0, 1.6)],
    );
    assert_box(
        flowpipe.get(2).unwrap(),
        &[(0.0, 1.0), (0.0, 0.49), (0.0, 2.02)],
    );
}

/// Build the parametric SIR synthesis problem over the one-step reach set
fn synthesis_model(predicate: Polynomial) -> Model {
    let mut data = parametric_sir_data();
    // the set reached after one step from the unit box
    data.variables = vec![
        (Symbol::new("s"), Some((0.0, 1.0))),
        (Symbol::new("i"), Some((0.0, 0.7))),
        (Symbol::new("r"), Some((0.0, 1.6))),
    ];
    data.problem = ProblemType::Synth;
    data.specification = Some(StlFormula::atom(predicate));
    build_model(data).unwrap()
}

#[test]
fn synthesize_atomic_infection_bound() {
    let model = synthesis_model(Polynomial::variable("i") - 0.365);
    let analyzer = Analyzer::new(&model, 1).unwrap();
    let refined = analyzer.synthesize(None).unwrap();

    assert_eq!(refined.len(), 1);
    assert_eq!(refined[0].size(), 1);

    // {alpha <= 0.6, beta >= 0.1, 140 beta - 140 alpha <= -67}
    let expected = Polytope::new(
        vec![vec![1.0, 0.0], vec![0.0, -1.0], vec![-140.0, 140.0]],
        vec![0.6, -0.1, -67.0],
    )
    .unwrap();
    assert!(!expected.is_empty());
    assert_eq!(refined[0].iter().next().unwrap(), &expected);
}

#[test]
fn synthesize_atomic_recovered_bound() {
    let model = synthesis_model(Polynomial::variable("r") - 2.0);
    let analyzer = Analyzer::new(&model, 1).unwrap();
    let refined = analyzer.synthesize(None).unwrap();

    assert_eq!(refined.len(), 1);
    assert_eq!(refined[0].size(), 1);

    // {7 alpha <= 4, beta <= 0.2, alpha >= 0.5, beta >= 0.1}
    let expected = Polytope::new(
        vec![
            vec![7.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
        ],
        vec![4.0, 0.2, -0.5, -0.1],
    )
    .unwrap();
    assert!(!expected.is_empty());
    assert_eq!(refined[0].iter().next().unwrap(), &expected);
}

#[test]
fn synthesized_region_is_a_subset_of_the_parameter_set() {
    let model = synthesis_model(Polynomial::variable("i") - 0.365);
    let analyzer = Analyzer::new(&model, 1).unwrap();
    let refined = analyzer.synthesize(None).unwrap();

    for union in &refined {
        for member in union {
            assert!(model.parameter_set.any_includes(member));
        }
    }
}

#[test]
fn flowpipe_contains_sampled_trajectories() {
    let model = sir_model(3);
    let analyzer = Analyzer::new(&model, 1).unwrap();
    let flowpipe = analyzer.reach(None).unwrap();

    let names = [Symbol::new("s"), Symbol::new("i"), Symbol::new("r")];
    for corner in [
        [0.0, 0.0, 0.0],
        [1.0, 1.0, 1.0],
        [1.0, 0.5, 0.0],
        [0.25, 1.0, 0.75],
    ] {
        let mut state = corner.to_vec();
        for step in 0..flowpipe.len() {
            let point = point_polytope(&state);
            assert!(
                flowpipe.get(step).unwrap().any_includes(&point),
                "state {state:?} escaped the flowpipe at step {step}"
            );
            let mut values = BTreeMap::new();
            for (name, value) in names.iter().zip(&state) {
                values.insert(name.clone(), *value);
            }
            state = model
                .system
                .dynamics()
                .iter()
                .map(|law| law.evaluate(&values).unwrap())
                .collect();
        }
    }
}

/// A degenerate polytope holding a single point
fn point_polytope(point: &[f64]) -> Polytope {
    let dim = point.len();
    let mut rows = Vec::new();
    let mut offsets = Vec::new();
    for (j, value) in point.iter().enumerate() {
        let mut axis = vec![0.0; dim];
        axis[j] = 1.0;
        rows.push(axis.clone());
        offsets.push(*value);
        rows.push(axis.iter().map(|c| -c).collect());
        offsets.push(-*value);
    }
    Polytope::new(rows, offsets).unwrap()
}
