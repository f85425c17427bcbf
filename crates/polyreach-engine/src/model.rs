//! Whole-problem model and its builder
//!
//! [`ModelData`] is the raw, parser-facing description of an analysis
//! problem. [`build_model`] validates it and assembles the [`Model`] the
//! analyzer runs on: the discrete system (integrating ODE dynamics when
//! needed), the initial bundle with merged directions and templates, the
//! parameter polytope and the optional specification, assumptions and
//! invariant.

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};

use polyreach_algebra::{Polynomial, Symbol};
use polyreach_geometry::linear_algebra::{linear_dependence, Matrix, Vector};
use polyreach_geometry::{Bundle, Polytope, PolytopesUnion, TransformMode};
use polyreach_stl::StlFormula;

use crate::error::ModelError;
use crate::integrator::{integrate, IntegratorKind};
use crate::system::DiscreteSystem;

/// The kind of analysis requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    /// Flowpipe construction
    Reach,
    /// STL parameter synthesis
    Synth,
}

/// How the dynamic laws are to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicsKind {
    /// `x' = f(x, p)` is already a discrete map
    Discrete,
    /// `dx/dt = f(x, p)` must be integrated first
    Ode,
}

/// Tunables of an analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Direction selection mode of the image operator
    pub transform_mode: TransformMode,
    /// Number of reachability steps
    pub horizon: u32,
    /// Maximum depth of the parameter split tree
    pub max_param_splits: u32,
    /// Eager bisections before the first synthesis attempt
    pub presplits: u32,
    /// Weight of the randomized template decomposition, when enabled
    pub decomposition: Option<f64>,
    /// Symbolic self-composition degree of the dynamics
    pub compose_degree: u32,
    /// Integration step for ODE dynamics
    pub integration_step: Option<f64>,
    /// Integrator for ODE dynamics
    pub integrator: Option<IntegratorKind>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            transform_mode: TransformMode::OneForOne,
            horizon: 0,
            max_param_splits: 0,
            presplits: 0,
            decomposition: None,
            compose_degree: 1,
            integration_step: None,
            integrator: None,
        }
    }
}

/// Raw description of an analysis problem, as produced by the parser
#[derive(Debug, Clone)]
pub struct ModelData {
    /// Ordered state variables with optional initial box bounds
    pub variables: Vec<(Symbol, Option<(f64, f64)>)>,
    /// Ordered parameters with their bounds
    pub parameters: Vec<(Symbol, Option<(f64, f64)>)>,
    /// Dynamic law per variable
    pub dynamics: BTreeMap<Symbol, Polynomial>,
    /// Interpretation of the dynamics
    pub kind: DynamicsKind,
    /// Additional initial-set directions with their bounds
    pub directions: Vec<(Vector, f64, f64)>,
    /// Template rows over the collected direction list
    pub templates: Vec<Vec<usize>>,
    /// Adaptive direction indices
    pub adaptive: BTreeSet<usize>,
    /// The STL specification, if any
    pub specification: Option<StlFormula>,
    /// Assumption constraints `e ≤ 0` over the variables
    pub assumptions: Vec<Polynomial>,
    /// Invariant constraints `e ≤ 0` over the variables
    pub invariants: Vec<Polynomial>,
    /// Requested analysis
    pub problem: ProblemType,
    /// Tunables
    pub options: AnalysisOptions,
}

impl ModelData {
    /// An empty reachability problem over the given variables
    pub fn new(variables: Vec<Symbol>) -> Self {
        ModelData {
            variables: variables.into_iter().map(|v| (v, None)).collect(),
            parameters: Vec::new(),
            dynamics: BTreeMap::new(),
            kind: DynamicsKind::Discrete,
            directions: Vec::new(),
            templates: Vec::new(),
            adaptive: BTreeSet::new(),
            specification: None,
            assumptions: Vec::new(),
            invariants: Vec::new(),
            problem: ProblemType::Reach,
            options: AnalysisOptions::default(),
        }
    }
}

/// A validated analysis problem
#[derive(Debug, Clone)]
pub struct Model {
    /// The discrete system under analysis
    pub system: DiscreteSystem,
    /// Over-approximation of the initial states
    pub initial_set: Bundle,
    /// The initial parameter region
    pub parameter_set: PolytopesUnion,
    /// The specification, in the user's form (not yet in PNF)
    pub specification: Option<StlFormula>,
    /// Constraints intersected with the state set at every step
    pub assumptions: Option<Polytope>,
    /// Invariant constraints intersected at every step
    pub invariant: Option<Polytope>,
    /// Requested analysis
    pub problem: ProblemType,
    /// Tunables
    pub options: AnalysisOptions,
}

/// Merge a direction into the collected pool
///
/// Linearly dependent directions are folded together: the bounds of the
/// new direction are rescaled by the dependence coefficient and the merged
/// direction keeps the hull of both bound pairs. Returns the index of the
/// direction in the pool.
fn collect_direction(
    pool: &mut Matrix,
    lower: &mut Vector,
    upper: &mut Vector,
    direction: Vector,
    dir_lower: f64,
    dir_upper: f64,
) -> usize {
    for (pos, existing) in pool.iter().enumerate() {
        if let Some(lambda) = linear_dependence(&direction, existing) {
            // existing = λ · direction
            let (mut lo, mut up) = (lambda * dir_lower, lambda * dir_upper);
            if lambda < 0.0 {
                std::mem::swap(&mut lo, &mut up);
            }
            lower[pos] = lower[pos].min(lo);
            upper[pos] = upper[pos].max(up);
            return pos;
        }
    }
    pool.push(direction);
    lower.push(dir_lower);
    upper.push(dir_upper);
    pool.len() - 1
}

/// Drop directions no template mentions, re-indexing templates and the
/// adaptive set
///
/// Applied only when the user gave an explicit template set: the image
/// operator in all-for-one mode assumes every pool direction belongs to a
/// template.
fn trim_unused_directions(
    pool: &mut Matrix,
    lower: &mut Vector,
    upper: &mut Vector,
    adaptive: &mut BTreeSet<usize>,
    templates: Vec<Vec<usize>>,
) -> Vec<Vec<usize>> {
    let mut used = vec![false; pool.len()];
    for template in &templates {
        for &dir in template {
            used[dir] = true;
        }
    }

    let mut new_position = vec![usize::MAX; pool.len()];
    let mut next = 0;
    for (i, &is_used) in used.iter().enumerate() {
        if is_used {
            new_position[i] = next;
            next += 1;
        }
    }

    let mut new_pool = Vec::with_capacity(next);
    let mut new_lower = Vec::with_capacity(next);
    let mut new_upper = Vec::with_capacity(next);
    for i in 0..pool.len() {
        if used[i] {
            new_pool.push(pool[i].clone());
            new_lower.push(lower[i]);
            new_upper.push(upper[i]);
        }
    }
    *pool = new_pool;
    *lower = new_lower;
    *upper = new_upper;

    *adaptive = adaptive
        .iter()
        .filter(|&&d| used[d])
        .map(|&d| new_position[d])
        .collect();

    templates
        .into_iter()
        .map(|t| t.iter().map(|&d| new_position[d]).collect())
        .collect()
}

/// Pick a default template: the first subset of directions forming a basis
fn default_template(pool: &Matrix, dim: usize) -> Result<Vec<usize>, ModelError> {
    let mut chosen: Vec<usize> = Vec::with_capacity(dim);
    for (i, _) in pool.iter().enumerate() {
        let mut candidate = chosen.clone();
        candidate.push(i);
        let rows: Matrix = candidate.iter().map(|&j| pool[j].clone()).collect();
        if gaussian_rank(&rows) == candidate.len() {
            chosen = candidate;
            if chosen.len() == dim {
                return Ok(chosen);
            }
        }
    }
    Err(ModelError::NoIndependentTemplate)
}

/// Row rank of a small matrix
fn gaussian_rank(rows: &Matrix) -> usize {
    let mut m: Matrix = rows.to_vec();
    let cols = m.first().map(|r| r.len()).unwrap_or(0);
    let mut rank = 0;
    for col in 0..cols {
        if rank == m.len() {
            break;
        }
        let pivot = (rank..m.len()).find(|&r| m[r][col].abs() > 1e-12);
        let Some(pivot) = pivot else { continue };
        m.swap(rank, pivot);
        for r in rank + 1..m.len() {
            let factor = m[r][col] / m[rank][col];
            for c in col..cols {
                let v = m[rank][c];
                m[r][c] -= factor * v;
            }
        }
        rank += 1;
    }
    rank
}

/// Validate a raw model description and build the analyzable model
pub fn build_model(data: ModelData) -> Result<Model, ModelError> {
    let variables: Vec<Symbol> = data.variables.iter().map(|(v, _)| v.clone()).collect();
    let parameters: Vec<Symbol> = data.parameters.iter().map(|(p, _)| p.clone()).collect();

    // dynamics, aligned with the variable order
    let mut dynamics = Vec::with_capacity(variables.len());
    for v in &variables {
        let law = data
            .dynamics
            .get(v)
            .cloned()
            .ok_or_else(|| ModelError::MissingDynamics(v.clone()))?;
        dynamics.push(law);
    }
    let mut system = DiscreteSystem::new(variables.clone(), parameters.clone(), dynamics)?;

    if data.options.compose_degree > 1 {
        system = system.compose(data.options.compose_degree);
    }

    if data.kind == DynamicsKind::Ode {
        let step = data
            .options
            .integration_step
            .ok_or(ModelError::MissingIntegrationStep)?;
        let integrator = data.options.integrator.unwrap_or_else(|| {
            warn!("No integrator specified, using the Euler method");
            IntegratorKind::Euler
        });
        system = integrate(&system, integrator, step)?;
        if let Some(variable) = system.nonlinear_parameter_law() {
            return Err(ModelError::NonLinearParameterDependence(variable.clone()));
        }
        info!("Integrated ODE dynamics with the {integrator} method, step {step}");
    }

    // collect initial-set directions: variable boxes first, then the
    // user's extra directions, merging linearly dependent rows
    let dim = variables.len();
    let mut pool: Matrix = Vec::new();
    let mut lower: Vector = Vec::new();
    let mut upper: Vector = Vec::new();
    let mut raw_index: Vec<usize> = Vec::new();

    for (j, (_, bounds)) in data.variables.iter().enumerate() {
        if let Some((lo, up)) = bounds {
            let mut axis = vec![0.0; dim];
            axis[j] = 1.0;
            raw_index.push(collect_direction(
                &mut pool, &mut lower, &mut upper, axis, *lo, *up,
            ));
        }
    }
    for (direction, lo, up) in &data.directions {
        raw_index.push(collect_direction(
            &mut pool,
            &mut lower,
            &mut upper,
            direction.clone(),
            *lo,
            *up,
        ));
    }

    if pool.len() < dim {
        return Err(ModelError::NotEnoughDirections {
            variables: dim,
            directions: pool.len(),
        });
    }

    // map user templates onto the merged pool
    let mut templates: Vec<Vec<usize>> = Vec::new();
    for template in &data.templates {
        let remapped: Vec<usize> = template
            .iter()
            .map(|&i| {
                raw_index
                    .get(i)
                    .copied()
                    .ok_or(ModelError::Geometry(
                        polyreach_geometry::GeometryError::TemplateIndexOutOfRange {
                            index: i,
                            directions: raw_index.len(),
                        },
                    ))
            })
            .collect::<Result<_, _>>()?;
        if !templates.contains(&remapped) {
            templates.push(remapped);
        }
    }
    let mut adaptive = data.adaptive.clone();

    let templates = if templates.is_empty() {
        vec![default_template(&pool, dim)?]
    } else {
        // explicit templates: unused directions are trimmed away
        trim_unused_directions(&mut pool, &mut lower, &mut upper, &mut adaptive, templates)
    };

    let mut initial_set = Bundle::new(pool, lower, upper, templates)?;
    initial_set.set_adaptive(adaptive)?;

    // assumptions and invariant systems over the variables
    let assumptions = if data.assumptions.is_empty() {
        None
    } else {
        Some(Polytope::from_constraints(&variables, &data.assumptions)?)
    };
    let invariant = if data.invariants.is_empty() {
        None
    } else {
        Some(Polytope::from_constraints(&variables, &data.invariants)?)
    };
    if let Some(constraints) = &assumptions {
        initial_set = initial_set.intersect_with_constraints(constraints)?;
    }
    if let Some(constraints) = &invariant {
        initial_set = initial_set.intersect_with_constraints(constraints)?;
    }

    // the parameter region is the box of the declared bounds
    let mut parameter_set = PolytopesUnion::new();
    if !parameters.is_empty() {
        let mut rows = Vec::new();
        let mut offsets = Vec::new();
        for (j, (p, bounds)) in data.parameters.iter().enumerate() {
            let (lo, up) = bounds.ok_or_else(|| ModelError::MissingParameterBounds(p.clone()))?;
            let mut axis = vec![0.0; parameters.len()];
            axis[j] = 1.0;
            rows.push(axis.clone());
            offsets.push(up);
            rows.push(axis.iter().map(|c| -c).collect());
            offsets.push(-lo);
        }
        parameter_set.add(Polytope::new(rows, offsets)?)?;
    }

    // specification sanity: atoms range over the state variables only
    if let Some(specification) = &data.specification {
        check_specification_symbols(specification, &variables)?;
    }
    if data.problem == ProblemType::Synth && data.specification.is_none() {
        return Err(ModelError::MissingSpecification);
    }

    Ok(Model {
        system,
        initial_set,
        parameter_set,
        specification: data.specification,
        assumptions,
        invariant,
        problem: data.problem,
        options: data.options,
    })
}

/// Every atom predicate may only mention declared state variables
fn check_specification_symbols(
    formula: &StlFormula,
    variables: &[Symbol],
) -> Result<(), ModelError> {
    match formula {
        StlFormula::Atom(atom) => {
            for symbol in atom.predicate().symbols() {
                if !variables.contains(&symbol) {
                    return Err(ModelError::UndeclaredSymbol(symbol));
                }
            }
            Ok(())
        }
        StlFormula::Negation(inner)
        | StlFormula::Always(_, inner)
        | StlFormula::Eventually(_, inner) => check_specification_symbols(inner, variables),
        StlFormula::Conjunction(lhs, rhs)
        | StlFormula::Disjunction(lhs, rhs)
        | StlFormula::Until(_, lhs, rhs) => {
            check_specification_symbols(lhs, variables)?;
            check_specification_symbols(rhs, variables)
        }
    }
}
