//! Bundles of parallelotopes
//!
//! A [`Bundle`] over-approximates a convex set by the intersection of
//! several parallelotopes drawn from a shared pool of directions. Each
//! *template* selects `n` linearly independent directions from the pool and
//! denotes one parallelotope; the bundle denotes the intersection of all of
//! them, which is tighter than any single parallelotope.
//!
//! The image of a bundle under a polynomial map is computed per template:
//! the map is composed with the template's generator function and the
//! range of the composition along each direction is bounded by its
//! Bernstein coefficients. Since every template over-approximates the
//! image on its own, the direction-wise minimum over templates is still an
//! over-approximation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::trace;
use rand::Rng;

use polyreach_algebra::bernstein::bernstein_coefficients;
use polyreach_algebra::{AlgebraError, Polynomial, Symbol};

use crate::cache::{BoundTarget, ControlPointCache};
use crate::error::GeometryError;
use crate::linear_algebra::{
    complementary, is_nonsingular, linear_dependence, norm, orthogonal_proximity, Matrix, Vector,
};
use crate::lp::LpStatus;
use crate::parallelotope::{GeneratorSymbols, Parallelotope};
use crate::polytope::Polytope;

/// Direction selection mode of the image operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    /// One-for-one: each template re-bounds only its own directions; the
    /// result is canonicalized
    OneForOne,
    /// All-for-one: each template re-bounds every direction in the pool;
    /// no post-canonicalization
    AllForOne,
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformMode::OneForOne => write!(f, "OFO"),
            TransformMode::AllForOne => write!(f, "AFO"),
        }
    }
}

/// Whether two templates select the same direction set
fn is_permutation(t1: &[usize], t2: &[usize]) -> bool {
    let mut s1 = t1.to_vec();
    let mut s2 = t2.to_vec();
    s1.sort_unstable();
    s2.sort_unstable();
    s1 == s2
}

/// An intersection of parallelotopes over a shared direction pool
#[derive(Debug, Clone)]
pub struct Bundle {
    directions: Matrix,
    lower: Vector,
    upper: Vector,
    templates: Vec<Vec<usize>>,
    adaptive: BTreeSet<usize>,
}

impl Bundle {
    /// Build a bundle from a direction pool, per-direction bounds and a
    /// template set
    ///
    /// Every template must have exactly `dim` entries, reference existing
    /// directions and select a linearly independent set.
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_geometry::Bundle;
    ///
    /// // the unit square as a single-template bundle
    /// let b = Bundle::new(
    ///     vec![vec![1.0, 0.0], vec![0.0, 1.0]],
    ///     vec![0.0, 0.0],
    ///     vec![1.0, 1.0],
    ///     vec![vec![0, 1]],
    /// ).unwrap();
    /// assert_eq!(b.dim(), 2);
    /// ```
    pub fn new(
        directions: Matrix,
        lower: Vector,
        upper: Vector,
        templates: Vec<Vec<usize>>,
    ) -> Result<Self, GeometryError> {
        if directions.is_empty() {
            return Err(GeometryError::EmptyDirections);
        }
        let dim = directions[0].len();
        for row in &directions {
            if row.len() != dim {
                return Err(GeometryError::DimensionMismatch {
                    what: "bundle directions",
                    expected: dim,
                    found: row.len(),
                });
            }
        }
        for offsets in [&lower, &upper] {
            if offsets.len() != directions.len() {
                return Err(GeometryError::DimensionMismatch {
                    what: "bundle offsets",
                    expected: directions.len(),
                    found: offsets.len(),
                });
            }
        }
        if templates.is_empty() {
            return Err(GeometryError::EmptyTemplates);
        }
        for template in &templates {
            if template.len() != dim {
                return Err(GeometryError::DimensionMismatch {
                    what: "bundle template",
                    expected: dim,
                    found: template.len(),
                });
            }
            for &index in template {
                if index >= directions.len() {
                    return Err(GeometryError::TemplateIndexOutOfRange {
                        index,
                        directions: directions.len(),
                    });
                }
            }
            let rows: Matrix = template.iter().map(|&i| directions[i].clone()).collect();
            if !is_nonsingular(&rows) {
                return Err(GeometryError::DependentTemplateDirections);
            }
        }

        Ok(Bundle {
            directions,
            lower,
            upper,
            templates,
            adaptive: BTreeSet::new(),
        })
    }

    /// Declare which directions may be refined adaptively
    pub fn set_adaptive(&mut self, adaptive: BTreeSet<usize>) -> Result<(), GeometryError> {
        if let Some(&index) = adaptive.iter().find(|&&i| i >= self.num_directions()) {
            return Err(GeometryError::TemplateIndexOutOfRange {
                index,
                directions: self.num_directions(),
            });
        }
        self.adaptive = adaptive;
        Ok(())
    }

    /// Space dimension
    pub fn dim(&self) -> usize {
        self.directions[0].len()
    }

    /// Number of directions in the pool
    pub fn num_directions(&self) -> usize {
        self.directions.len()
    }

    /// Number of templates, i.e. of intersected parallelotopes
    pub fn num_templates(&self) -> usize {
        self.templates.len()
    }

    /// The direction pool
    pub fn directions(&self) -> &Matrix {
        &self.directions
    }

    /// Per-direction lower bounds
    pub fn lower_bounds(&self) -> &Vector {
        &self.lower
    }

    /// Per-direction upper bounds
    pub fn upper_bounds(&self) -> &Vector {
        &self.upper
    }

    /// The template set
    pub fn templates(&self) -> &[Vec<usize>] {
        &self.templates
    }

    /// The adaptive direction set
    pub fn adaptive_directions(&self) -> &BTreeSet<usize> {
        &self.adaptive
    }

    /// The half-space form of the denoted polytope
    ///
    /// Rows with non-finite offsets (directions never bounded so far) are
    /// left out.
    pub fn get_polytope(&self) -> Polytope {
        let mut a = Vec::new();
        let mut b = Vec::new();
        for (i, direction) in self.directions.iter().enumerate() {
            if self.upper[i].is_finite() {
                a.push(direction.clone());
                b.push(self.upper[i]);
            }
            if self.lower[i].is_finite() {
                a.push(complementary(direction));
                b.push(-self.lower[i]);
            }
        }
        Polytope::new(a, b).expect("bundle rows share the bundle dimension")
    }

    /// Whether the denoted set is empty
    pub fn is_empty(&self) -> bool {
        self.get_polytope().is_empty()
    }

    /// The parallelotope selected by template `i`
    pub fn get_parallelotope(&self, i: usize) -> Result<Parallelotope, GeometryError> {
        let template = self
            .templates
            .get(i)
            .ok_or(GeometryError::TemplateIndexOutOfRange {
                index: i,
                directions: self.templates.len(),
            })?;
        let rows: Matrix = template.iter().map(|&j| self.directions[j].clone()).collect();
        let lower: Vector = template.iter().map(|&j| self.lower[j]).collect();
        let upper: Vector = template.iter().map(|&j| self.upper[j]).collect();
        Parallelotope::new(rows, lower, upper)
    }

    /// The canonical form of the bundle
    ///
    /// Every offset is tightened to the support value of its direction on
    /// the denoted polytope; the denoted set does not change.
    pub fn get_canonical(&self) -> Bundle {
        let polytope = self.get_polytope();
        if polytope.is_empty() {
            return self.clone();
        }
        let mut canonical = self.clone();
        for (i, direction) in self.directions.iter().enumerate() {
            let up = polytope.maximize(direction);
            if up.status() == LpStatus::Optimal {
                canonical.upper[i] = up.optimum();
            }
            let lo = polytope.minimize(direction);
            if lo.status() == LpStatus::Optimal {
                canonical.lower[i] = lo.optimum();
            }
        }
        canonical
    }

    /// Whether this bundle denotes a subset of `other`
    pub fn is_subset_of(&self, other: &Bundle) -> bool {
        self.get_polytope().is_subset_of(&other.get_polytope())
    }

    /// Whether this bundle denotes a superset of `other`
    pub fn includes(&self, other: &Bundle) -> bool {
        other.is_subset_of(self)
    }

    /// Image of the bundle under the polynomial map `dynamics`
    ///
    /// The returned bundle has the same direction pool and templates with
    /// offsets bounding `ℓ · f(g(α))` over the unit box through Bernstein
    /// coefficients, minimized across templates.
    pub fn transform(
        &self,
        variables: &[Symbol],
        dynamics: &[Polynomial],
        cache: &ControlPointCache,
        mode: TransformMode,
    ) -> Result<Bundle, GeometryError> {
        let bound = |coefficient: &Polynomial| -> Result<(f64, f64), GeometryError> {
            let value = coefficient.as_constant().ok_or_else(|| {
                let symbol = coefficient.symbols().into_iter().next().unwrap();
                GeometryError::from(AlgebraError::NonConstant(symbol))
            })?;
            Ok((value, -value))
        };
        self.transform_impl(variables, dynamics, &bound, cache, mode)
    }

    /// Parametric image of the bundle
    ///
    /// The Bernstein coefficients are affine in the parameters; their
    /// extrema over `parameter_set` are obtained by LP.
    pub fn transform_parametric(
        &self,
        variables: &[Symbol],
        parameters: &[Symbol],
        dynamics: &[Polynomial],
        parameter_set: &Polytope,
        cache: &ControlPointCache,
        mode: TransformMode,
    ) -> Result<Bundle, GeometryError> {
        let bound = |coefficient: &Polynomial| -> Result<(f64, f64), GeometryError> {
            let up = parameter_set.maximize_expression(parameters, coefficient)?;
            let reversed = -coefficient.clone();
            let down = parameter_set.maximize_expression(parameters, &reversed)?;
            Ok((up.optimum(), down.optimum()))
        };
        self.transform_impl(variables, dynamics, &bound, cache, mode)
    }

    fn transform_impl(
        &self,
        variables: &[Symbol],
        dynamics: &[Polynomial],
        bound: &dyn Fn(&Polynomial) -> Result<(f64, f64), GeometryError>,
        cache: &ControlPointCache,
        mode: TransformMode,
    ) -> Result<Bundle, GeometryError> {
        let dim = self.dim();
        if variables.len() != dim || dynamics.len() != dim {
            return Err(GeometryError::DimensionMismatch {
                what: "transforming map",
                expected: dim,
                found: dynamics.len(),
            });
        }

        let pool_size = self.num_directions();
        let mut new_upper = vec![f64::INFINITY; pool_size];
        let mut new_lower_reversed = vec![f64::INFINITY; pool_size];
        let symbols = GeneratorSymbols::for_dimension(dim);
        let all_directions: Vec<usize> = (0..pool_size).collect();

        for (template_index, template) in self.templates.iter().enumerate() {
            let paratope = self.get_parallelotope(template_index)?;
            let generator = paratope.generator_function(&symbols);
            let signature = ControlPointCache::signature_of(&generator);
            let instantiation = paratope.instantiation(&symbols);

            let directions_to_bound: &[usize] = match mode {
                TransformMode::AllForOne => &all_directions,
                TransformMode::OneForOne => template,
            };

            // the composition f ∘ g is only needed on a cache miss and is
            // shared between the directions of this template
            let mut composition: Option<Vec<Polynomial>> = None;

            for &direction in directions_to_bound {
                let target = BoundTarget::Direction(direction);
                let coefficients = match cache.lookup(template, &target, signature) {
                    Some(coefficients) => coefficients,
                    None => {
                        let fog = composition.get_or_insert_with(|| {
                            compose_with_generator(dynamics, variables, &generator)
                        });
                        let mut objective = Polynomial::zero();
                        for (k, component) in fog.iter().enumerate() {
                            let c = self.directions[direction][k];
                            if c != 0.0 {
                                objective = objective + component.clone() * c;
                            }
                        }
                        let coefficients = bernstein_coefficients(&symbols.coord, &objective);
                        cache.store(template, target, signature, coefficients.clone());
                        coefficients
                    }
                };

                let mut max_upper = f64::NEG_INFINITY;
                let mut max_reversed = f64::NEG_INFINITY;
                for coefficient in &coefficients {
                    let instantiated = coefficient.substitute_values(&instantiation);
                    let (up, down) = bound(&instantiated)?;
                    max_upper = max_upper.max(up);
                    max_reversed = max_reversed.max(down);
                }

                new_upper[direction] = new_upper[direction].min(max_upper);
                new_lower_reversed[direction] = new_lower_reversed[direction].min(max_reversed);
            }
        }

        let new_lower: Vector = new_lower_reversed.iter().map(|v| -v).collect();
        trace!(
            "transformed bundle ({mode}): {} directions, {} templates",
            pool_size,
            self.num_templates()
        );

        let result = Bundle {
            directions: self.directions.clone(),
            lower: new_lower,
            upper: new_upper,
            templates: self.templates.clone(),
            adaptive: self.adaptive.clone(),
        };
        Ok(match mode {
            TransformMode::OneForOne => result.get_canonical(),
            TransformMode::AllForOne => result,
        })
    }

    /// Bernstein coefficients of an objective over one template
    ///
    /// `objective` is a polynomial in the state variables; it is composed
    /// with the template's generator function and expanded in the Bernstein
    /// basis. The returned coefficients are instantiated with the numeric
    /// base vertex and edge lengths, so they only mention symbols that are
    /// foreign to the bundle (the parameters). Used by the synthesis
    /// engine for atomic predicates.
    pub fn composition_coefficients(
        &self,
        template_index: usize,
        objective: &Polynomial,
        variables: &[Symbol],
        cache: &ControlPointCache,
        target: BoundTarget,
    ) -> Result<Vec<Polynomial>, GeometryError> {
        let dim = self.dim();
        if variables.len() != dim {
            return Err(GeometryError::DimensionMismatch {
                what: "objective variables",
                expected: dim,
                found: variables.len(),
            });
        }
        let template = self
            .templates
            .get(template_index)
            .ok_or(GeometryError::TemplateIndexOutOfRange {
                index: template_index,
                directions: self.templates.len(),
            })?;
        let paratope = self.get_parallelotope(template_index)?;
        let symbols = GeneratorSymbols::for_dimension(dim);
        let generator = paratope.generator_function(&symbols);
        let signature = ControlPointCache::signature_of(&generator);

        let coefficients = match cache.lookup(template, &target, signature) {
            Some(coefficients) => coefficients,
            None => {
                let replacements: BTreeMap<Symbol, Polynomial> = variables
                    .iter()
                    .cloned()
                    .zip(generator.iter().cloned())
                    .collect();
                let composed = objective.substitute(&replacements);
                let coefficients = bernstein_coefficients(&symbols.coord, &composed);
                cache.store(template, target, signature, coefficients.clone());
                coefficients
            }
        };

        let instantiation = paratope.instantiation(&symbols);
        Ok(coefficients
            .iter()
            .map(|c| c.substitute_values(&instantiation))
            .collect())
    }

    /// Intersect the bundle with a system of affine constraints
    ///
    /// Each constraint row either tightens the offsets of a parallel
    /// direction already in the pool or joins the pool as a new direction.
    /// The result is canonicalized so the new directions carry finite
    /// bounds.
    pub fn intersect_with_constraints(&self, constraints: &Polytope) -> Result<Bundle, GeometryError> {
        if constraints.size() > 0 && constraints.dim() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                what: "bundle constraint system",
                expected: self.dim(),
                found: constraints.dim(),
            });
        }
        let mut result = self.clone();
        for (row, &beta) in constraints
            .constraint_matrix()
            .iter()
            .zip(constraints.offsets())
        {
            result.merge_constraint(row, beta);
        }
        Ok(result.get_canonical())
    }

    /// Intersect two bundles sharing one space
    ///
    /// Directions of `other` merge into the pool as in
    /// [`intersect_with_constraints`](Bundle::intersect_with_constraints);
    /// templates of `other` are carried over, re-indexed onto the merged
    /// pool.
    pub fn intersect_with_bundle(&self, other: &Bundle) -> Result<Bundle, GeometryError> {
        if other.dim() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                what: "bundle intersection",
                expected: self.dim(),
                found: other.dim(),
            });
        }
        let mut result = self.clone();
        let mut index_map = Vec::with_capacity(other.num_directions());
        for (i, row) in other.directions.iter().enumerate() {
            let merged = result.merge_direction(row, other.lower[i], other.upper[i]);
            index_map.push(merged);
        }
        for template in &other.templates {
            let remapped: Vec<usize> = template.iter().map(|&i| index_map[i]).collect();
            if !result
                .templates
                .iter()
                .any(|t| is_permutation(t, &remapped))
            {
                result.templates.push(remapped);
            }
        }
        Ok(result.get_canonical())
    }

    /// Fold a single constraint `row · x ≤ beta` into the pool
    fn merge_constraint(&mut self, row: &[f64], beta: f64) {
        for (i, direction) in self.directions.iter().enumerate() {
            if let Some(lambda) = linear_dependence(direction, row) {
                // row = λ · direction
                if lambda > 0.0 {
                    self.upper[i] = self.upper[i].min(beta / lambda);
                } else {
                    self.lower[i] = self.lower[i].max(beta / lambda);
                }
                return;
            }
        }
        self.directions.push(row.to_vec());
        self.upper.push(beta);
        self.lower.push(f64::NEG_INFINITY);
    }

    /// Fold a two-sided direction into the pool, returning its pool index
    fn merge_direction(&mut self, row: &[f64], lower: f64, upper: f64) -> usize {
        for (i, direction) in self.directions.iter().enumerate() {
            if let Some(lambda) = linear_dependence(direction, row) {
                // row = λ · direction, so the bounds rescale by 1/λ
                let (mut lo, mut up) = (lower / lambda, upper / lambda);
                if lambda < 0.0 {
                    std::mem::swap(&mut lo, &mut up);
                }
                self.upper[i] = self.upper[i].min(up);
                self.lower[i] = self.lower[i].max(lo);
                return i;
            }
        }
        self.directions.push(row.to_vec());
        self.upper.push(upper);
        self.lower.push(lower);
        self.num_directions() - 1
    }

    /// Half-space distances of the pool, used by the decomposition cost
    fn offset_distances(&self) -> Vector {
        self.directions
            .iter()
            .enumerate()
            .map(|(i, d)| (self.upper[i] - self.lower[i]).abs() / norm(d))
            .collect()
    }

    fn max_offset_distance(&self, templates: &[Vec<usize>], distances: &[f64]) -> f64 {
        templates
            .iter()
            .map(|t| t.iter().map(|&i| distances[i]).product::<f64>())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn max_orthogonal_proximity(&self, templates: &[Vec<usize>]) -> f64 {
        let mut max_prox = f64::NEG_INFINITY;
        for template in templates {
            let mut prox: f64 = 0.0;
            for (pos, &i) in template.iter().enumerate() {
                for &j in &template[pos + 1..] {
                    prox = prox.max(orthogonal_proximity(
                        &self.directions[i],
                        &self.directions[j],
                    ));
                }
            }
            max_prox = max_prox.max(prox);
        }
        max_prox
    }

    /// Randomized template refinement
    ///
    /// Generates up to `max_iters` candidate template sets by swapping one
    /// direction index in one template, rejecting swaps that duplicate a
    /// template or break the basis property, and keeps the candidate with
    /// the lowest cost `weight · Π dists + (1 − weight) · max proximity`.
    pub fn decompose(&self, weight: f64, max_iters: u32) -> Bundle {
        let mut rng = rand::thread_rng();
        let distances = self.offset_distances();

        let mut current = self.templates.clone();
        let mut best = self.templates.clone();

        for _ in 0..max_iters {
            let mut candidate = current.clone();
            let t = rng.gen_range(0..candidate.len());
            let slot = rng.gen_range(0..self.dim());
            candidate[t][slot] = rng.gen_range(0..self.num_directions());

            let duplicate = candidate
                .iter()
                .enumerate()
                .any(|(j, other)| j != t && is_permutation(&candidate[t], other));
            if duplicate {
                continue;
            }

            let rows: Matrix = candidate[t]
                .iter()
                .map(|&i| self.directions[i].clone())
                .collect();
            if !is_nonsingular(&rows) {
                continue;
            }

            let cost = |templates: &[Vec<usize>]| {
                weight * self.max_offset_distance(templates, &distances)
                    + (1.0 - weight) * self.max_orthogonal_proximity(templates)
            };
            if cost(&candidate) < cost(&best) {
                best = candidate.clone();
            }
            current = candidate;
        }

        Bundle {
            directions: self.directions.clone(),
            lower: self.lower.clone(),
            upper: self.upper.clone(),
            templates: best,
            adaptive: self.adaptive.clone(),
        }
    }
}

/// Substitute the generator function for the state variables of a map
fn compose_with_generator(
    dynamics: &[Polynomial],
    variables: &[Symbol],
    generator: &[Polynomial],
) -> Vec<Polynomial> {
    let replacements: BTreeMap<Symbol, Polynomial> = variables
        .iter()
        .cloned()
        .zip(generator.iter().cloned())
        .collect();
    dynamics.iter().map(|f| f.substitute(&replacements)).collect()
}

impl PartialEq for Bundle {
    /// Set-semantic equality on the denoted polytopes
    fn eq(&self, other: &Self) -> bool {
        self.get_polytope() == other.get_polytope()
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_polytope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_a() -> Matrix {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0],
        ]
    }

    fn pool_b() -> Matrix {
        vec![
            vec![1.0, 1.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0],
        ]
    }

    fn zeros(n: usize) -> Vector {
        vec![0.0; n]
    }

    #[test]
    fn test_bundle_denotes_polytope() {
        let b1 = Bundle::new(
            pool_a(),
            zeros(5),
            vec![5.0, 5.0, 5.0, 3.0, 7.0],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        )
        .unwrap();
        assert_eq!(b1.dim(), 3);

        let mut a = pool_a();
        a.extend(pool_a().iter().map(|r| complementary(r)));
        let expected =
            Polytope::new(a, vec![5.0, 5.0, 5.0, 3.0, 7.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(b1.get_polytope(), expected);
    }

    #[test]
    fn test_bundle_equality_under_alternate_directions() {
        let b1 = Bundle::new(
            pool_a(),
            zeros(5),
            vec![5.0, 5.0, 5.0, 3.0, 7.0],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        )
        .unwrap();
        let b2 = Bundle::new(
            pool_b(),
            zeros(5),
            vec![3.0, 5.0, 5.0, 7.0, 5.0],
            vec![vec![2, 1, 4]],
        )
        .unwrap();
        let b3 = Bundle::new(
            pool_b(),
            zeros(5),
            vec![3.0, 5.0, 5.0, 2.0, 5.0],
            vec![vec![2, 1, 4]],
        )
        .unwrap();

        assert_eq!(b1, b2);
        assert_ne!(b1, b3);
    }

    #[test]
    fn test_bundle_construction_errors() {
        let t = vec![vec![0, 1, 2], vec![0, 3, 4]];
        // mismatched offset lengths
        assert!(Bundle::new(pool_a(), zeros(4), vec![5.0; 5], t.clone()).is_err());
        assert!(Bundle::new(pool_a(), zeros(5), vec![5.0; 4], t.clone()).is_err());
        assert!(Bundle::new(pool_a(), zeros(6), vec![5.0; 5], t.clone()).is_err());
        // malformed templates
        assert!(Bundle::new(pool_a(), zeros(5), vec![5.0; 5], vec![vec![7]]).is_err());
        assert!(Bundle::new(pool_a(), zeros(5), vec![5.0; 5], vec![vec![7, 0, 0]]).is_err());
        assert!(Bundle::new(pool_a(), zeros(5), vec![5.0; 5], vec![vec![0, 0, 0]]).is_err());
        // no templates at all
        assert!(Bundle::new(pool_a(), zeros(5), vec![5.0; 5], vec![]).is_err());
    }

    #[test]
    fn test_empty_bundle() {
        let t = vec![vec![0, 1, 2], vec![0, 3, 4]];
        let full = Bundle::new(pool_a(), zeros(5), vec![5.0, 5.0, 5.0, 3.0, 7.0], t.clone())
            .unwrap();
        let empty =
            Bundle::new(pool_a(), zeros(5), vec![-5.0, 5.0, 5.0, 3.0, 7.0], t).unwrap();
        assert!(!full.is_empty());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_canonical_preserves_set_and_tightens() {
        // the slack pool directions 3 and 4 are not tight on the box
        let b = Bundle::new(
            pool_a(),
            zeros(5),
            vec![1.0, 1.0, 1.0, 10.0, 10.0],
            vec![vec![0, 1, 2]],
        )
        .unwrap();
        let canonical = b.get_canonical();
        assert_eq!(b, canonical);
        // support of x+y over the unit box is 2
        assert!((canonical.upper_bounds()[3] - 2.0).abs() < 1e-9);
        assert!((canonical.upper_bounds()[4] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_image() {
        let cache = ControlPointCache::new();
        let vars = [Symbol::new("x"), Symbol::new("y"), Symbol::new("z")];
        let dynamics = [
            Polynomial::variable("x"),
            Polynomial::variable("y"),
            Polynomial::variable("z"),
        ];
        let b = Bundle::new(
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
            zeros(3),
            vec![5.0, 5.0, 5.0],
            vec![vec![0, 1, 2]],
        )
        .unwrap();

        let image = b
            .transform(&vars, &dynamics, &cache, TransformMode::OneForOne)
            .unwrap();
        assert_eq!(image, b);
    }

    #[test]
    fn test_image_contains_quadratic_map_values() {
        // f(x) = x^2 on [0, 2]: the image offsets must enclose [0, 4]
        let cache = ControlPointCache::new();
        let vars = [Symbol::new("x")];
        let dynamics = [Polynomial::variable("x").pow(2)];
        let b = Bundle::new(vec![vec![1.0]], vec![0.0], vec![2.0], vec![vec![0]]).unwrap();

        let image = b
            .transform(&vars, &dynamics, &cache, TransformMode::OneForOne)
            .unwrap();
        assert!(image.upper_bounds()[0] >= 4.0 - 1e-9);
        assert!(image.lower_bounds()[0] <= 1e-9);
    }

    #[test]
    fn test_transform_reuses_cached_control_points() {
        let cache = ControlPointCache::new();
        let vars = [Symbol::new("x")];
        let dynamics = [Polynomial::variable("x") * 2.0];
        let b = Bundle::new(vec![vec![1.0]], vec![0.0], vec![1.0], vec![vec![0]]).unwrap();

        let first = b
            .transform(&vars, &dynamics, &cache, TransformMode::AllForOne)
            .unwrap();
        assert_eq!(cache.len(), 1);
        // the second step hits the cache: same pool, new offsets
        let second = first
            .transform(&vars, &dynamics, &cache, TransformMode::AllForOne)
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!((second.upper_bounds()[0] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersect_with_constraints_parallel_row_tightens() {
        let b = Bundle::new(
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            zeros(2),
            vec![4.0, 4.0],
            vec![vec![0, 1]],
        )
        .unwrap();
        // 2x <= 4 tightens the first direction to x <= 2
        let constraints = Polytope::new(vec![vec![2.0, 0.0]], vec![4.0]).unwrap();
        let tightened = b.intersect_with_constraints(&constraints).unwrap();
        assert_eq!(tightened.num_directions(), 2);
        assert!((tightened.upper_bounds()[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersect_with_constraints_new_direction() {
        let b = Bundle::new(
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            zeros(2),
            vec![4.0, 4.0],
            vec![vec![0, 1]],
        )
        .unwrap();
        let constraints = Polytope::new(vec![vec![1.0, 1.0]], vec![3.0]).unwrap();
        let cut = b.intersect_with_constraints(&constraints).unwrap();
        assert_eq!(cut.num_directions(), 3);
        // the canonical lower bound of the new direction is 0
        assert!(cut.lower_bounds()[2].abs() < 1e-9);
        let res = cut.get_polytope().maximize(&[1.0, 1.0]);
        assert!((res.optimum() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersect_bundles() {
        let b1 = Bundle::new(
            pool_a(),
            zeros(5),
            vec![5.0, 5.0, 5.0, 3.0, 7.0],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        )
        .unwrap();
        let b4 = Bundle::new(
            pool_a(),
            vec![1.0; 5],
            vec![5.0, 5.0, 5.0, 3.0, 7.0],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        )
        .unwrap();

        let both = b1.intersect_with_bundle(&b1).unwrap();
        assert_eq!(both, b1);

        let both = b1.intersect_with_bundle(&b4).unwrap();
        assert_eq!(both, b4);
        assert_ne!(both, b1);
        assert_eq!(both, b4.intersect_with_bundle(&b1).unwrap());
    }

    #[test]
    fn test_decompose_keeps_set_and_template_count() {
        let b = Bundle::new(
            pool_a(),
            zeros(5),
            vec![5.0, 5.0, 5.0, 3.0, 7.0],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        )
        .unwrap();
        let decomposed = b.decompose(0.5, 50);
        assert_eq!(decomposed.num_templates(), b.num_templates());
        assert_eq!(decomposed.num_directions(), b.num_directions());
        // offsets are untouched, so the denoted polytope is unchanged
        assert_eq!(decomposed, b);
        // every refined template still selects a basis
        for template in decomposed.templates() {
            let rows: Matrix = template
                .iter()
                .map(|&i| decomposed.directions()[i].clone())
                .collect();
            assert!(is_nonsingular(&rows));
        }
    }
}
