//! STL parameter synthesis
//!
//! `synthesize` refines a parameter region against an STL formula: for
//! every parameter valuation in the returned subset, every trajectory from
//! the initial set satisfies the formula. The
//! recursion follows the formula structure, interleaving parametric image
//! computation with the formula semantics; a splitting driver retries on
//! bisected parameter regions when the refinement comes back empty.

use std::sync::Mutex;

use log::{debug, info};

use polyreach_geometry::linear_algebra::Vector;
use polyreach_geometry::{
    intersect_unions, BoundTarget, Bundle, GeometryError, PolytopesUnion,
};
use polyreach_stl::{Atom, StlFormula};

use crate::analyzer::Analyzer;
use crate::error::EngineError;
use crate::progress::ProgressAccounter;

/// Split every member of a union along its widest axis
///
/// The two returned unions cover the input: members that cannot be split
/// (no axis bounded on both sides) stay in the left half.
fn split_union(
    pset: &PolytopesUnion,
) -> Result<(PolytopesUnion, PolytopesUnion), GeometryError> {
    let mut left = PolytopesUnion::new();
    let mut right = PolytopesUnion::new();
    for member in pset {
        match member.split_along_longest_axis() {
            Some((lo, hi)) => {
                left.add(lo)?;
                right.add(hi)?;
            }
            None => {
                left.add(member.clone())?;
            }
        }
    }
    Ok((left, right))
}

/// Eagerly bisect a region `depth` times, collecting the leaves
fn presplit_leaves(
    pset: &PolytopesUnion,
    depth: u32,
) -> Result<Vec<PolytopesUnion>, GeometryError> {
    let mut leaves = vec![pset.clone()];
    for _ in 0..depth {
        let mut next = Vec::with_capacity(leaves.len() * 2);
        for leaf in leaves {
            let (left, right) = split_union(&leaf)?;
            if !left.is_empty() {
                next.push(left);
            }
            if !right.is_empty() {
                next.push(right);
            }
        }
        leaves = next;
    }
    Ok(leaves)
}

impl Analyzer<'_> {
    /// Synthesize the parameter regions satisfying the model specification
    ///
    /// The formula is rewritten to positive normal form, the parameter
    /// region is pre-split to expose parallelism and each leaf of the
    /// split tree is refined independently on the worker pool. Leaves
    /// whose refinement is empty are bisected and retried down to the
    /// configured split depth. Returns the non-empty refined unions.
    pub fn synthesize(
        &self,
        progress: Option<&ProgressAccounter>,
    ) -> Result<Vec<PolytopesUnion>, EngineError> {
        let formula = self
            .model
            .specification
            .as_ref()
            .ok_or(EngineError::MissingSpecification)?
            .to_pnf()?;
        let initial = self.apply_step_constraints(self.model.initial_set.clone())?;

        let presplits = self.model.options.presplits.min(self.model.options.max_param_splits);
        let budget = self.model.options.max_param_splits - presplits;
        let leaves = presplit_leaves(&self.model.parameter_set, presplits)?;
        info!(
            "synthesis of '{}' over {} parameter leaves",
            formula,
            leaves.len()
        );

        // one slot per leaf keeps the output order independent of the
        // workers' scheduling
        let outcomes: Mutex<Vec<Option<Result<Vec<PolytopesUnion>, EngineError>>>> =
            Mutex::new((0..leaves.len()).map(|_| None).collect());
        let mut batch = self.pool.create_batch();
        for (index, leaf) in leaves.iter().enumerate() {
            let outcomes = &outcomes;
            let formula = &formula;
            let initial = &initial;
            batch.submit(move || {
                let refined = self.synthesize_with_retries(initial, leaf, formula, budget, progress);
                outcomes.lock().unwrap()[index] = Some(refined);
            });
        }
        batch.join();

        let mut refined = Vec::new();
        for outcome in outcomes.into_inner().unwrap_or_else(|e| e.into_inner()) {
            refined.extend(outcome.expect("every leaf task stores its outcome")?);
        }
        info!("synthesis produced {} non-empty refinements", refined.len());
        Ok(refined)
    }

    /// Refine one leaf, bisecting and retrying while the result is empty
    fn synthesize_with_retries(
        &self,
        initial: &Bundle,
        pset: &PolytopesUnion,
        formula: &StlFormula,
        budget: u32,
        progress: Option<&ProgressAccounter>,
    ) -> Result<Vec<PolytopesUnion>, EngineError> {
        let mut refined = self.synthesize_formula(initial, pset, formula, 0, progress)?;
        if !refined.is_empty() {
            refined.simplify();
            return Ok(vec![refined]);
        }
        if budget == 0 {
            return Ok(Vec::new());
        }
        debug!("empty refinement, splitting the parameter region ({budget} splits left)");
        let (left, right) = split_union(pset)?;
        let mut outcomes = self.synthesize_with_retries(initial, &left, formula, budget - 1, progress)?;
        outcomes.extend(self.synthesize_with_retries(initial, &right, formula, budget - 1, progress)?);
        Ok(outcomes)
    }

    /// The synthesis recursion over the formula structure
    ///
    /// Expects the formula in positive normal form; meeting a negation
    /// node is an error.
    fn synthesize_formula(
        &self,
        bundle: &Bundle,
        pset: &PolytopesUnion,
        formula: &StlFormula,
        time: u32,
        progress: Option<&ProgressAccounter>,
    ) -> Result<PolytopesUnion, EngineError> {
        if pset.is_empty() {
            return Ok(PolytopesUnion::new());
        }
        match formula {
            StlFormula::Atom(atom) => self.synthesize_atom(bundle, pset, atom),

            StlFormula::Conjunction(lhs, rhs) => {
                let left = self.synthesize_formula(bundle, pset, lhs, time, progress)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = self.synthesize_formula(bundle, pset, rhs, time, progress)?;
                Ok(intersect_unions(&left, &right)?)
            }

            StlFormula::Disjunction(lhs, rhs) => {
                let mut left = self.synthesize_formula(bundle, pset, lhs, time, progress)?;
                let right = self.synthesize_formula(bundle, pset, rhs, time, progress)?;
                left.update(right)?;
                Ok(left)
            }

            StlFormula::Negation(_) => Err(EngineError::NonPnfFormula),

            StlFormula::Always(interval, inner) => {
                if time < interval.begin() {
                    self.transition_and_synthesize(bundle, pset, formula, time, progress)
                } else if time < interval.end() {
                    let now = self.synthesize_formula(bundle, pset, inner, time, progress)?;
                    if now.is_empty() {
                        return Ok(now);
                    }
                    let later =
                        self.transition_and_synthesize(bundle, pset, formula, time, progress)?;
                    Ok(intersect_unions(&now, &later)?)
                } else {
                    // the last step of the interval: nothing to advance to
                    self.synthesize_formula(bundle, pset, inner, time, progress)
                }
            }

            StlFormula::Eventually(interval, inner) => {
                if time < interval.begin() {
                    self.transition_and_synthesize(bundle, pset, formula, time, progress)
                } else if time < interval.end() {
                    let mut now = self.synthesize_formula(bundle, pset, inner, time, progress)?;
                    let later =
                        self.transition_and_synthesize(bundle, pset, formula, time, progress)?;
                    now.update(later)?;
                    Ok(now)
                } else if time == interval.end() {
                    self.synthesize_formula(bundle, pset, inner, time, progress)
                } else {
                    Ok(PolytopesUnion::new())
                }
            }

            StlFormula::Until(interval, lhs, rhs) => {
                if time < interval.begin() {
                    let hold = self.synthesize_formula(bundle, pset, lhs, time, progress)?;
                    if hold.is_empty() {
                        return Ok(hold);
                    }
                    let later =
                        self.transition_and_synthesize(bundle, pset, formula, time, progress)?;
                    Ok(intersect_unions(&hold, &later)?)
                } else if time < interval.end() {
                    let mut done = self.synthesize_formula(bundle, pset, rhs, time, progress)?;
                    let hold = self.synthesize_formula(bundle, pset, lhs, time, progress)?;
                    if !hold.is_empty() {
                        let later =
                            self.transition_and_synthesize(bundle, pset, formula, time, progress)?;
                        done.update(intersect_unions(&hold, &later)?)?;
                    }
                    Ok(done)
                } else if time == interval.end() {
                    self.synthesize_formula(bundle, pset, rhs, time, progress)
                } else {
                    Ok(PolytopesUnion::new())
                }
            }
        }
    }

    /// Advance the bundle one step per parameter polytope, recursing on
    /// the formula at the next time instant
    fn transition_and_synthesize(
        &self,
        bundle: &Bundle,
        pset: &PolytopesUnion,
        formula: &StlFormula,
        time: u32,
        progress: Option<&ProgressAccounter>,
    ) -> Result<PolytopesUnion, EngineError> {
        let system = &self.model.system;
        let mode = self.model.options.transform_mode;

        let mut result = PolytopesUnion::new();
        for member in pset {
            let image = bundle.transform_parametric(
                system.variables(),
                system.parameters(),
                system.dynamics(),
                member,
                &self.reach_points,
                mode,
            )?;
            if let Some(p) = progress {
                p.increase_performed_by(1);
            }
            result.update(self.synthesize_formula(&image, pset, formula, time + 1, progress)?)?;
        }
        Ok(result)
    }

    /// Refinement for an atomic predicate `e(x) ≤ 0`
    ///
    /// The predicate is composed with the dynamics, so the refined
    /// parameters make the predicate hold on the image of the bundle. The
    /// Bernstein coefficients of the composition over each template are
    /// affine in the parameters; each yields one half-space of the
    /// refinement.
    fn synthesize_atom(
        &self,
        bundle: &Bundle,
        pset: &PolytopesUnion,
        atom: &Atom,
    ) -> Result<PolytopesUnion, EngineError> {
        let system = &self.model.system;
        let composed = atom.predicate().substitute(&system.replacement_map());

        let mut rows: Vec<(Vector, f64)> = Vec::new();
        for template in 0..bundle.num_templates() {
            let coefficients = bundle.composition_coefficients(
                template,
                &composed,
                system.variables(),
                &self.synth_points,
                BoundTarget::Predicate(atom.id()),
            )?;
            for coefficient in coefficients {
                // coefficient(p) ≤ 0 as a half-space over the parameters
                let (linear, constant) = coefficient
                    .to_affine(system.parameters())
                    .map_err(GeometryError::from)?;
                rows.push((linear, -constant));
            }
        }

        let mut result = PolytopesUnion::new();
        for member in pset {
            let mut refined = member.clone();
            for (row, beta) in &rows {
                refined.add_constraint(row.clone(), *beta)?;
            }
            refined.simplify();
            result.add(refined)?;
        }
        Ok(result)
    }
}
