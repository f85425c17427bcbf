//! Half-space intersection sets
//!
//! A [`Polytope`] is the set `{x : Ax ≤ b}`. It may be empty and it may be
//! unbounded; every query is answered through the LP facade. Inclusion and
//! equality are set-semantic: two polytopes with different constraint
//! systems compare equal when they denote the same set.

use std::fmt;

use polyreach_algebra::{Polynomial, Symbol};
use polyreach_display_utils::format_coefficients;

use crate::error::GeometryError;
use crate::linear_algebra::{Matrix, Vector};
use crate::lp::{optimize, LpStatus, OptimizationResult};
use crate::GEOMETRY_TOLERANCE;

/// Check whether two constraints are exactly the same
fn same_constraint(a1: &[f64], b1: f64, a2: &[f64], b2: f64) -> bool {
    a1.len() == a2.len() && b1 == b2 && a1.iter().zip(a2).all(|(x, y)| x == y)
}

/// An intersection of half-spaces `{x : Ax ≤ b}`
#[derive(Debug, Clone)]
pub struct Polytope {
    a: Matrix,
    b: Vector,
}

impl Polytope {
    /// Build a polytope from a constraint matrix and offset vector
    ///
    /// Rows must all have the same length and there must be exactly one
    /// offset per row. Exact duplicate constraints are dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_geometry::Polytope;
    ///
    /// // the unit interval on the x axis
    /// let p = Polytope::new(vec![vec![1.0], vec![-1.0]], vec![1.0, 0.0]).unwrap();
    /// assert!(!p.is_empty());
    /// assert_eq!(p.dim(), 1);
    /// ```
    pub fn new(a: Matrix, b: Vector) -> Result<Self, GeometryError> {
        if a.len() != b.len() {
            return Err(GeometryError::DimensionMismatch {
                what: "polytope offsets",
                expected: a.len(),
                found: b.len(),
            });
        }
        let dim = a.first().map(|row| row.len()).unwrap_or(0);
        let mut polytope = Polytope {
            a: Vec::new(),
            b: Vec::new(),
        };
        for (row, bi) in a.into_iter().zip(b) {
            if row.len() != dim {
                return Err(GeometryError::DimensionMismatch {
                    what: "polytope constraint",
                    expected: dim,
                    found: row.len(),
                });
            }
            if !polytope.contains_constraint(&row, bi) {
                polytope.a.push(row);
                polytope.b.push(bi);
            }
        }
        Ok(polytope)
    }

    /// Build a polytope from affine constraints `e ≤ 0` over named symbols
    ///
    /// Every expression must be affine in `symbols` and mention no other
    /// symbol.
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_algebra::{Polynomial, Symbol};
    /// use polyreach_geometry::Polytope;
    ///
    /// let x = Symbol::new("x");
    /// // x - 3 <= 0
    /// let e = Polynomial::variable("x") - 3.0;
    /// let p = Polytope::from_constraints(&[x], &[e]).unwrap();
    /// assert_eq!(p.size(), 1);
    /// ```
    pub fn from_constraints(
        symbols: &[Symbol],
        constraints: &[Polynomial],
    ) -> Result<Self, GeometryError> {
        let mut a = Vec::new();
        let mut b = Vec::new();
        for e in constraints {
            let (coefficients, constant) = e.to_affine(symbols)?;
            a.push(coefficients);
            b.push(-constant);
        }
        Polytope::new(a, b)
    }

    /// Whether an identical constraint is already present
    fn contains_constraint(&self, row: &[f64], bi: f64) -> bool {
        self.a
            .iter()
            .zip(&self.b)
            .any(|(ai, bj)| same_constraint(ai, *bj, row, bi))
    }

    /// Space dimension of the polytope
    pub fn dim(&self) -> usize {
        self.a.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Number of constraints
    pub fn size(&self) -> usize {
        self.a.len()
    }

    /// The constraint matrix
    pub fn constraint_matrix(&self) -> &Matrix {
        &self.a
    }

    /// The offset vector
    pub fn offsets(&self) -> &Vector {
        &self.b
    }

    /// Maximize a linear objective over the polytope
    pub fn maximize(&self, obj: &[f64]) -> OptimizationResult {
        optimize(&self.a, &self.b, obj, true)
    }

    /// Minimize a linear objective over the polytope
    pub fn minimize(&self, obj: &[f64]) -> OptimizationResult {
        optimize(&self.a, &self.b, obj, false)
    }

    /// Maximize an affine expression over the polytope
    ///
    /// The expression must be affine in `symbols`; its constant term shifts
    /// the reported optimum.
    pub fn maximize_expression(
        &self,
        symbols: &[Symbol],
        expression: &Polynomial,
    ) -> Result<OptimizationResult, GeometryError> {
        let (coefficients, constant) = expression.to_affine(symbols)?;
        Ok(self.maximize(&coefficients).shifted(constant))
    }

    /// Minimize an affine expression over the polytope
    pub fn minimize_expression(
        &self,
        symbols: &[Symbol],
        expression: &Polynomial,
    ) -> Result<OptimizationResult, GeometryError> {
        let (coefficients, constant) = expression.to_affine(symbols)?;
        Ok(self.minimize(&coefficients).shifted(constant))
    }

    /// Whether every solution satisfies `c · x ≤ β`
    ///
    /// Requires feasibility: an empty constraint system (the whole space)
    /// satisfies nothing.
    pub fn satisfies(&self, c: &[f64], beta: f64) -> bool {
        if self.size() == 0 {
            return false;
        }
        let res = self.maximize(c);
        res.status() == LpStatus::Optimal && res.optimum() <= beta + GEOMETRY_TOLERANCE
    }

    /// Whether the polytope is a subset of `other`
    ///
    /// The empty set is a subset of everything.
    pub fn is_subset_of(&self, other: &Polytope) -> bool {
        if !self.has_solutions(false) {
            return true;
        }
        other
            .a
            .iter()
            .zip(&other.b)
            .all(|(row, bi)| self.satisfies(row, *bi))
    }

    /// Whether the polytope contains `other`
    pub fn includes(&self, other: &Polytope) -> bool {
        other.is_subset_of(self)
    }

    /// Whether a feasible point exists
    ///
    /// With `strict` the polytope must additionally have non-empty
    /// interior: no direction of the system may be pinned to a point.
    pub fn has_solutions(&self, strict: bool) -> bool {
        if self.size() == 0 {
            return true;
        }
        if !strict {
            let res = self.maximize(&self.a[0]);
            return matches!(res.status(), LpStatus::Optimal | LpStatus::Unbounded);
        }
        for row in &self.a {
            let upper = self.maximize(row);
            if upper.status() == LpStatus::Infeasible {
                return false;
            }
            let lower = self.minimize(row);
            if lower.status() == LpStatus::Infeasible {
                return false;
            }
            if upper.optimum() == lower.optimum() {
                return false;
            }
        }
        true
    }

    /// Whether no point satisfies the constraints
    pub fn is_empty(&self) -> bool {
        !self.has_solutions(false)
    }

    /// Whether constraint `i` can be removed without changing the set
    fn constraint_is_redundant(&self, i: usize) -> bool {
        let mut reduced = self.clone();
        let row = std::mem::replace(&mut reduced.a[i], vec![0.0; self.dim()]);
        let bi = std::mem::replace(&mut reduced.b[i], 0.0);
        reduced.satisfies(&row, bi)
    }

    /// Remove redundant constraints in place
    ///
    /// The relative order of the surviving constraints is unspecified:
    /// redundant rows are swapped towards the tail and truncated, one LP
    /// per row. When two constraints are mutually redundant the one
    /// scanned first is removed.
    pub fn simplify(&mut self) -> &mut Self {
        if self.size() == 0 || self.is_empty() {
            return self;
        }

        let mut i = 0;
        let mut last_non_redundant = self.size() - 1;

        while i < last_non_redundant {
            if self.constraint_is_redundant(i) {
                self.a.swap(i, last_non_redundant);
                self.b.swap(i, last_non_redundant);
                last_non_redundant -= 1;
            } else {
                i += 1;
            }
        }

        let new_len = if self.constraint_is_redundant(last_non_redundant) {
            last_non_redundant
        } else {
            last_non_redundant + 1
        };
        self.a.truncate(new_len);
        self.b.truncate(new_len);

        self
    }

    /// A copy of the polytope without redundant constraints
    pub fn get_simplified(&self) -> Polytope {
        let mut copy = self.clone();
        copy.simplify();
        copy
    }

    /// Add a single constraint `c · x ≤ β`, skipping exact duplicates
    pub fn add_constraint(&mut self, row: Vector, beta: f64) -> Result<(), GeometryError> {
        if self.size() > 0 && row.len() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                what: "polytope constraint",
                expected: self.dim(),
                found: row.len(),
            });
        }
        if !self.contains_constraint(&row, beta) {
            self.a.push(row);
            self.b.push(beta);
        }
        Ok(())
    }

    /// Split the polytope in two halves along its widest bounded axis
    ///
    /// Returns `None` when no axis is bounded in both directions (nothing
    /// sensible to bisect) or the polytope is empty.
    pub fn split_along_longest_axis(&self) -> Option<(Polytope, Polytope)> {
        if self.is_empty() {
            return None;
        }
        let dim = self.dim();
        let mut best: Option<(usize, f64, f64)> = None;
        for j in 0..dim {
            let mut direction = vec![0.0; dim];
            direction[j] = 1.0;
            let upper = self.maximize(&direction);
            let lower = self.minimize(&direction);
            if upper.status() != LpStatus::Optimal || lower.status() != LpStatus::Optimal {
                continue;
            }
            let width = upper.optimum() - lower.optimum();
            let mid = (upper.optimum() + lower.optimum()) / 2.0;
            match best {
                Some((_, best_width, _)) if best_width >= width => {}
                _ => best = Some((j, width, mid)),
            }
        }

        let (axis, _, mid) = best?;
        let mut row = vec![0.0; dim];
        row[axis] = 1.0;

        let mut lower_half = self.clone();
        lower_half.a.push(row.clone());
        lower_half.b.push(mid);

        let mut upper_half = self.clone();
        upper_half.a.push(row.iter().map(|c| -c).collect());
        upper_half.b.push(-mid);

        Some((lower_half, upper_half))
    }
}

/// Intersection of two polytopes of the same dimension
pub fn intersect(p1: &Polytope, p2: &Polytope) -> Result<Polytope, GeometryError> {
    if p1.size() > 0 && p2.size() > 0 && p1.dim() != p2.dim() {
        return Err(GeometryError::DimensionMismatch {
            what: "polytope intersection",
            expected: p1.dim(),
            found: p2.dim(),
        });
    }
    let mut result = p1.clone();
    for (row, bi) in p2.a.iter().zip(&p2.b) {
        result.add_constraint(row.clone(), *bi)?;
    }
    Ok(result)
}

impl PartialEq for Polytope {
    /// Set-semantic equality: mutual inclusion of the denoted sets
    fn eq(&self, other: &Self) -> bool {
        self.is_subset_of(other) && other.is_subset_of(self)
    }
}

impl fmt::Display for Polytope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (row, bi)) in self.a.iter().zip(&self.b).enumerate() {
            if idx != 0 {
                writeln!(f)?;
            }
            write!(f, "{} <= {}", format_coefficients(row), bi)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(dim: usize) -> Polytope {
        let mut a = Vec::new();
        let mut b = Vec::new();
        for j in 0..dim {
            let mut up = vec![0.0; dim];
            up[j] = 1.0;
            a.push(up.clone());
            b.push(1.0);
            a.push(up.iter().map(|c| -c).collect());
            b.push(0.0);
        }
        Polytope::new(a, b).unwrap()
    }

    #[test]
    fn test_new_rejects_offset_mismatch() {
        let err = Polytope::new(vec![vec![1.0]], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, GeometryError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_new_drops_duplicates() {
        let p = Polytope::new(vec![vec![1.0], vec![1.0]], vec![1.0, 1.0]).unwrap();
        assert_eq!(p.size(), 1);
    }

    #[test]
    fn test_support_values_on_box() {
        let p = unit_box(2);
        let res = p.maximize(&[1.0, 1.0]);
        assert!((res.optimum() - 2.0).abs() < 1e-9);
        let res = p.minimize(&[1.0, 0.0]);
        assert!(res.optimum().abs() < 1e-9);
    }

    #[test]
    fn test_satisfies() {
        let p = unit_box(2);
        assert!(p.satisfies(&[1.0, 0.0], 1.0));
        assert!(!p.satisfies(&[1.0, 0.0], 0.5));
    }

    #[test]
    fn test_inclusion() {
        let big = unit_box(1);
        let small = Polytope::new(vec![vec![1.0], vec![-1.0]], vec![0.5, 0.0]).unwrap();
        assert!(small.is_subset_of(&big));
        assert!(big.includes(&small));
        assert!(!big.is_subset_of(&small));
    }

    #[test]
    fn test_empty_is_subset_of_everything() {
        let empty = Polytope::new(vec![vec![1.0], vec![-1.0]], vec![0.0, -1.0]).unwrap();
        assert!(empty.is_empty());
        assert!(empty.is_subset_of(&unit_box(1)));
    }

    #[test]
    fn test_intersect_with_empty_is_empty() {
        let empty = Polytope::new(vec![vec![1.0], vec![-1.0]], vec![0.0, -1.0]).unwrap();
        let both = intersect(&unit_box(1), &empty).unwrap();
        assert!(both.is_empty());
    }

    #[test]
    fn test_has_solutions_strict() {
        // the segment x ∈ [0,1], y = 0 has solutions but no interior
        let a = vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, -1.0],
        ];
        let b = vec![1.0, 0.0, 0.0, 0.0];
        let segment = Polytope::new(a, b).unwrap();
        assert!(segment.has_solutions(false));
        assert!(!segment.has_solutions(true));
        assert!(unit_box(2).has_solutions(true));
    }

    #[test]
    fn test_simplify_removes_redundant_rows() {
        let mut p = Polytope::new(
            vec![vec![1.0], vec![1.0], vec![-1.0]],
            vec![1.0, 2.0, 0.0],
        )
        .unwrap();
        p.simplify();
        assert_eq!(p.size(), 2);
        // the set is unchanged
        assert_eq!(p, unit_box(1));
    }

    #[test]
    fn test_simplify_keeps_scaled_duplicates_single() {
        // x <= 1 and 2x <= 2 denote the same half-space
        let mut p = Polytope::new(
            vec![vec![1.0], vec![2.0], vec![-1.0]],
            vec![1.0, 2.0, 0.0],
        )
        .unwrap();
        p.simplify();
        assert_eq!(p.size(), 2);
    }

    #[test]
    fn test_set_equality_across_representations() {
        let p1 = unit_box(1);
        let p2 = Polytope::new(vec![vec![2.0], vec![-4.0]], vec![2.0, 0.0]).unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_from_constraints_rejects_nonlinear() {
        let x = Symbol::new("x");
        let e = Polynomial::variable("x").pow(2) - 1.0;
        assert!(Polytope::from_constraints(&[x], &[e]).is_err());
    }

    #[test]
    fn test_split_along_longest_axis() {
        // [0,1] x [0,4]: the split must run along the y axis
        let a = vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, -1.0],
        ];
        let b = vec![1.0, 0.0, 4.0, 0.0];
        let p = Polytope::new(a, b).unwrap();
        let (low, high) = p.split_along_longest_axis().unwrap();
        let res = low.maximize(&[0.0, 1.0]);
        assert!((res.optimum() - 2.0).abs() < 1e-9);
        let res = high.minimize(&[0.0, 1.0]);
        assert!((res.optimum() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_maximize_expression_shifts_constant() {
        let p = unit_box(1);
        let e = 2.0 * Polynomial::variable("x") + 3.0;
        let res = p
            .maximize_expression(&[Symbol::new("x")], &e)
            .unwrap();
        assert!((res.optimum() - 5.0).abs() < 1e-9);
    }
}
