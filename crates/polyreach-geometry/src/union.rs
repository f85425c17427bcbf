//! Inclusion-minimal unions of polytopes
//!
//! A [`PolytopesUnion`] keeps a list of pairwise non-comparable polytopes:
//! no member is a subset of another. Empty polytopes never enter the union,
//! so the union is empty exactly when its list is.

use std::fmt;
use std::slice;

use rayon::prelude::*;

use crate::error::GeometryError;
use crate::polytope::{intersect, Polytope};

/// An ordered union of pairwise non-comparable polytopes
#[derive(Debug, Clone, Default)]
pub struct PolytopesUnion {
    sets: Vec<Polytope>,
}

impl PolytopesUnion {
    /// The empty union
    pub fn new() -> Self {
        PolytopesUnion::default()
    }

    /// A union holding a single polytope (none if it is empty)
    pub fn from_polytope(polytope: Polytope) -> Self {
        let mut union = PolytopesUnion::new();
        // an empty polytope is silently discarded
        let _ = union.add(polytope);
        union
    }

    /// Add a polytope to the union
    ///
    /// Empty polytopes are discarded. If some member already includes the
    /// new polytope nothing changes; otherwise every member included in the
    /// new polytope is removed and the polytope is appended. Returns
    /// whether the polytope was appended.
    ///
    /// All members must share one dimension; mismatched insertion fails.
    pub fn add(&mut self, polytope: Polytope) -> Result<bool, GeometryError> {
        let compare = self.sets.len();
        self.add_compared(polytope, compare)
    }

    /// Add comparing only against the first `sets_to_cmp` members
    ///
    /// Members appended by earlier insertions of the same batch are known
    /// to be non-comparable already and are skipped.
    fn add_compared(
        &mut self,
        polytope: Polytope,
        sets_to_cmp: usize,
    ) -> Result<bool, GeometryError> {
        if let Some(first) = self.sets.first() {
            if first.dim() != polytope.dim() {
                return Err(GeometryError::DimensionMismatch {
                    what: "polytopes union",
                    expected: first.dim(),
                    found: polytope.dim(),
                });
            }
        }

        if polytope.is_empty() {
            return Ok(false);
        }

        let mut kept = Vec::with_capacity(self.sets.len() + 1);
        let mut include = true;
        for (idx, member) in self.sets.drain(..).enumerate() {
            if !include || idx >= sets_to_cmp {
                kept.push(member);
                continue;
            }
            if member.includes(&polytope) {
                include = false;
                kept.push(member);
            } else if !member.is_subset_of(&polytope) {
                kept.push(member);
            }
        }
        if include {
            kept.push(polytope);
        }
        self.sets = kept;
        Ok(include)
    }

    /// Join another union into this one
    pub fn update(&mut self, other: PolytopesUnion) -> Result<&mut Self, GeometryError> {
        let mut appended = 0;
        for polytope in other.sets {
            let compare = self.sets.len() - appended;
            if self.add_compared(polytope, compare)? {
                appended += 1;
            }
        }
        Ok(self)
    }

    /// Whether some member of the union includes `polytope`
    ///
    /// Membership checks are independent, so they are fanned out to worker
    /// threads and the scan stops as soon as one succeeds.
    pub fn any_includes(&self, polytope: &Polytope) -> bool {
        if polytope.is_empty() {
            return true;
        }
        self.sets
            .par_iter()
            .any(|member| polytope.is_subset_of(member))
    }

    /// Number of polytopes in the union
    pub fn size(&self) -> usize {
        self.sets.len()
    }

    /// The common space dimension, or 0 when the union is empty
    pub fn dim(&self) -> usize {
        self.sets.first().map(|p| p.dim()).unwrap_or(0)
    }

    /// Whether the union denotes the empty set
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterate over the members
    pub fn iter(&self) -> slice::Iter<'_, Polytope> {
        self.sets.iter()
    }

    /// Simplify the representation of every member
    pub fn simplify(&mut self) -> &mut Self {
        for polytope in &mut self.sets {
            polytope.simplify();
        }
        self
    }
}

impl<'a> IntoIterator for &'a PolytopesUnion {
    type Item = &'a Polytope;
    type IntoIter = slice::Iter<'a, Polytope>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

/// Pairwise intersection of two unions
///
/// The result keeps the non-comparability invariant through plain
/// insertion.
pub fn intersect_unions(
    a: &PolytopesUnion,
    b: &PolytopesUnion,
) -> Result<PolytopesUnion, GeometryError> {
    let mut result = PolytopesUnion::new();
    for p in a {
        for q in b {
            result.add(intersect(p, q)?)?;
        }
    }
    Ok(result)
}

impl fmt::Display for PolytopesUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty");
        }
        for (idx, polytope) in self.iter().enumerate() {
            if idx != 0 {
                writeln!(f)?;
                writeln!(f, "or")?;
            }
            write!(f, "{polytope}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(lo: f64, hi: f64) -> Polytope {
        Polytope::new(vec![vec![1.0], vec![-1.0]], vec![hi, -lo]).unwrap()
    }

    #[test]
    fn test_add_discards_empty() {
        let mut u = PolytopesUnion::new();
        assert!(!u.add(interval(1.0, 0.0)).unwrap());
        assert!(u.is_empty());
    }

    #[test]
    fn test_add_keeps_non_comparable() {
        let mut u = PolytopesUnion::new();
        assert!(u.add(interval(0.0, 1.0)).unwrap());
        assert!(u.add(interval(2.0, 3.0)).unwrap());
        assert_eq!(u.size(), 2);
    }

    #[test]
    fn test_add_discards_included() {
        let mut u = PolytopesUnion::new();
        u.add(interval(0.0, 2.0)).unwrap();
        assert!(!u.add(interval(0.5, 1.0)).unwrap());
        assert_eq!(u.size(), 1);
    }

    #[test]
    fn test_add_replaces_subsumed_members() {
        let mut u = PolytopesUnion::new();
        u.add(interval(0.0, 1.0)).unwrap();
        u.add(interval(2.0, 3.0)).unwrap();
        assert!(u.add(interval(-1.0, 4.0)).unwrap());
        assert_eq!(u.size(), 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut u = PolytopesUnion::new();
        u.add(interval(0.0, 1.0)).unwrap();
        let square =
            Polytope::new(vec![vec![1.0, 0.0], vec![-1.0, 0.0]], vec![1.0, 0.0]).unwrap();
        assert!(u.add(square).is_err());
    }

    #[test]
    fn test_no_member_is_subset_of_another() {
        let mut u = PolytopesUnion::new();
        u.add(interval(0.0, 2.0)).unwrap();
        u.add(interval(1.0, 3.0)).unwrap();
        u.add(interval(0.5, 2.5)).unwrap();
        for (i, p) in u.iter().enumerate() {
            for (j, q) in u.iter().enumerate() {
                if i != j {
                    assert!(!p.is_subset_of(q));
                }
            }
        }
    }

    #[test]
    fn test_any_includes() {
        let mut u = PolytopesUnion::new();
        u.add(interval(0.0, 1.0)).unwrap();
        u.add(interval(5.0, 6.0)).unwrap();
        assert!(u.any_includes(&interval(5.5, 6.0)));
        assert!(!u.any_includes(&interval(0.5, 5.5)));
        // the empty set is included in anything
        assert!(u.any_includes(&interval(1.0, 0.0)));
    }

    #[test]
    fn test_update_unions() {
        let mut u = PolytopesUnion::new();
        u.add(interval(0.0, 1.0)).unwrap();
        let mut v = PolytopesUnion::new();
        v.add(interval(0.5, 2.0)).unwrap();
        v.add(interval(5.0, 6.0)).unwrap();
        u.update(v).unwrap();
        assert_eq!(u.size(), 3);
    }

    #[test]
    fn test_intersect_unions() {
        let mut u = PolytopesUnion::new();
        u.add(interval(0.0, 2.0)).unwrap();
        let mut v = PolytopesUnion::new();
        v.add(interval(1.0, 3.0)).unwrap();
        v.add(interval(5.0, 6.0)).unwrap();
        let w = intersect_unions(&u, &v).unwrap();
        assert_eq!(w.size(), 1);
        assert_eq!(w.iter().next().unwrap(), &interval(1.0, 2.0));
    }
}
