//! Memoization of Bernstein control points
//!
//! Computing the Bernstein coefficients of `ℓ · f ∘ g` is a pure function
//! of the template's generator function, the bounded direction (or atomic
//! predicate) and the map `f`. The generator function of a template only
//! changes when the bundle's direction pool changes, so across reachability
//! steps the symbolic coefficients can be reused and only their numeric
//! instantiation differs.
//!
//! Entries are tagged with a content hash of the generator function
//! polynomials; a lookup only hits when the stored signature matches the
//! current generator function. Reads take the shared lock, writes the
//! exclusive lock; a racing recomputation simply overwrites the entry with
//! the same value.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

use polyreach_algebra::Polynomial;

/// What a cached coefficient vector bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundTarget {
    /// A direction of the bundle, by index into the direction pool
    Direction(usize),
    /// An atomic STL predicate, by its atom identifier
    Predicate(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    template: Vec<usize>,
    target: BoundTarget,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    signature: u64,
    coefficients: Vec<Polynomial>,
}

/// Signature-checked store of Bernstein coefficient vectors
///
/// One cache is used per synthesis problem; the engine keeps separate
/// caches for reachability and synthesis control points.
#[derive(Debug, Default)]
pub struct ControlPointCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ControlPointCache {
    /// Create an empty cache
    pub fn new() -> Self {
        ControlPointCache::default()
    }

    /// Content hash of a generator function
    pub fn signature_of(generator: &[Polynomial]) -> u64 {
        let mut hasher = DefaultHasher::new();
        for component in generator {
            component.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Fetch the coefficients stored for `(template, target)`
    ///
    /// A hit requires the stored generator signature to match `signature`;
    /// a stale entry behaves like a miss and will be overwritten by the
    /// following [`store`](ControlPointCache::store).
    pub fn lookup(
        &self,
        template: &[usize],
        target: &BoundTarget,
        signature: u64,
    ) -> Option<Vec<Polynomial>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let key = CacheKey {
            template: template.to_vec(),
            target: target.clone(),
        };
        entries
            .get(&key)
            .filter(|entry| entry.signature == signature)
            .map(|entry| entry.coefficients.clone())
    }

    /// Store the coefficients for `(template, target)`, replacing any
    /// previous entry for the key
    pub fn store(
        &self,
        template: &[usize],
        target: BoundTarget,
        signature: u64,
        coefficients: Vec<Polynomial>,
    ) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            CacheKey {
                template: template.to_vec(),
                target,
            },
            CacheEntry {
                signature,
                coefficients,
            },
        );
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache holds no entry
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let cache = ControlPointCache::new();
        let gen = vec![Polynomial::variable("x")];
        let sig = ControlPointCache::signature_of(&gen);

        assert!(cache
            .lookup(&[0, 1], &BoundTarget::Direction(0), sig)
            .is_none());

        cache.store(
            &[0, 1],
            BoundTarget::Direction(0),
            sig,
            vec![Polynomial::constant(1.0)],
        );
        let hit = cache
            .lookup(&[0, 1], &BoundTarget::Direction(0), sig)
            .unwrap();
        assert_eq!(hit, vec![Polynomial::constant(1.0)]);
    }

    #[test]
    fn test_stale_signature_misses() {
        let cache = ControlPointCache::new();
        cache.store(&[0], BoundTarget::Direction(0), 7, vec![]);
        assert!(cache.lookup(&[0], &BoundTarget::Direction(0), 8).is_none());
    }

    #[test]
    fn test_targets_do_not_collide() {
        let cache = ControlPointCache::new();
        cache.store(&[0], BoundTarget::Direction(1), 1, vec![]);
        assert!(cache.lookup(&[0], &BoundTarget::Predicate(1), 1).is_none());
    }

    #[test]
    fn test_signature_tracks_content() {
        let g1 = vec![Polynomial::variable("x")];
        let g2 = vec![Polynomial::variable("x") * 2.0];
        assert_ne!(
            ControlPointCache::signature_of(&g1),
            ControlPointCache::signature_of(&g2)
        );
    }
}
