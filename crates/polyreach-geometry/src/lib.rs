//! Convex geometry for polyreach
//!
//! This crate contains the set representations the reachability engine
//! computes with:
//!
//! - [`Polytope`]: an intersection of half-spaces `{x : Ax ≤ b}` with
//!   LP-backed support queries, inclusion tests and redundancy elimination,
//! - [`PolytopesUnion`]: an inclusion-minimal union of polytopes,
//! - [`Parallelotope`]: the generator-function view of a parallelotope,
//! - [`Bundle`]: an intersection of parallelotopes sharing a direction
//!   pool, with its image operator under a polynomial map backed by
//!   Bernstein coefficient bounds and the [`ControlPointCache`].
//!
//! All numerics are `f64`; comparisons between derived sets use an absolute
//! tolerance (see [`GEOMETRY_TOLERANCE`]) rather than exact equality.

mod bundle;
mod cache;
mod error;
pub mod linear_algebra;
pub mod lp;
mod parallelotope;
mod polytope;
mod union;

pub use bundle::{Bundle, TransformMode};
pub use cache::{BoundTarget, ControlPointCache};
pub use error::GeometryError;
pub use parallelotope::{GeneratorSymbols, Parallelotope};
pub use polytope::{intersect, Polytope};
pub use union::{intersect_unions, PolytopesUnion};

/// Absolute slack used by set-semantic comparisons on derived polytopes
///
/// Support values come out of an LP solver; exact floating point equality
/// is not a contract anywhere in this crate.
pub const GEOMETRY_TOLERANCE: f64 = 1e-9;
