//! Signal Temporal Logic formulas over polynomial predicates
//!
//! An [`StlFormula`] is a tagged tree of atomic predicates `e(x) ≤ 0`,
//! boolean combinators and the time-bounded temporal operators *always*,
//! *eventually* and *until*. Temporal bounds are finite non-negative
//! integers validated at construction.
//!
//! The synthesis engine works on formulas in *positive normal form* (PNF):
//! no negation except at construction time, pushed down to the atoms by
//! [`StlFormula::to_pnf`]. Negating an atom `e ≤ 0` yields the
//! over-approximating atom `-e ≤ 0`, as the engine has no strict
//! inequalities.

mod error;
mod formula;

pub use error::StlError;
pub use formula::{Atom, StlFormula, TimeInterval};
