//! Flowpipes
//!
//! A [`Flowpipe`] is the ordered sequence of reachable-set
//! over-approximations produced by the analyzer, one polytope union per
//! step. Element `i` over-approximates the states reachable in exactly
//! `i` steps from the initial set.

use std::fmt;
use std::slice;

use polyreach_geometry::PolytopesUnion;

/// An ordered sequence of per-step reachable-set over-approximations
#[derive(Debug, Clone, Default)]
pub struct Flowpipe {
    steps: Vec<PolytopesUnion>,
}

impl Flowpipe {
    /// The empty flowpipe
    pub fn new() -> Self {
        Flowpipe::default()
    }

    /// Append the over-approximation of the next step
    pub fn push(&mut self, step: PolytopesUnion) {
        self.steps.push(step);
    }

    /// Number of steps, the initial set included
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the flowpipe holds no step
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The over-approximation of step `i`
    pub fn get(&self, i: usize) -> Option<&PolytopesUnion> {
        self.steps.get(i)
    }

    /// All steps in order
    pub fn steps(&self) -> &[PolytopesUnion] {
        &self.steps
    }

    /// Space dimension of the sets, 0 when empty
    pub fn dim(&self) -> usize {
        self.steps.first().map(|s| s.dim()).unwrap_or(0)
    }

    /// Iterate over the steps
    pub fn iter(&self) -> slice::Iter<'_, PolytopesUnion> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a Flowpipe {
    type Item = &'a PolytopesUnion;
    type IntoIter = slice::Iter<'a, PolytopesUnion>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl fmt::Display for Flowpipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            writeln!(f, "Step {i}:")?;
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
