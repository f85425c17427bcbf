//! Atomic progress accounting
//!
//! Long computations bump a shared counter; consumers (the CLI progress
//! bar) poll it from another thread. There is no cancellation and no
//! blocking: the counter is the entire protocol.

use std::sync::atomic::{AtomicU64, Ordering};

/// A polled progress counter with a fixed expected total
#[derive(Debug)]
pub struct ProgressAccounter {
    performed: AtomicU64,
    expected: u64,
}

impl ProgressAccounter {
    /// Create an accounter expecting `expected` steps
    pub fn new(expected: u64) -> Self {
        ProgressAccounter {
            performed: AtomicU64::new(0),
            expected: expected.max(1),
        }
    }

    /// Record `steps` more performed steps
    pub fn increase_performed_by(&self, steps: u64) {
        self.performed.fetch_add(steps, Ordering::Relaxed);
    }

    /// Raise the performed counter to at least `steps`
    pub fn increase_performed_to(&self, steps: u64) {
        self.performed.fetch_max(steps, Ordering::Relaxed);
    }

    /// Steps performed so far
    pub fn performed(&self) -> u64 {
        self.performed.load(Ordering::Relaxed).min(self.expected)
    }

    /// The expected total
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Completed fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        self.performed() as f64 / self.expected as f64
    }
}

/// Upper bound on the number of synthesis steps
///
/// Every split level multiplies the leaf count by `2^parameters`; each
/// leaf runs the recursion over the formula horizon, and each surviving
/// refinement is followed by a flowpipe of `horizon` steps.
pub fn estimate_synthesis_steps(
    max_splits: u32,
    parameters: usize,
    formula_end: u32,
    horizon: u32,
) -> u64 {
    let mut steps: u64 = 0;
    for split in 0..=max_splits {
        steps += (1u64 << split).pow(parameters as u32);
    }
    steps * u64::from(formula_end)
        + u64::from(horizon) * (1u64 << max_splits).pow(parameters as u32)
}
