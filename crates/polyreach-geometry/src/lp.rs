//! Linear programming facade
//!
//! The rest of the crate only ever needs one operation: optimize a linear
//! objective over a system `Ax ≤ b` and learn whether the optimum exists,
//! is unbounded, or the system is infeasible. This module wraps the
//! [`good_lp`](https://crates.io/crates/good_lp) modeler with its pure Rust
//! `microlp` backend behind that narrow interface.
//!
//! A fresh problem is built for every call, so the facade has no shared
//! state and is safe to use from worker threads without extra locking.

use good_lp::{variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel};

use crate::linear_algebra::{Matrix, Vector};

/// Status of an optimization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    /// A finite optimum was found
    Optimal,
    /// The objective is unbounded over the feasible region
    Unbounded,
    /// The constraint system has no solution
    Infeasible,
}

/// Outcome of [`optimize`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationResult {
    optimum: f64,
    status: LpStatus,
}

impl OptimizationResult {
    /// The optimal objective value
    ///
    /// `+∞` / `-∞` for unbounded problems, `NaN` when infeasible.
    pub fn optimum(&self) -> f64 {
        self.optimum
    }

    /// The solver status
    pub fn status(&self) -> LpStatus {
        self.status
    }

    /// The same result with the optimum shifted by a constant
    pub(crate) fn shifted(self, constant: f64) -> OptimizationResult {
        OptimizationResult {
            optimum: self.optimum + constant,
            status: self.status,
        }
    }
}

/// Optimize `obj · x` subject to `A x ≤ b`
///
/// All variables are free. Rows with an all-zero coefficient vector are
/// resolved directly: a row `0 ≤ bᵢ` with negative `bᵢ` makes the system
/// infeasible and is never handed to the backend.
///
/// # Example
///
/// ```
/// use polyreach_geometry::lp::{optimize, LpStatus};
///
/// // 0 <= x <= 2
/// let a = vec![vec![1.0], vec![-1.0]];
/// let b = vec![2.0, 0.0];
/// let res = optimize(&a, &b, &[1.0], true);
/// assert_eq!(res.status(), LpStatus::Optimal);
/// assert!((res.optimum() - 2.0).abs() < 1e-9);
/// ```
pub fn optimize(a: &Matrix, b: &Vector, obj: &[f64], maximize: bool) -> OptimizationResult {
    debug_assert_eq!(a.len(), b.len());

    // resolve degenerate rows up front
    for (row, bi) in a.iter().zip(b) {
        if row.iter().all(|c| *c == 0.0) && *bi < 0.0 {
            return OptimizationResult {
                optimum: f64::NAN,
                status: LpStatus::Infeasible,
            };
        }
    }

    if obj.iter().all(|c| *c == 0.0) {
        // a constant objective over a (possibly unconstrained) system;
        // feasibility still has to be decided when rows exist
        if a.is_empty() {
            return OptimizationResult {
                optimum: 0.0,
                status: LpStatus::Optimal,
            };
        }
    }

    let mut problem_vars = ProblemVariables::new();
    let vars: Vec<_> = (0..obj.len()).map(|_| problem_vars.add(variable())).collect();

    let row_expression = |row: &[f64]| {
        let mut expression = Expression::from(0.0);
        for (coefficient, var) in row.iter().zip(&vars) {
            expression.add_mul(*coefficient, var);
        }
        expression
    };
    let objective = row_expression(obj);

    let mut model = if maximize {
        problem_vars.maximise(objective)
    } else {
        problem_vars.minimise(objective)
    }
    .using(good_lp::default_solver);

    for (row, bi) in a.iter().zip(b) {
        if row.iter().all(|c| *c == 0.0) {
            continue;
        }
        model.add_constraint(row_expression(row).leq(*bi));
    }

    match model.solve() {
        Ok(solution) => OptimizationResult {
            optimum: obj
                .iter()
                .zip(&vars)
                .map(|(c, v)| c * solution.value(*v))
                .sum(),
            status: LpStatus::Optimal,
        },
        Err(ResolutionError::Unbounded) => OptimizationResult {
            optimum: if maximize {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            },
            status: LpStatus::Unbounded,
        },
        Err(ResolutionError::Infeasible) => OptimizationResult {
            optimum: f64::NAN,
            status: LpStatus::Infeasible,
        },
        Err(err) => {
            // near-degenerate systems occasionally make the backend give
            // up; callers treat this the same way as numeric emptiness
            log::warn!("LP backend reported '{err}', treating the system as infeasible");
            OptimizationResult {
                optimum: f64::NAN,
                status: LpStatus::Infeasible,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maximize_box() {
        // unit square, maximize x + y
        let a = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
        ];
        let b = vec![1.0, 1.0, 0.0, 0.0];
        let res = optimize(&a, &b, &[1.0, 1.0], true);
        assert_eq!(res.status(), LpStatus::Optimal);
        assert!((res.optimum() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_minimize_box() {
        let a = vec![vec![1.0], vec![-1.0]];
        let b = vec![3.0, 1.0];
        let res = optimize(&a, &b, &[2.0], false);
        assert_eq!(res.status(), LpStatus::Optimal);
        assert!((res.optimum() + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unbounded() {
        // x >= 0, maximize x
        let a = vec![vec![-1.0]];
        let b = vec![0.0];
        let res = optimize(&a, &b, &[1.0], true);
        assert_eq!(res.status(), LpStatus::Unbounded);
        assert_eq!(res.optimum(), f64::INFINITY);
    }

    #[test]
    fn test_infeasible() {
        // x <= 0 and x >= 1
        let a = vec![vec![1.0], vec![-1.0]];
        let b = vec![0.0, -1.0];
        let res = optimize(&a, &b, &[1.0], true);
        assert_eq!(res.status(), LpStatus::Infeasible);
    }

    #[test]
    fn test_trivially_infeasible_zero_row() {
        let a = vec![vec![0.0]];
        let b = vec![-1.0];
        let res = optimize(&a, &b, &[1.0], true);
        assert_eq!(res.status(), LpStatus::Infeasible);
    }

    #[test]
    fn test_empty_system_zero_objective() {
        let res = optimize(&vec![], &vec![], &[0.0, 0.0], true);
        assert_eq!(res.status(), LpStatus::Optimal);
        assert_eq!(res.optimum(), 0.0);
    }
}
