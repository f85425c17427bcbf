//! ODE to discrete-map conversion
//!
//! Continuous dynamics `dx/dt = f(x, p)` enter the engine through a fixed
//! time step integrator producing an equivalent discrete polynomial map.
//! The expression trees are built symbolically, so the polynomial degree of
//! the result is exact and the parameter-linearity check of the model
//! builder sees the true integrated law.

use std::collections::BTreeMap;
use std::fmt;

use polyreach_algebra::{Polynomial, Symbol};

use crate::system::DiscreteSystem;

/// The available integration schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorKind {
    /// Forward Euler: `x' = x + h · f(x, p)`
    Euler,
    /// Classic four-stage Runge–Kutta
    RungeKutta4,
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegratorKind::Euler => write!(f, "euler"),
            IntegratorKind::RungeKutta4 => write!(f, "rk4"),
        }
    }
}

/// Substitute `x ↦ x + scale · k` into every law
fn shifted_stage(
    ode: &DiscreteSystem,
    stage: &[Polynomial],
    scale: f64,
) -> Vec<Polynomial> {
    let replacement: BTreeMap<Symbol, Polynomial> = ode
        .variables()
        .iter()
        .zip(stage)
        .map(|(v, k)| (v.clone(), Polynomial::variable(v.clone()) + k.clone() * scale))
        .collect();
    ode.dynamics()
        .iter()
        .map(|law| law.substitute(&replacement))
        .collect()
}

/// Integrate an ODE right-hand side into a discrete one-step map
///
/// `ode` holds the derivative laws `dx/dt = f(x, p)`; the result holds the
/// polynomial map advancing the state by one step of length `step`.
///
/// # Example
///
/// ```
/// use polyreach_algebra::{Polynomial, Symbol};
/// use polyreach_engine::{integrate, DiscreteSystem, IntegratorKind};
///
/// // dx/dt = -x, Euler with h = 0.5: x' = x - 0.5x = 0.5x
/// let ode = DiscreteSystem::new(
///     vec![Symbol::new("x")],
///     vec![],
///     vec![-Polynomial::variable("x")],
/// ).unwrap();
/// let map = integrate(&ode, IntegratorKind::Euler, 0.5).unwrap();
/// assert_eq!(map.dynamics()[0], 0.5 * Polynomial::variable("x"));
/// ```
pub fn integrate(
    ode: &DiscreteSystem,
    kind: IntegratorKind,
    step: f64,
) -> Result<DiscreteSystem, crate::error::ModelError> {
    let state: Vec<Polynomial> = ode
        .variables()
        .iter()
        .map(|v| Polynomial::variable(v.clone()))
        .collect();

    let dynamics = match kind {
        IntegratorKind::Euler => state
            .iter()
            .zip(ode.dynamics())
            .map(|(x, f)| x.clone() + f.clone() * step)
            .collect(),
        IntegratorKind::RungeKutta4 => {
            let k1 = ode.dynamics().to_vec();
            let k2 = shifted_stage(ode, &k1, step / 2.0);
            let k3 = shifted_stage(ode, &k2, step / 2.0);
            let k4 = shifted_stage(ode, &k3, step);
            state
                .iter()
                .zip(k1.iter().zip(k2.iter().zip(k3.iter().zip(k4.iter()))))
                .map(|(x, (a, (b, (c, d))))| {
                    x.clone()
                        + (a.clone() + b.clone() * 2.0 + c.clone() * 2.0 + d.clone())
                            * (step / 6.0)
                })
                .collect()
        }
    };

    DiscreteSystem::new(
        ode.variables().to_vec(),
        ode.parameters().to_vec(),
        dynamics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn rotation_ode() -> DiscreteSystem {
        // dx/dt = -y, dy/dt = x
        DiscreteSystem::new(
            vec![Symbol::new("x"), Symbol::new("y")],
            vec![],
            vec![-Polynomial::variable("y"), Polynomial::variable("x")],
        )
        .unwrap()
    }

    #[test]
    fn test_euler() {
        let map = integrate(&rotation_ode(), IntegratorKind::Euler, 0.1).unwrap();
        let x = Polynomial::variable("x");
        let y = Polynomial::variable("y");
        assert_eq!(map.dynamics()[0], x.clone() - 0.1 * y.clone());
        assert_eq!(map.dynamics()[1], y + 0.1 * x);
    }

    #[test]
    fn test_runge_kutta_matches_expanded_form() {
        // for the rotation field the RK4 map is the degree-4 Taylor
        // polynomial of the rotation by h
        let h = 0.25;
        let map = integrate(&rotation_ode(), IntegratorKind::RungeKutta4, h).unwrap();

        let cos_taylor = 1.0 - h * h / 2.0 + h.powi(4) / 24.0;
        let sin_taylor = h - h.powi(3) / 6.0;

        let mut at = BTreeMap::new();
        at.insert(Symbol::new("x"), 1.0);
        at.insert(Symbol::new("y"), 0.0);
        let x1 = map.dynamics()[0].evaluate(&at).unwrap();
        let y1 = map.dynamics()[1].evaluate(&at).unwrap();
        assert!((x1 - cos_taylor).abs() < 1e-12);
        assert!((y1 - sin_taylor).abs() < 1e-12);
    }

    #[test]
    fn test_runge_kutta_preserves_polynomiality() {
        // a quadratic field stays polynomial with degree 2^4 at most
        let ode = DiscreteSystem::new(
            vec![Symbol::new("x")],
            vec![],
            vec![Polynomial::variable("x").pow(2)],
        )
        .unwrap();
        let map = integrate(&ode, IntegratorKind::RungeKutta4, 0.1).unwrap();
        assert!(map.dynamics()[0].degree(&Symbol::new("x")) <= 16);
    }
}
