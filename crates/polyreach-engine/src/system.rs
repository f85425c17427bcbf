//! Discrete-time dynamical systems
//!
//! A [`DiscreteSystem`] couples an ordered list of state variables with one
//! polynomial law per variable, `x' = f(x, p)`, over an ordered list of
//! parameters. Construction validates the model: names must be unique
//! across variables and parameters, every variable needs a law and laws may
//! only mention declared symbols.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use polyreach_algebra::{Polynomial, Symbol};

use crate::error::ModelError;

/// A discrete-time polynomial dynamical system
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteSystem {
    variables: Vec<Symbol>,
    parameters: Vec<Symbol>,
    dynamics: Vec<Polynomial>,
}

impl DiscreteSystem {
    /// Build a system, validating names and arities
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_algebra::{Polynomial, Symbol};
    /// use polyreach_engine::DiscreteSystem;
    ///
    /// let s = Polynomial::variable("s");
    /// let i = Polynomial::variable("i");
    /// let r = Polynomial::variable("r");
    ///
    /// let system = DiscreteSystem::new(
    ///     vec![Symbol::new("s"), Symbol::new("i"), Symbol::new("r")],
    ///     vec![],
    ///     vec![
    ///         s.clone() - 0.1 * s.clone() * i.clone(),
    ///         i.clone() + 0.1 * s * i.clone() - 0.5 * i.clone(),
    ///         r + 0.5 * i,
    ///     ],
    /// ).unwrap();
    /// assert_eq!(system.dim(), 3);
    /// ```
    pub fn new(
        variables: Vec<Symbol>,
        parameters: Vec<Symbol>,
        dynamics: Vec<Polynomial>,
    ) -> Result<Self, ModelError> {
        if variables.len() != dynamics.len() {
            return Err(ModelError::DynamicsArityMismatch {
                variables: variables.len(),
                dynamics: dynamics.len(),
            });
        }

        let mut seen_variables = BTreeSet::new();
        for v in &variables {
            if !seen_variables.insert(v.clone()) {
                return Err(ModelError::DuplicateVariable(v.clone()));
            }
        }
        let mut seen_parameters = BTreeSet::new();
        for p in &parameters {
            if !seen_parameters.insert(p.clone()) {
                return Err(ModelError::DuplicateParameter(p.clone()));
            }
            if seen_variables.contains(p) {
                return Err(ModelError::NameClash(p.name().to_string()));
            }
        }

        for law in &dynamics {
            for symbol in law.symbols() {
                if !seen_variables.contains(&symbol) && !seen_parameters.contains(&symbol) {
                    return Err(ModelError::UndeclaredSymbol(symbol));
                }
            }
        }

        Ok(DiscreteSystem {
            variables,
            parameters,
            dynamics,
        })
    }

    /// The ordered state variables
    pub fn variables(&self) -> &[Symbol] {
        &self.variables
    }

    /// The ordered parameters
    pub fn parameters(&self) -> &[Symbol] {
        &self.parameters
    }

    /// The dynamic laws, aligned with the variables
    pub fn dynamics(&self) -> &[Polynomial] {
        &self.dynamics
    }

    /// State space dimension
    pub fn dim(&self) -> usize {
        self.variables.len()
    }

    /// The replacement map `x ↦ f(x, p)` of the system
    pub fn replacement_map(&self) -> BTreeMap<Symbol, Polynomial> {
        self.variables
            .iter()
            .cloned()
            .zip(self.dynamics.iter().cloned())
            .collect()
    }

    /// Iterate the dynamic law symbolically
    ///
    /// `compose(d)` replaces the one-step map by its `d`-fold composition,
    /// so one analysis step covers `d` steps of the original system.
    pub fn compose(&self, degree: u32) -> DiscreteSystem {
        let replacement = self.replacement_map();
        let mut dynamics = self.dynamics.clone();
        for _ in 1..degree {
            for law in &mut dynamics {
                *law = law.substitute(&replacement);
            }
        }
        DiscreteSystem {
            variables: self.variables.clone(),
            parameters: self.parameters.clone(),
            dynamics,
        }
    }

    /// Joint degree of a dynamic law in the parameters
    ///
    /// Parameter synthesis needs every law affine in the parameters; this
    /// returns the first variable whose law is not.
    pub fn nonlinear_parameter_law(&self) -> Option<&Symbol> {
        self.variables
            .iter()
            .zip(&self.dynamics)
            .find(|(_, law)| law.degree_in(&self.parameters) > 1)
            .map(|(v, _)| v)
    }
}

impl fmt::Display for DiscreteSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (v, law)) in self.variables.iter().zip(&self.dynamics).enumerate() {
            if idx != 0 {
                writeln!(f)?;
            }
            write!(f, "{v}' = {law}")?;
        }
        Ok(())
    }
}
