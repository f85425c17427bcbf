//! Sparse multivariate polynomials in normal form
//!
//! A [`Polynomial`] is a map from [`Monomial`]s to `f64` coefficients.
//! Monomials keep their exponents in a sorted map, so two polynomials denote
//! the same function exactly when they compare equal. Terms with a zero
//! coefficient are never stored.
//!
//! Arithmetic is available through the usual operators, so dynamic laws read
//! the way they are written on paper:
//!
//! ```
//! use polyreach_algebra::{Polynomial, Symbol};
//!
//! let s = Polynomial::variable("s");
//! let i = Polynomial::variable("i");
//!
//! // s - 0.1*s*i
//! let law = s.clone() - 0.1 * s * i;
//! assert_eq!(law.degree(&Symbol::new("s")), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;

use crate::error::AlgebraError;

/// A named indeterminate
///
/// Symbols are compared, ordered and hashed by name; creating two symbols
/// with the same name yields interchangeable values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new symbol with the given name
    pub fn new(name: impl ToString) -> Self {
        Symbol(name.to_string())
    }

    /// Returns the name of the symbol
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generate a vector of indexed symbols `basename0`, `basename1`, ...
///
/// # Example
///
/// ```
/// use polyreach_algebra::symbol_vector;
///
/// let syms = symbol_vector("_f", 2);
/// assert_eq!(syms[1].name(), "_f1");
/// ```
pub fn symbol_vector(basename: &str, number_of_symbols: usize) -> Vec<Symbol> {
    (0..number_of_symbols)
        .map(|i| Symbol::new(format!("{basename}{i}")))
        .collect()
}

/// A product of symbol powers
///
/// The empty product is the monomial `1`. Exponents are strictly positive;
/// a symbol with exponent zero is simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Monomial {
    exponents: BTreeMap<Symbol, u32>,
}

impl Monomial {
    /// The monomial `1`
    pub fn one() -> Self {
        Monomial::default()
    }

    /// The monomial consisting of a single symbol
    pub fn variable(symbol: Symbol) -> Self {
        let mut exponents = BTreeMap::new();
        exponents.insert(symbol, 1);
        Monomial { exponents }
    }

    /// Build a monomial from symbol/exponent pairs, dropping zero exponents
    pub fn from_exponents(pairs: impl IntoIterator<Item = (Symbol, u32)>) -> Self {
        let exponents = pairs.into_iter().filter(|(_, e)| *e > 0).collect();
        Monomial { exponents }
    }

    /// Exponent of a symbol in the monomial
    pub fn degree(&self, symbol: &Symbol) -> u32 {
        self.exponents.get(symbol).copied().unwrap_or(0)
    }

    /// Sum of all exponents
    pub fn total_degree(&self) -> u32 {
        self.exponents.values().sum()
    }

    /// Sum of the exponents of the given symbols
    pub fn degree_in(&self, symbols: &[Symbol]) -> u32 {
        symbols.iter().map(|s| self.degree(s)).sum()
    }

    /// Whether this is the monomial `1`
    pub fn is_one(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Symbols appearing in the monomial
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.exponents.keys()
    }

    /// Product of two monomials
    pub fn product(&self, other: &Monomial) -> Monomial {
        let mut exponents = self.exponents.clone();
        for (s, e) in &other.exponents {
            *exponents.entry(s.clone()).or_insert(0) += e;
        }
        Monomial { exponents }
    }

    /// Split the monomial into the exponents along `symbols` and the
    /// remaining factor
    ///
    /// The returned vector is aligned with `symbols`; the remaining factor
    /// no longer mentions any of them.
    pub fn split(&self, symbols: &[Symbol]) -> (Vec<u32>, Monomial) {
        let along: Vec<u32> = symbols.iter().map(|s| self.degree(s)).collect();
        let rest = self
            .exponents
            .iter()
            .filter(|(s, _)| !symbols.contains(s))
            .map(|(s, e)| (s.clone(), *e))
            .collect();
        (along, Monomial { exponents: rest })
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return write!(f, "1");
        }
        let mut first = true;
        for (s, e) in &self.exponents {
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if *e == 1 {
                write!(f, "{s}")?;
            } else {
                write!(f, "{s}^{e}")?;
            }
        }
        Ok(())
    }
}

/// A sparse multivariate polynomial with `f64` coefficients
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, f64>,
}

impl Polynomial {
    /// The zero polynomial
    pub fn zero() -> Self {
        Polynomial::default()
    }

    /// The constant polynomial
    pub fn constant(value: f64) -> Self {
        let mut p = Polynomial::zero();
        p.add_term(Monomial::one(), value);
        p
    }

    /// The polynomial consisting of a single symbol
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_algebra::{Polynomial, Symbol};
    ///
    /// let x = Polynomial::variable("x");
    /// assert_eq!(x.degree(&Symbol::new("x")), 1);
    /// ```
    pub fn variable(symbol: impl Into<Symbol>) -> Self {
        let mut p = Polynomial::zero();
        p.add_term(Monomial::variable(symbol.into()), 1.0);
        p
    }

    fn from_symbol(symbol: &Symbol) -> Self {
        Polynomial::variable(symbol.clone())
    }

    /// Add a term, merging with an existing monomial and dropping zeros
    pub fn add_term(&mut self, monomial: Monomial, coefficient: f64) {
        use std::collections::btree_map::Entry;

        if coefficient == 0.0 {
            return;
        }
        match self.terms.entry(monomial) {
            Entry::Occupied(mut e) => {
                *e.get_mut() += coefficient;
                if *e.get() == 0.0 {
                    e.remove();
                }
            }
            Entry::Vacant(e) => {
                e.insert(coefficient);
            }
        }
    }

    /// Whether the polynomial is identically zero
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// The constant value of the polynomial, if it has no indeterminates
    pub fn as_constant(&self) -> Option<f64> {
        match self.terms.len() {
            0 => Some(0.0),
            1 => {
                let (m, c) = self.terms.iter().next().unwrap();
                if m.is_one() {
                    Some(*c)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Iterate over the `(monomial, coefficient)` terms
    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &f64)> {
        self.terms.iter()
    }

    /// All symbols mentioned by the polynomial
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        self.terms
            .keys()
            .flat_map(|m| m.symbols().cloned())
            .collect()
    }

    /// Degree of the polynomial in a single symbol
    pub fn degree(&self, symbol: &Symbol) -> u32 {
        self.terms
            .keys()
            .map(|m| m.degree(symbol))
            .max()
            .unwrap_or(0)
    }

    /// Joint degree of the polynomial in a set of symbols
    ///
    /// This is the maximum over the terms of the summed exponents of the
    /// given symbols; a polynomial is affine in the symbols exactly when
    /// this is at most one.
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_algebra::{Polynomial, Symbol};
    ///
    /// let a = Polynomial::variable("a");
    /// let b = Polynomial::variable("b");
    /// let p = a.clone() * b + a;
    /// assert_eq!(p.degree_in(&[Symbol::new("a"), Symbol::new("b")]), 2);
    /// ```
    pub fn degree_in(&self, symbols: &[Symbol]) -> u32 {
        self.terms
            .keys()
            .map(|m| m.degree_in(symbols))
            .max()
            .unwrap_or(0)
    }

    /// Total degree of the polynomial
    pub fn total_degree(&self) -> u32 {
        self.terms
            .keys()
            .map(|m| m.total_degree())
            .max()
            .unwrap_or(0)
    }

    /// Per-variable coefficient extraction
    ///
    /// Returns the polynomial multiplying `symbol^k`, with the symbol itself
    /// removed.
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_algebra::{Polynomial, Symbol};
    ///
    /// let x = Polynomial::variable("x");
    /// let y = Polynomial::variable("y");
    /// // 3*x^2*y + x^2 + y
    /// let p = 3.0 * x.clone() * x.clone() * y.clone() + x.clone() * x + y.clone();
    /// let c2 = p.coefficient_of(&Symbol::new("x"), 2);
    /// assert_eq!(c2, 3.0 * y + Polynomial::constant(1.0));
    /// ```
    pub fn coefficient_of(&self, symbol: &Symbol, k: u32) -> Polynomial {
        let mut result = Polynomial::zero();
        for (m, c) in &self.terms {
            if m.degree(symbol) == k {
                let reduced = Monomial::from_exponents(
                    m.symbols()
                        .filter(|s| *s != symbol)
                        .map(|s| (s.clone(), m.degree(s))),
                );
                result.add_term(reduced, *c);
            }
        }
        result
    }

    /// Raise the polynomial to a non-negative integer power
    pub fn pow(&self, exponent: u32) -> Polynomial {
        let mut result = Polynomial::constant(1.0);
        for _ in 0..exponent {
            result = result * self.clone();
        }
        result
    }

    /// Replace symbols by polynomials
    ///
    /// Symbols without a replacement are kept. This is the composition
    /// primitive: substituting the generator function into a dynamic law
    /// yields the composed polynomial in the generator coordinates.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use polyreach_algebra::{Polynomial, Symbol};
    ///
    /// let x = Polynomial::variable("x");
    /// let t = Polynomial::variable("t");
    /// let p = x.clone() * x; // x^2
    ///
    /// let mut rep = BTreeMap::new();
    /// rep.insert(Symbol::new("x"), t + Polynomial::constant(1.0));
    /// // (t + 1)^2
    /// let q = p.substitute(&rep);
    /// assert_eq!(q.degree(&Symbol::new("t")), 2);
    /// ```
    pub fn substitute(&self, replacements: &BTreeMap<Symbol, Polynomial>) -> Polynomial {
        let mut result = Polynomial::zero();
        for (m, c) in &self.terms {
            let mut term = Polynomial::constant(*c);
            for s in m.symbols() {
                let factor = match replacements.get(s) {
                    Some(p) => p.clone(),
                    None => Polynomial::from_symbol(s),
                };
                term = term * factor.pow(m.degree(s));
            }
            result = result + term;
        }
        result
    }

    /// Replace symbols by numeric values, keeping the rest symbolic
    pub fn substitute_values(&self, values: &BTreeMap<Symbol, f64>) -> Polynomial {
        let replacements = values
            .iter()
            .map(|(s, v)| (s.clone(), Polynomial::constant(*v)))
            .collect();
        self.substitute(&replacements)
    }

    /// Evaluate the polynomial numerically
    ///
    /// Every symbol of the polynomial must be bound in `values`.
    pub fn evaluate(&self, values: &BTreeMap<Symbol, f64>) -> Result<f64, AlgebraError> {
        let mut total = 0.0;
        for (m, c) in &self.terms {
            let mut term = *c;
            for s in m.symbols() {
                let v = values
                    .get(s)
                    .ok_or_else(|| AlgebraError::UnboundSymbol(s.clone()))?;
                term *= v.powi(m.degree(s) as i32);
            }
            total += term;
        }
        Ok(total)
    }

    /// Extract the affine form of the polynomial over the given symbols
    ///
    /// Returns the vector of linear coefficients, aligned with `symbols`,
    /// and the constant term. Fails when any term has joint degree above
    /// one in the symbols or mentions a symbol outside the list.
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_algebra::{Polynomial, Symbol};
    ///
    /// let a = Polynomial::variable("a");
    /// let b = Polynomial::variable("b");
    /// let p = 2.0 * a - b + Polynomial::constant(0.5);
    /// let (coeffs, constant) =
    ///     p.to_affine(&[Symbol::new("a"), Symbol::new("b")]).unwrap();
    /// assert_eq!(coeffs, vec![2.0, -1.0]);
    /// assert_eq!(constant, 0.5);
    /// ```
    pub fn to_affine(&self, symbols: &[Symbol]) -> Result<(Vec<f64>, f64), AlgebraError> {
        let mut coefficients = vec![0.0; symbols.len()];
        let mut constant = 0.0;
        for (m, c) in &self.terms {
            if m.is_one() {
                constant += c;
                continue;
            }
            if m.total_degree() != 1 {
                return Err(AlgebraError::NonAffine(m.clone()));
            }
            let symbol = m.symbols().next().unwrap();
            match symbols.iter().position(|s| s == symbol) {
                Some(idx) => coefficients[idx] += c,
                None => return Err(AlgebraError::NonConstant(symbol.clone())),
            }
        }
        Ok((coefficients, constant))
    }
}

impl Hash for Polynomial {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (m, c) in &self.terms {
            m.hash(state);
            c.to_bits().hash(state);
        }
    }
}

impl From<f64> for Polynomial {
    fn from(value: f64) -> Self {
        Polynomial::constant(value)
    }
}

// Overloaded operators so dynamics can be written naturally

impl ops::Add for Polynomial {
    type Output = Polynomial;

    fn add(self, other: Polynomial) -> Polynomial {
        let mut result = self;
        for (m, c) in other.terms {
            result.add_term(m, c);
        }
        result
    }
}

impl ops::Sub for Polynomial {
    type Output = Polynomial;

    fn sub(self, other: Polynomial) -> Polynomial {
        let mut result = self;
        for (m, c) in other.terms {
            result.add_term(m, -c);
        }
        result
    }
}

impl ops::Mul for Polynomial {
    type Output = Polynomial;

    fn mul(self, other: Polynomial) -> Polynomial {
        let mut result = Polynomial::zero();
        for (m1, c1) in &self.terms {
            for (m2, c2) in &other.terms {
                result.add_term(m1.product(m2), c1 * c2);
            }
        }
        result
    }
}

impl ops::Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        let terms = self.terms.into_iter().map(|(m, c)| (m, -c)).collect();
        Polynomial { terms }
    }
}

impl ops::Mul<f64> for Polynomial {
    type Output = Polynomial;

    fn mul(self, scalar: f64) -> Polynomial {
        let mut result = Polynomial::zero();
        for (m, c) in self.terms {
            result.add_term(m, c * scalar);
        }
        result
    }
}

impl ops::Mul<Polynomial> for f64 {
    type Output = Polynomial;

    fn mul(self, p: Polynomial) -> Polynomial {
        p * self
    }
}

impl ops::Add<f64> for Polynomial {
    type Output = Polynomial;

    fn add(self, scalar: f64) -> Polynomial {
        self + Polynomial::constant(scalar)
    }
}

impl ops::Sub<f64> for Polynomial {
    type Output = Polynomial;

    fn sub(self, scalar: f64) -> Polynomial {
        self - Polynomial::constant(scalar)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut first = true;
        for (m, c) in &self.terms {
            let (sign, magnitude) = if *c < 0.0 { ("-", -c) } else { ("+", *c) };
            if first {
                if sign == "-" {
                    write!(f, "-")?;
                }
                first = false;
            } else {
                write!(f, " {sign} ")?;
            }
            if m.is_one() {
                write!(f, "{magnitude}")?;
            } else if magnitude == 1.0 {
                write!(f, "{m}")?;
            } else {
                write!(f, "{magnitude}*{m}")?;
            }
        }
        Ok(())
    }
}
