//! Bernstein basis conversion over the unit box
//!
//! A polynomial `q(α₁…αₙ)` restricted to `[0,1]ⁿ` can be re-expressed in the
//! Bernstein basis. The coefficients of that expansion enclose the range of
//! `q` on the unit box: `min q ≥ min B` and `max q ≤ max B`, which is the
//! soundness argument behind the bundle image computation.
//!
//! The conversion here is the lower-triangular binomial transform applied
//! coordinate by coordinate. Coefficients of the power form may themselves
//! be polynomials in symbols that are not converted (base vertex, edge
//! length and parameter symbols), so the resulting Bernstein coefficients
//! stay symbolic in those and can be cached and re-instantiated cheaply.

use std::collections::BTreeMap;

use crate::error::AlgebraError;
use crate::polynomial::{Polynomial, Symbol};

/// Iterator over all multi-indices `0 ≤ I ≤ bounds` (element-wise)
///
/// Indices are produced in lexicographic order with the last coordinate
/// varying fastest.
struct MultiIndices {
    bounds: Vec<u32>,
    next: Option<Vec<u32>>,
}

impl MultiIndices {
    fn new(bounds: &[u32]) -> Self {
        MultiIndices {
            bounds: bounds.to_vec(),
            next: Some(vec![0; bounds.len()]),
        }
    }
}

impl Iterator for MultiIndices {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        for pos in (0..succ.len()).rev() {
            if succ[pos] < self.bounds[pos] {
                succ[pos] += 1;
                self.next = Some(succ);
                return Some(current);
            }
            succ[pos] = 0;
        }
        // bounds exhausted; the zero-length index set still yields one index
        self.next = None;
        Some(current)
    }
}

/// Binomial coefficient as a floating point number
fn binomial(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * f64::from(n - i) / f64::from(i + 1);
    }
    result
}

/// Bernstein coefficients of `q` over `[0,1]ⁿ` in the variables `vars`
///
/// The degree of the expansion in each variable is the degree of `q` in
/// that variable. Symbols of `q` outside `vars` are carried through
/// symbolically, so each returned coefficient is a polynomial in those
/// remaining symbols only.
///
/// # Example
///
/// ```
/// use polyreach_algebra::bernstein::bernstein_coefficients;
/// use polyreach_algebra::{Polynomial, Symbol};
///
/// let a = Symbol::new("a");
/// // q(a) = a^2 on [0,1]: Bernstein coefficients 0, 0, 1
/// let q = Polynomial::variable("a").pow(2);
/// let coeffs = bernstein_coefficients(&[a], &q);
/// let values: Vec<f64> = coeffs.iter().map(|c| c.as_constant().unwrap()).collect();
/// assert_eq!(values, vec![0.0, 0.0, 1.0]);
/// ```
pub fn bernstein_coefficients(vars: &[Symbol], q: &Polynomial) -> Vec<Polynomial> {
    let degrees: Vec<u32> = vars.iter().map(|v| q.degree(v)).collect();

    // collect the power-basis coefficients indexed by exponent vector;
    // the sorted map keeps floating point summation order deterministic
    let mut power: BTreeMap<Vec<u32>, Polynomial> = BTreeMap::new();
    for (monomial, coefficient) in q.terms() {
        let (exponents, rest) = monomial.split(vars);
        power
            .entry(exponents)
            .or_insert_with(Polynomial::zero)
            .add_term(rest, *coefficient);
    }

    // b_I = Σ_{J ≤ I} Π_k [ C(i_k, j_k) / C(d_k, j_k) ] a_J
    let mut coefficients = Vec::new();
    for index in MultiIndices::new(&degrees) {
        let mut b = Polynomial::zero();
        for (exponents, a) in &power {
            let mut weight = 1.0;
            for k in 0..vars.len() {
                if exponents[k] > index[k] {
                    weight = 0.0;
                    break;
                }
                weight *= binomial(index[k], exponents[k]) / binomial(degrees[k], exponents[k]);
            }
            if weight != 0.0 {
                b = b + a.clone() * weight;
            }
        }
        coefficients.push(b);
    }
    coefficients
}

/// Numeric range enclosure of `q` on the unit box
///
/// Returns `(min B, max B)` over the Bernstein coefficients. Fails when a
/// coefficient is not numeric, i.e. when `q` mentions symbols outside
/// `vars`.
pub fn bernstein_enclosure(vars: &[Symbol], q: &Polynomial) -> Result<(f64, f64), AlgebraError> {
    let mut lower = f64::INFINITY;
    let mut upper = f64::NEG_INFINITY;
    for coefficient in bernstein_coefficients(vars, q) {
        let value = match coefficient.as_constant() {
            Some(v) => v,
            None => {
                let symbol = coefficient.symbols().into_iter().next().unwrap();
                return Err(AlgebraError::NonConstant(symbol));
            }
        };
        lower = lower.min(value);
        upper = upper.max(value);
    }
    Ok((lower, upper))
}
