//! The Bernstein enclosure bounds the polynomial range on the unit box

use std::collections::BTreeMap;

use polyreach_algebra::bernstein::bernstein_enclosure;
use polyreach_algebra::{Polynomial, Symbol};

/// Evaluate `q` on a grid over the unit square and check every sample is
/// inside the Bernstein enclosure
fn assert_enclosure_contains_samples(q: &Polynomial, vars: &[Symbol]) {
    let (lower, upper) = bernstein_enclosure(vars, q).unwrap();
    let steps = 8;
    let mut point = BTreeMap::new();
    let mut indices = vec![0usize; vars.len()];
    loop {
        for (v, &i) in vars.iter().zip(&indices) {
            point.insert(v.clone(), i as f64 / steps as f64);
        }
        let value = q.evaluate(&point).unwrap();
        assert!(
            value >= lower - 1e-12 && value <= upper + 1e-12,
            "q({point:?}) = {value} outside [{lower}, {upper}]"
        );

        // advance the grid odometer
        let mut carry = true;
        for idx in indices.iter_mut() {
            if *idx < steps {
                *idx += 1;
                carry = false;
                break;
            }
            *idx = 0;
        }
        if carry {
            break;
        }
    }
}

#[test]
fn enclosure_contains_bilinear_samples() {
    let x = Polynomial::variable("x");
    let y = Polynomial::variable("y");
    let q = 0.5 * y.clone() + 0.1 * x * y - 0.25;
    assert_enclosure_contains_samples(&q, &[Symbol::new("x"), Symbol::new("y")]);
}

#[test]
fn enclosure_contains_quartic_samples() {
    let x = Polynomial::variable("x");
    let q = x.clone().pow(4) - 2.0 * x.clone().pow(2) + x;
    assert_enclosure_contains_samples(&q, &[Symbol::new("x")]);
}

#[test]
fn enclosure_is_exact_for_affine_polynomials() {
    let x = Polynomial::variable("x");
    let y = Polynomial::variable("y");
    let q = 3.0 * x - y + 1.0;
    let (lower, upper) = bernstein_enclosure(&q_vars(), &q).unwrap();
    // affine extrema sit at box corners, and so do the coefficients
    assert!((lower - 0.0).abs() < 1e-12);
    assert!((upper - 4.0).abs() < 1e-12);
}

fn q_vars() -> Vec<Symbol> {
    vec![Symbol::new("x"), Symbol::new("y")]
}

#[test]
fn constant_polynomial_has_point_enclosure() {
    let q = Polynomial::constant(2.5);
    let (lower, upper) = bernstein_enclosure(&[Symbol::new("x")], &q).unwrap();
    assert_eq!(lower, 2.5);
    assert_eq!(upper, 2.5);
}
