//! Round-trip and canonicalization properties of the set representations

use polyreach_geometry::linear_algebra::dot;
use polyreach_geometry::{Bundle, Parallelotope, Polytope};

/// Rebuilding a polytope from its support values preserves the set
#[test]
fn polytope_direction_offset_roundtrip() {
    // a pentagon-ish 2d region
    let original = Polytope::new(
        vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
            vec![1.0, 1.0],
        ],
        vec![2.0, 2.0, 0.0, 0.0, 3.0],
    )
    .unwrap();

    let mut rows = Vec::new();
    let mut offsets = Vec::new();
    for row in original.constraint_matrix() {
        let support = original.maximize(row);
        rows.push(row.clone());
        offsets.push(support.optimum());
    }
    let rebuilt = Polytope::new(rows, offsets).unwrap();
    assert_eq!(original, rebuilt);
}

/// The generator function evaluated at the unit box corners yields the
/// parallelotope vertices, each tight on `n` facets
#[test]
fn parallelotope_vertex_roundtrip() {
    let directions = vec![vec![1.0, 0.0, 0.0], vec![1.0, 1.0, 0.0], vec![0.0, 1.0, 1.0]];
    let lower = vec![-1.0, 0.0, 0.5];
    let upper = vec![1.0, 2.0, 3.0];
    let paratope = Parallelotope::new(directions.clone(), lower.clone(), upper.clone()).unwrap();

    for corner_bits in 0..8u32 {
        let alpha: Vec<f64> = (0..3)
            .map(|i| if corner_bits & (1 << i) != 0 { 1.0 } else { 0.0 })
            .collect();
        let vertex = paratope.generator_point(&alpha);

        let mut tight = 0;
        for (i, direction) in directions.iter().enumerate() {
            let value = dot(direction, &vertex);
            assert!(value >= lower[i] - 1e-9);
            assert!(value <= upper[i] + 1e-9);
            if (value - lower[i]).abs() < 1e-9 || (value - upper[i]).abs() < 1e-9 {
                tight += 1;
            }
        }
        assert_eq!(tight, 3, "corner {alpha:?} is not a vertex");
    }
}

/// Canonicalization does not change the denoted set and produces support
/// offsets
#[test]
fn canonical_bundle_offsets_are_supports() {
    let bundle = Bundle::new(
        vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ],
        vec![0.0, 0.0, -10.0],
        vec![1.0, 1.0, 10.0],
        vec![vec![0, 1]],
    )
    .unwrap();

    let canonical = bundle.get_canonical();
    assert_eq!(canonical, bundle);

    let polytope = bundle.get_polytope();
    for (i, direction) in canonical.directions().iter().enumerate() {
        let max = polytope.maximize(direction).optimum();
        let min = polytope.minimize(direction).optimum();
        assert!((canonical.upper_bounds()[i] - max).abs() < 1e-9);
        assert!((canonical.lower_bounds()[i] - min).abs() < 1e-9);
    }
    // the diagonal direction got tightened onto the unit square
    assert!((canonical.upper_bounds()[2] - 2.0).abs() < 1e-9);
    assert!(canonical.lower_bounds()[2].abs() < 1e-9);
}

/// Intersecting with the empty set yields the empty set
#[test]
fn intersection_with_empty_is_empty() {
    let square = Polytope::new(
        vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
        ],
        vec![1.0, 1.0, 0.0, 0.0],
    )
    .unwrap();
    let empty = Polytope::new(
        vec![vec![1.0, 0.0], vec![-1.0, 0.0]],
        vec![0.0, -1.0],
    )
    .unwrap();
    assert!(empty.is_empty());
    let both = polyreach_geometry::intersect(&square, &empty).unwrap();
    assert!(both.is_empty());
}
