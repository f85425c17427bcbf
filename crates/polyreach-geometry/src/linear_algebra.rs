//! Dense vectors and matrices over `f64`
//!
//! The geometry crate only needs a handful of dense operations: products,
//! norms, linear dependence tests and small Gaussian solves for base
//! vertices and dual directions. Vectors are plain `Vec<f64>` and matrices
//! row-major `Vec<Vector>`, as the systems involved are tiny (the state
//! dimension of the analyzed model).

/// A dense row vector
pub type Vector = Vec<f64>;

/// A dense row-major matrix
pub type Matrix = Vec<Vector>;

/// Tolerance under which a pivot or residue counts as zero
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Inner product of two vectors of equal length
pub fn dot(v1: &[f64], v2: &[f64]) -> f64 {
    v1.iter().zip(v2).map(|(a, b)| a * b).sum()
}

/// Euclidean norm of a vector
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Infinity norm of a vector
pub fn norm_infinity(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

/// The complementary direction `-v`
pub fn complementary(v: &[f64]) -> Vector {
    v.iter().map(|x| -x).collect()
}

/// Angle between two vectors
pub fn angle(v1: &[f64], v2: &[f64]) -> f64 {
    (dot(v1, v2) / (norm(v1) * norm(v2))).clamp(-1.0, 1.0).acos()
}

/// Orthogonal proximity of two vectors: how far their angle is from π/2
pub fn orthogonal_proximity(v1: &[f64], v2: &[f64]) -> f64 {
    (angle(v1, v2) - std::f64::consts::FRAC_PI_2).abs()
}

/// Test whether `v2` is a scalar multiple of `v1`
///
/// Returns the coefficient `λ` with `v2 = λ · v1` when the vectors are
/// linearly dependent and non-zero, `None` otherwise.
///
/// # Example
///
/// ```
/// use polyreach_geometry::linear_algebra::linear_dependence;
///
/// assert_eq!(linear_dependence(&[1.0, 2.0], &[-2.0, -4.0]), Some(-2.0));
/// assert_eq!(linear_dependence(&[1.0, 0.0], &[0.0, 1.0]), None);
/// ```
pub fn linear_dependence(v1: &[f64], v2: &[f64]) -> Option<f64> {
    if v1.len() != v2.len() || norm_infinity(v1) == 0.0 || norm_infinity(v2) == 0.0 {
        return None;
    }
    let mut ratio = None;
    for (a, b) in v1.iter().zip(v2) {
        match (a.abs() > PIVOT_TOLERANCE, b.abs() > PIVOT_TOLERANCE) {
            (false, false) => continue,
            (true, true) => {
                let r = b / a;
                match ratio {
                    None => ratio = Some(r),
                    Some(prev) if (prev - r).abs() <= PIVOT_TOLERANCE * (1.0 + prev.abs()) => {}
                    Some(_) => return None,
                }
            }
            _ => return None,
        }
    }
    ratio
}

/// Solve the square linear system `A x = b` by Gaussian elimination with
/// partial pivoting
///
/// Returns `None` when the matrix is singular up to the pivot tolerance.
pub fn solve(a: &Matrix, b: &[f64]) -> Option<Vector> {
    let n = a.len();
    if n == 0 || b.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    let mut m: Matrix = a
        .iter()
        .zip(b)
        .map(|(row, bi)| {
            let mut r = row.clone();
            r.push(*bi);
            r
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| m[r1][col].abs().total_cmp(&m[r2][col].abs()))
            .unwrap();
        if m[pivot_row][col].abs() <= PIVOT_TOLERANCE {
            return None;
        }
        m.swap(col, pivot_row);
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = m[row][col] / m[col][col];
            if factor != 0.0 {
                for k in col..=n {
                    let v = m[col][k];
                    m[row][k] -= factor * v;
                }
            }
        }
    }

    Some((0..n).map(|i| m[i][n] / m[i][i]).collect())
}

/// Invert a square matrix
///
/// Returns `None` when the matrix is singular. The result is returned
/// row-major like the input.
pub fn invert(a: &Matrix) -> Option<Matrix> {
    let n = a.len();
    let mut columns = Vec::with_capacity(n);
    for j in 0..n {
        let mut unit = vec![0.0; n];
        unit[j] = 1.0;
        columns.push(solve(a, &unit)?);
    }
    // transpose the solved columns back into rows
    let mut result = vec![vec![0.0; n]; n];
    for (j, col) in columns.iter().enumerate() {
        for (i, v) in col.iter().enumerate() {
            result[i][j] = *v;
        }
    }
    Some(result)
}

/// Check that the rows of a square matrix form a basis
pub fn is_nonsingular(a: &Matrix) -> bool {
    let n = a.len();
    if n == 0 || a.iter().any(|row| row.len() != n) {
        return false;
    }
    solve(a, &vec![0.0; n]).is_some()
}
