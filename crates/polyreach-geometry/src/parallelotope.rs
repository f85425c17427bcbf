//! Parallelotopes and their generator functions
//!
//! A parallelotope is given by `n` linearly independent directions with a
//! lower and an upper offset each. Its dual view is a base vertex plus `n`
//! edge versors with signed lengths, which yields the *generator function*
//!
//! `g(α) = v + Σᵢ αᵢ · ℓᵢ · uᵢ`,   `α ∈ [0,1]ⁿ`
//!
//! mapping the unit box onto the parallelotope. The image computation
//! composes the dynamics with `g` symbolically, so the generator function
//! is exposed as polynomials over dedicated base-vertex, coordinate and
//! length symbol blocks; the numeric base vertex and lengths are
//! substituted late, which is what makes the control-point cache effective
//! across steps.

use std::collections::BTreeMap;

use polyreach_algebra::{symbol_vector, Monomial, Polynomial, Symbol};

use crate::error::GeometryError;
use crate::linear_algebra::{invert, norm, Matrix, Vector};

/// The three symbol blocks a generator function is written over
///
/// The leading underscore keeps the blocks out of the namespace of model
/// variables, which the input format restricts to alphanumeric names.
#[derive(Debug, Clone)]
pub struct GeneratorSymbols {
    /// Base vertex symbols `_b0`, `_b1`, ...
    pub base: Vec<Symbol>,
    /// Unit box coordinate symbols `_f0`, `_f1`, ...
    pub coord: Vec<Symbol>,
    /// Edge length symbols `_l0`, `_l1`, ...
    pub length: Vec<Symbol>,
}

impl GeneratorSymbols {
    /// Symbol blocks for a `dim`-dimensional generator function
    pub fn for_dimension(dim: usize) -> Self {
        GeneratorSymbols {
            base: symbol_vector("_b", dim),
            coord: symbol_vector("_f", dim),
            length: symbol_vector("_l", dim),
        }
    }
}

/// A parallelotope in generator form
#[derive(Debug, Clone, PartialEq)]
pub struct Parallelotope {
    directions: Matrix,
    base_vertex: Vector,
    versors: Matrix,
    lengths: Vector,
}

impl Parallelotope {
    /// Build a parallelotope from its half-space description
    ///
    /// `directions` is the square matrix of facet normals, `lower` and
    /// `upper` the per-direction offsets: the denoted set is
    /// `{x : lowerᵢ ≤ dᵢ · x ≤ upperᵢ}`. Fails when the direction matrix is
    /// singular.
    pub fn new(directions: Matrix, lower: Vector, upper: Vector) -> Result<Self, GeometryError> {
        let dim = directions.len();
        if dim == 0 {
            return Err(GeometryError::EmptyDirections);
        }
        for v in [&lower, &upper] {
            if v.len() != dim {
                return Err(GeometryError::DimensionMismatch {
                    what: "parallelotope offsets",
                    expected: dim,
                    found: v.len(),
                });
            }
        }

        let inverse = invert(&directions).ok_or(GeometryError::SingularDirections)?;

        // base vertex: the intersection of the n lower facets
        let base_vertex: Vector = (0..dim)
            .map(|k| (0..dim).map(|i| inverse[k][i] * lower[i]).sum())
            .collect();

        // edge i runs along the i-th column of the inverse
        let mut versors = Vec::with_capacity(dim);
        let mut lengths = Vec::with_capacity(dim);
        for i in 0..dim {
            let column: Vector = (0..dim).map(|k| inverse[k][i]).collect();
            let scale = norm(&column);
            versors.push(column.iter().map(|c| c / scale).collect::<Vector>());
            lengths.push((upper[i] - lower[i]) * scale);
        }

        Ok(Parallelotope {
            directions,
            base_vertex,
            versors,
            lengths,
        })
    }

    /// Space dimension
    pub fn dim(&self) -> usize {
        self.directions.len()
    }

    /// The base vertex of the parallelotope
    pub fn base_vertex(&self) -> &Vector {
        &self.base_vertex
    }

    /// The signed edge lengths
    pub fn edge_lengths(&self) -> &Vector {
        &self.lengths
    }

    /// The edge versors, one per direction
    pub fn versors(&self) -> &Matrix {
        &self.versors
    }

    /// The generator function as polynomials over the symbol blocks
    ///
    /// Component `k` is `_bk + Σᵢ _fi · _li · uᵢₖ` with the numeric versors
    /// baked in; base vertex and lengths stay symbolic so the composition
    /// with the dynamics can be cached across steps.
    pub fn generator_function(&self, symbols: &GeneratorSymbols) -> Vec<Polynomial> {
        let dim = self.dim();
        let mut components = Vec::with_capacity(dim);
        for k in 0..dim {
            let mut g = Polynomial::variable(symbols.base[k].clone());
            for i in 0..dim {
                let entry = self.versors[i][k];
                if entry != 0.0 {
                    g.add_term(
                        Monomial::from_exponents([
                            (symbols.coord[i].clone(), 1),
                            (symbols.length[i].clone(), 1),
                        ]),
                        entry,
                    );
                }
            }
            components.push(g);
        }
        components
    }

    /// The numeric substitution instantiating a generator function
    pub fn instantiation(&self, symbols: &GeneratorSymbols) -> BTreeMap<Symbol, f64> {
        let mut values = BTreeMap::new();
        for k in 0..self.dim() {
            values.insert(symbols.base[k].clone(), self.base_vertex[k]);
            values.insert(symbols.length[k].clone(), self.lengths[k]);
        }
        values
    }

    /// Evaluate the generator function at a numeric point of the unit box
    pub fn generator_point(&self, alpha: &[f64]) -> Vector {
        let dim = self.dim();
        let mut point = self.base_vertex.clone();
        for i in 0..dim {
            for (k, coord) in point.iter_mut().enumerate() {
                *coord += alpha[i] * self.lengths[i] * self.versors[i][k];
            }
        }
        point
    }
}
