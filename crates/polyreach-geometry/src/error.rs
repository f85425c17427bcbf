//! Error types of the geometry crate

use core::fmt;
use std::error;

use polyreach_algebra::AlgebraError;

/// Error raised while constructing or manipulating geometric sets
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Two objects that must share a dimension do not
    DimensionMismatch {
        /// What was being combined or constructed
        what: &'static str,
        /// Expected dimension
        expected: usize,
        /// Dimension found
        found: usize,
    },
    /// A direction matrix has no rows
    EmptyDirections,
    /// A bundle was given no templates
    EmptyTemplates,
    /// A template row references a direction index outside the pool
    TemplateIndexOutOfRange {
        /// The offending index
        index: usize,
        /// Number of available directions
        directions: usize,
    },
    /// The directions selected by a template are not linearly independent
    DependentTemplateDirections,
    /// A square direction matrix is singular
    SingularDirections,
    /// A constraint expression is not affine in the declared symbols
    NonLinearConstraint(AlgebraError),
}

impl error::Error for GeometryError {}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "Dimension mismatch in {what}: expected {expected}, found {found}"
            ),
            GeometryError::EmptyDirections => {
                write!(f, "The direction matrix must be non-empty")
            }
            GeometryError::EmptyTemplates => {
                write!(f, "The template set must be non-empty")
            }
            GeometryError::TemplateIndexOutOfRange { index, directions } => write!(
                f,
                "Template mentions direction {index} but only {directions} directions exist"
            ),
            GeometryError::DependentTemplateDirections => write!(
                f,
                "The directions selected by a template must be linearly independent"
            ),
            GeometryError::SingularDirections => {
                write!(f, "The direction matrix is singular")
            }
            GeometryError::NonLinearConstraint(err) => {
                write!(f, "Constraint is not affine: {err}")
            }
        }
    }
}

impl From<AlgebraError> for GeometryError {
    fn from(err: AlgebraError) -> Self {
        GeometryError::NonLinearConstraint(err)
    }
}
