//! Error types of the engine crate

use core::fmt;
use std::error;

use polyreach_algebra::Symbol;
use polyreach_geometry::GeometryError;
use polyreach_stl::StlError;

/// Error raised while building a model
///
/// These are semantic validation failures: the model as described cannot
/// be analyzed and the build fails before any computation starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The same variable was declared twice
    DuplicateVariable(Symbol),
    /// The same parameter was declared twice
    DuplicateParameter(Symbol),
    /// A name is used for both a variable and a parameter
    NameClash(String),
    /// Variable and dynamics counts do not line up
    DynamicsArityMismatch {
        /// Number of declared variables
        variables: usize,
        /// Number of dynamic laws
        dynamics: usize,
    },
    /// A declared variable has no dynamic law
    MissingDynamics(Symbol),
    /// An expression mentions a symbol that is neither a variable nor a
    /// parameter
    UndeclaredSymbol(Symbol),
    /// An ODE model was given without an integration step
    MissingIntegrationStep,
    /// The integrated dynamic law of a variable is not affine in the
    /// parameters
    NonLinearParameterDependence(Symbol),
    /// Fewer directions than state variables
    NotEnoughDirections {
        /// Number of state variables
        variables: usize,
        /// Number of collected directions
        directions: usize,
    },
    /// No subset of the directions forms a basis for a default template
    NoIndependentTemplate,
    /// A parameter was declared without finite bounds
    MissingParameterBounds(Symbol),
    /// A synthesis problem was requested without a specification
    MissingSpecification,
    /// A geometric construction failed
    Geometry(GeometryError),
}

impl error::Error for ModelError {}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::DuplicateVariable(s) => write!(f, "Variable {s} is declared twice"),
            ModelError::DuplicateParameter(s) => write!(f, "Parameter {s} is declared twice"),
            ModelError::NameClash(name) => {
                write!(f, "The name {name} is used for both a variable and a parameter")
            }
            ModelError::DynamicsArityMismatch {
                variables,
                dynamics,
            } => write!(
                f,
                "The model declares {variables} variables but {dynamics} dynamic laws"
            ),
            ModelError::MissingDynamics(s) => {
                write!(f, "Variable {s} has no dynamic law")
            }
            ModelError::UndeclaredSymbol(s) => {
                write!(f, "Symbol {s} is neither a declared variable nor a parameter")
            }
            ModelError::MissingIntegrationStep => {
                write!(f, "An integration step is required for ODE dynamics")
            }
            ModelError::NonLinearParameterDependence(s) => write!(
                f,
                "The integrated dynamic law of {s} is not linear in the parameters"
            ),
            ModelError::NotEnoughDirections {
                variables,
                directions,
            } => write!(
                f,
                "Not enough bundle directions: {directions} given, at least {variables} needed"
            ),
            ModelError::NoIndependentTemplate => write!(
                f,
                "No template was given and the directions contain no basis to build one"
            ),
            ModelError::MissingParameterBounds(s) => {
                write!(f, "Parameter {s} needs finite bounds")
            }
            ModelError::MissingSpecification => {
                write!(f, "A synthesis problem needs an STL specification")
            }
            ModelError::Geometry(err) => write!(f, "{err}"),
        }
    }
}

impl From<GeometryError> for ModelError {
    fn from(err: GeometryError) -> Self {
        ModelError::Geometry(err)
    }
}

/// Error raised during an analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A geometric operation failed
    Geometry(GeometryError),
    /// A formula rewriting failed
    Stl(StlError),
    /// The synthesis recursion met a negation node; the caller must
    /// rewrite the formula to positive normal form first
    NonPnfFormula,
    /// Synthesis was requested but the model carries no specification
    MissingSpecification,
    /// The worker pool could not be created
    PoolCreation(String),
}

impl error::Error for EngineError {}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Geometry(err) => write!(f, "{err}"),
            EngineError::Stl(err) => write!(f, "{err}"),
            EngineError::NonPnfFormula => write!(
                f,
                "Synthesis requires a formula in positive normal form"
            ),
            EngineError::MissingSpecification => {
                write!(f, "The model carries no STL specification")
            }
            EngineError::PoolCreation(reason) => {
                write!(f, "Could not create the worker pool: {reason}")
            }
        }
    }
}

impl From<GeometryError> for EngineError {
    fn from(err: GeometryError) -> Self {
        EngineError::Geometry(err)
    }
}

impl From<StlError> for EngineError {
    fn from(err: StlError) -> Self {
        EngineError::Stl(err)
    }
}
