//! Reachability and STL parameter synthesis for polynomial systems
//!
//! This crate is the analysis core of polyreach. It builds a validated
//! [`Model`] from a raw [`ModelData`] description (integrating ODE
//! dynamics when required), and runs an [`Analyzer`] over it:
//!
//! - [`Analyzer::reach`] produces a [`Flowpipe`] — one reachable-set
//!   over-approximation per step, computed by bundle image operations and
//!   backed by the Bernstein control-point cache,
//! - [`Analyzer::synthesize`] refines the parameter region against the
//!   model's STL specification, splitting the region when a refinement
//!   comes back empty.
//!
//! Pure subcomputations fan out to a [`WorkerPool`] through
//! [`TaskBatch`]es; progress is reported through a polled
//! [`ProgressAccounter`].

mod analyzer;
mod batch;
mod error;
mod integrator;
mod model;
mod progress;
mod reach;
mod synthesis;
mod system;

pub use analyzer::Analyzer;
pub use batch::{TaskBatch, WorkerPool};
pub use error::{EngineError, ModelError};
pub use integrator::{integrate, IntegratorKind};
pub use model::{
    build_model, AnalysisOptions, DynamicsKind, Model, ModelData, ProblemType,
};
pub use progress::{estimate_synthesis_steps, ProgressAccounter};
pub use reach::Flowpipe;
pub use system::DiscreteSystem;
