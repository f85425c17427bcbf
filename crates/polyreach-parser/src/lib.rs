//! Parser for the polyreach textual model format
//!
//! The format is a sequence of semicolon-terminated statements:
//!
//! ```text
//! problem: synthesis;
//! iterations: 2;
//!
//! var s in [0, 1];
//! var i in [0, 1];
//! var r in [0, 1];
//!
//! param alpha in [0.5, 0.6];
//! param beta in [0.1, 0.2];
//!
//! dynamic(s) = s - beta*s*i;
//! dynamic(i) = i + beta*s*i - alpha*i;
//! dynamic(r) = r + alpha*i;
//!
//! spec: i - 0.365 <= 0;
//! ```
//!
//! Parsing yields a raw [`ModelData`](polyreach_engine::ModelData); the
//! engine's model builder validates it and produces the analyzable
//! [`Model`](polyreach_engine::Model).

use anyhow::Error;
use polyreach_engine::Model;

// The pest derive generates errors as the doc comments are missing
#[allow(missing_docs)]
pub mod model_format;

/// Parse a complete analysis problem from a string
///
/// Parsers for model descriptions implement this trait.
pub trait ParseModel {
    /// Try to parse and build the model from a string
    fn parse_model(&self, input: &str) -> Result<Model, Error>;
}
