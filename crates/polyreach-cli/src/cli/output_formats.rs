//! Serialization of analysis results
//!
//! Two formats are supported: a plain-text dump of each step's polytopes
//! and a structured JSON object with fields `variables`, `parameters` and
//! `data`. Polytopes serialize as `{"A": [[...]], "b": [...]}`, unions as
//! arrays of polytopes. For reachability `data` holds one `{flowpipe}`
//! object; for synthesis it holds one `{parameter set, flowpipe}` object
//! per non-empty refinement (an empty list when every refinement is
//! empty).

use serde::Serialize;

use polyreach_engine::{Flowpipe, Model};
use polyreach_geometry::{Polytope, PolytopesUnion};

/// A polytope in `{A, b}` form
#[derive(Debug, Serialize)]
pub struct PolytopeJson {
    #[serde(rename = "A")]
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
}

impl From<&Polytope> for PolytopeJson {
    fn from(polytope: &Polytope) -> Self {
        PolytopeJson {
            a: polytope.constraint_matrix().clone(),
            b: polytope.offsets().clone(),
        }
    }
}

fn union_json(union: &PolytopesUnion) -> Vec<PolytopeJson> {
    union.iter().map(PolytopeJson::from).collect()
}

fn flowpipe_json(flowpipe: &Flowpipe) -> Vec<Vec<PolytopeJson>> {
    flowpipe.iter().map(union_json).collect()
}

/// One entry of the `data` list
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DataJson {
    /// A reachability result
    Reach {
        /// The per-step reachable sets
        flowpipe: Vec<Vec<PolytopeJson>>,
    },
    /// One synthesis refinement with its flowpipe
    Synth {
        /// The refined parameter region
        #[serde(rename = "parameter set")]
        parameter_set: Vec<PolytopeJson>,
        /// The flowpipe under the refined region
        flowpipe: Vec<Vec<PolytopeJson>>,
    },
}

/// The top-level JSON object
#[derive(Debug, Serialize)]
pub struct OutputJson {
    variables: Vec<String>,
    parameters: Vec<String>,
    data: Vec<DataJson>,
}

/// JSON output of a reachability run
pub fn reach_output(model: &Model, flowpipe: &Flowpipe) -> OutputJson {
    OutputJson {
        variables: symbol_names(model.system.variables()),
        parameters: symbol_names(model.system.parameters()),
        data: vec![DataJson::Reach {
            flowpipe: flowpipe_json(flowpipe),
        }],
    }
}

/// JSON output of a synthesis run
pub fn synthesis_output(
    model: &Model,
    results: &[(PolytopesUnion, Flowpipe)],
) -> OutputJson {
    OutputJson {
        variables: symbol_names(model.system.variables()),
        parameters: symbol_names(model.system.parameters()),
        data: results
            .iter()
            .map(|(parameter_set, flowpipe)| DataJson::Synth {
                parameter_set: union_json(parameter_set),
                flowpipe: flowpipe_json(flowpipe),
            })
            .collect(),
    }
}

fn symbol_names(symbols: &[polyreach_algebra::Symbol]) -> Vec<String> {
    symbols.iter().map(|s| s.name().to_string()).collect()
}

/// Plain text dump of a flowpipe
pub fn plain_reach(flowpipe: &Flowpipe) -> String {
    flowpipe.to_string()
}

/// Plain text dump of the synthesis refinements and their flowpipes
pub fn plain_synthesis(results: &[(PolytopesUnion, Flowpipe)]) -> String {
    if results.is_empty() {
        return String::from("Empty parameter set");
    }
    let mut out = String::new();
    for (index, (parameter_set, flowpipe)) in results.iter().enumerate() {
        if index != 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "Refinement {index}:\nParameter set:\n{parameter_set}\nFlowpipe:\n{flowpipe}"
        ));
    }
    out
}
