//! Graph document types
//!
//! The graph is authored externally (UI or by hand) as a JSON document and
//! loaded read-only for a run:
//!
//! ```json
//! {
//!   "name": "daily-summary",
//!   "llm_model": "gpt-4",
//!   "prompt_template": "default",
//!   "nodes": [
//!     {"id": "in", "type": "start"},
//!     {"id": "clean", "type": "tool", "tool_name": "text_cleaner",
//!      "input_map": {"text": "aggregated_text"}, "output_key": "cleaned"},
//!     {"id": "sum", "type": "llm", "output_key": "result"},
//!     {"id": "out", "type": "end"}
//!   ],
//!   "edges": [
//!     {"source": "in", "target": "clean"},
//!     {"source": "clean", "target": "sum", "condition": "cleaned.cleaned_text != ''"},
//!     {"source": "clean", "target": "out"},
//!     {"source": "sum", "target": "out"}
//!   ]
//! }
//! ```

mod validate;

pub use validate::validate;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::VedaError;

/// Default key a node writes its output under
pub const DEFAULT_OUTPUT_KEY: &str = "result";

/// Node kind. Unrecognized strings deserialize to `Unknown` so that a bad
/// `type` is reported as a validation error with the node id, not as an
/// opaque parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Start,
    Tool,
    Llm,
    Branch,
    Merge,
    End,
    #[serde(other, skip_serializing)]
    Unknown,
}

/// A typed step in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Desired input field name -> dotted path into the run context
    #[serde(default)]
    pub input_map: FxHashMap<String, String>,
    #[serde(default = "default_output_key")]
    pub output_key: String,
}

fn default_output_key() -> String {
    DEFAULT_OUTPUT_KEY.to_string()
}

/// A directed transition, optionally guarded by a condition expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A workflow graph, read-only after validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Parse and validate a graph document. A graph that fails validation is
    /// never partially run.
    pub fn from_json(doc: &str) -> Result<Self, VedaError> {
        let graph: Graph = serde_json::from_str(doc)?;
        validate(&graph)?;
        Ok(graph)
    }

    /// First node of type `start` in declaration order. More than one start
    /// node is allowed; the first encountered wins.
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == NodeType::Start)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing edges of `id` in declaration order. Order is significant:
    /// it is the tie-break order for edge selection.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.source == id)
    }
}

/// A starter graph document: aggregate -> clean -> summarize -> end, with a
/// branch that skips the LLM call when nothing was extracted.
pub fn template() -> Graph {
    let doc = serde_json::json!({
        "name": "daily-summary",
        "llm_model": null,
        "prompt_template": "default",
        "nodes": [
            {"id": "in", "type": "start"},
            {"id": "clean", "type": "tool", "tool_name": "text_cleaner",
             "input_map": {"text": "aggregated_text"}, "output_key": "cleaned"},
            {"id": "gate", "type": "branch"},
            {"id": "summarize", "type": "llm",
             "input_map": {"content": "cleaned.cleaned_text"}, "output_key": "result"},
            {"id": "out", "type": "end"}
        ],
        "edges": [
            {"source": "in", "target": "clean"},
            {"source": "clean", "target": "gate"},
            {"source": "gate", "target": "summarize", "condition": "cleaned.cleaned_text != ''"},
            {"source": "gate", "target": "out"},
            {"source": "summarize", "target": "out"}
        ]
    });
    serde_json::from_value(doc).expect("builtin template graph is well-formed")
}
