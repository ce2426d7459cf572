//! ExecutionContext - the mutable key/value store threaded through a run
//!
//! One context per run, created at run start and never shared across runs.
//! Nodes mutate it by writing to their `output_key`; LLM nodes additionally
//! maintain the well-known `summary` and `llm_meta` keys. At run end the
//! snapshot is serialized into the output record (success or failure).

use serde_json::{Map, Value};

use crate::path;

/// Well-known context keys
pub const KEY_AGGREGATED_TEXT: &str = "aggregated_text";
pub const KEY_CUSTOM_PROMPT: &str = "custom_prompt";
pub const KEY_SUMMARY: &str = "summary";
pub const KEY_LLM_META: &str = "llm_meta";

/// Seed values for a fresh run context
#[derive(Debug, Clone, Default)]
pub struct ContextSeed {
    pub project: String,
    pub date: String,
    pub wf_id: String,
    pub custom_prompt: Option<String>,
    pub files: Vec<String>,
    pub aggregated_text: String,
}

/// The run's data context: a single mutable mapping from string keys to
/// heterogeneous JSON values.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with the run identifiers and inputs.
    pub fn seeded(seed: ContextSeed) -> Self {
        let mut values = Map::new();
        values.insert("project".into(), Value::String(seed.project));
        values.insert("date".into(), Value::String(seed.date));
        values.insert("wf_id".into(), Value::String(seed.wf_id));
        values.insert(
            KEY_CUSTOM_PROMPT.into(),
            seed.custom_prompt.map(Value::String).unwrap_or(Value::Null),
        );
        values.insert(
            "files".into(),
            Value::Array(seed.files.into_iter().map(Value::String).collect()),
        );
        values.insert(
            KEY_AGGREGATED_TEXT.into(),
            Value::String(seed.aggregated_text),
        );
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Resolve a dotted path against the context. Absence yields `Null`.
    pub fn resolve_path(&self, dotted: &str) -> Value {
        path::resolve(&self.values, dotted)
    }

    /// Append one LLM call metadata record to the `llm_meta` list, creating
    /// the list on first use.
    pub fn push_llm_meta(&mut self, meta: Value) {
        match self.values.get_mut(KEY_LLM_META) {
            Some(Value::Array(list)) => list.push(meta),
            _ => {
                self.values
                    .insert(KEY_LLM_META.into(), Value::Array(vec![meta]));
            }
        }
    }

    /// Freeze the context into a JSON object (used for whole-context tool
    /// payloads and for the output record).
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
