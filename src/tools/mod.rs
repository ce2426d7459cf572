//! Tool invocation
//!
//! Tool nodes and the text aggregator both go through the [`ToolInvoker`]
//! trait, so the executor never knows which tools exist or how they run.
//! The default implementation is [`ToolRegistry`], a name-indexed set of
//! [`Tool`] trait objects with per-tool enable flags.

mod text;

pub use text::TextCleaner;

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ToolError;

/// A single named capability that takes and returns JSON.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, payload: Value) -> Result<Value, ToolError>;
}

/// Dispatch seam between the executor and concrete tools.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke the named tool with a JSON payload.
    async fn invoke(&self, tool_name: &str, payload: Value) -> Result<Value, ToolError>;
}

struct Registered {
    tool: Box<dyn Tool>,
    enabled: bool,
}

/// Name-indexed registry of tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: FxHashMap<String, Registered>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TextCleaner::new()));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, Registered { tool, enabled: true });
    }

    /// Disable a tool without removing it. Invoking a disabled tool is a
    /// distinct error from an unknown one.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(entry) = self.tools.get_mut(name) {
            entry.enabled = enabled;
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn invoke(&self, tool_name: &str, payload: Value) -> Result<Value, ToolError> {
        let entry = self.tools.get(tool_name).ok_or_else(|| ToolError::NotFound {
            name: tool_name.to_string(),
        })?;
        if !entry.enabled {
            return Err(ToolError::Disabled {
                name: tool_name.to_string(),
            });
        }
        debug!(tool = tool_name, "invoking tool");
        entry.tool.run(payload).await
    }
}

/// Scripted invoker for tests and dry runs. Responses are looked up by tool
/// name; unknown names report [`ToolError::NotFound`] just like the registry.
pub struct MockToolInvoker {
    responses: FxHashMap<String, Value>,
    failures: FxHashMap<String, String>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockToolInvoker {
    pub fn new() -> Self {
        Self {
            responses: FxHashMap::default(),
            failures: FxHashMap::default(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn respond(mut self, tool_name: &str, response: Value) -> Self {
        self.responses.insert(tool_name.to_string(), response);
        self
    }

    /// Make the named tool fail with [`ToolError::Execution`].
    pub fn fail(mut self, tool_name: &str, reason: &str) -> Self {
        self.failures.insert(tool_name.to_string(), reason.to_string());
        self
    }

    /// Every `(tool_name, payload)` pair seen so far, in call order.
    pub async fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockToolInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolInvoker for MockToolInvoker {
    async fn invoke(&self, tool_name: &str, payload: Value) -> Result<Value, ToolError> {
        self.calls
            .lock()
            .await
            .push((tool_name.to_string(), payload));
        if let Some(reason) = self.failures.get(tool_name) {
            return Err(ToolError::Execution {
                name: tool_name.to_string(),
                reason: reason.clone(),
            });
        }
        self.responses
            .get(tool_name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound {
                name: tool_name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let registry = ToolRegistry::with_builtins();
        let out = registry
            .invoke("text_cleaner", json!({"text": "a  b"}))
            .await
            .unwrap();
        assert_eq!(out["cleaned_text"], json!("a b"));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound { name } if name == "nope"));
    }

    #[tokio::test]
    async fn disabled_tool_is_distinct_from_missing() {
        let mut registry = ToolRegistry::with_builtins();
        registry.set_enabled("text_cleaner", false);
        let err = registry
            .invoke("text_cleaner", json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Disabled { .. }));
    }

    #[tokio::test]
    async fn mock_records_calls_and_scripts_failures() {
        let mock = MockToolInvoker::new()
            .respond("echo", json!({"ok": true}))
            .fail("boom", "scripted");
        assert_eq!(
            mock.invoke("echo", json!({"n": 1})).await.unwrap(),
            json!({"ok": true})
        );
        let err = mock.invoke("boom", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Execution { .. }));
        let calls = mock.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "echo");
    }
}
