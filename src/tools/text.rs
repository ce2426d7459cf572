//! Built-in `text_cleaner` tool.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::Tool;

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const DEFAULT_MAX_LENGTH: usize = 10_000;

/// Normalizes whitespace and reports simple text statistics.
///
/// Accepts either a bare string payload or an object carrying the text under
/// `text`, `text_content` or `cleaned_text`. Output keeps the original text
/// alongside the cleaned form so downstream nodes can pick either.
pub struct TextCleaner {
    max_length: usize,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }

    fn clean(&self, text: &str) -> String {
        let mut cleaned = WHITESPACE_RUNS.replace_all(text, " ").trim().to_string();
        if cleaned.chars().count() > self.max_length {
            cleaned = cleaned.chars().take(self.max_length).collect();
            cleaned.push_str("...");
        }
        cleaned
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_text(payload: &Value) -> Option<&str> {
    match payload {
        Value::String(s) => Some(s),
        Value::Object(map) => ["text", "text_content", "cleaned_text"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str)),
        _ => None,
    }
}

#[async_trait]
impl Tool for TextCleaner {
    fn name(&self) -> &str {
        "text_cleaner"
    }

    async fn run(&self, payload: Value) -> Result<Value, ToolError> {
        let text = extract_text(&payload).ok_or_else(|| ToolError::Execution {
            name: self.name().to_string(),
            reason: "payload must be a string or carry a text field".to_string(),
        })?;
        let cleaned = self.clean(text);
        let stats = json!({
            "original_length": text.chars().count(),
            "cleaned_length": cleaned.chars().count(),
            "word_count": cleaned.split_whitespace().count(),
            "line_count": text.lines().count(),
        });
        Ok(json!({
            "original_text": text,
            "cleaned_text": cleaned,
            "stats": stats,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn collapses_whitespace_runs() {
        let tool = TextCleaner::new();
        let out = tool
            .run(json!({"text": "  hello \n\t world  "}))
            .await
            .unwrap();
        assert_eq!(out["cleaned_text"], json!("hello world"));
        assert_eq!(out["stats"]["word_count"], json!(2));
    }

    #[tokio::test]
    async fn accepts_bare_string_payload() {
        let tool = TextCleaner::new();
        let out = tool.run(json!("a  b")).await.unwrap();
        assert_eq!(out["cleaned_text"], json!("a b"));
    }

    #[tokio::test]
    async fn truncates_past_max_length() {
        let tool = TextCleaner::with_max_length(5);
        let out = tool.run(json!("abcdefghij")).await.unwrap();
        assert_eq!(out["cleaned_text"], json!("abcde..."));
    }

    #[tokio::test]
    async fn rejects_payload_without_text() {
        let tool = TextCleaner::new();
        let err = tool.run(json!({"n": 1})).await.unwrap_err();
        assert!(matches!(err, ToolError::Execution { .. }));
    }
}
