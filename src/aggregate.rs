//! Pre-run text aggregation
//!
//! Before the graph executes, the input files are read and concatenated into
//! a single text blob seeded into the context. Extraction is dispatched on
//! file extension through the tool layer; plain files are read directly.
//! A file that fails to extract is skipped with a warning, it does not fail
//! the run.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::tools::ToolInvoker;

/// Context fields probed, in order, for the extracted text of one file.
const TEXT_FIELDS: &[&str] = &["text_content", "cleaned_text", "text"];

/// Concatenates extracted text from a set of input files.
pub struct TextAggregator {
    tools: Arc<dyn ToolInvoker>,
}

impl TextAggregator {
    pub fn new(tools: Arc<dyn ToolInvoker>) -> Self {
        Self { tools }
    }

    /// Extract and join the text of every readable file, separated by
    /// newlines. Files that fail are skipped; an empty result is valid.
    pub async fn aggregate(&self, files: &[String]) -> String {
        let mut parts = Vec::with_capacity(files.len());
        for file in files {
            match self.extract(file).await {
                Some(text) if !text.is_empty() => {
                    debug!(%file, chars = text.len(), "extracted");
                    parts.push(text);
                }
                Some(_) => debug!(%file, "extracted empty text, skipping"),
                None => warn!(%file, "extraction failed, skipping"),
            }
        }
        parts.join("\n")
    }

    async fn extract(&self, file: &str) -> Option<String> {
        match tool_for_extension(file) {
            Some(tool_name) => {
                let payload = json!({ "path": file });
                match self.tools.invoke(tool_name, payload).await {
                    Ok(result) => text_of(&result),
                    Err(e) => {
                        warn!(%file, tool = tool_name, error = %e, "extraction tool failed");
                        None
                    }
                }
            }
            None => match tokio::fs::read_to_string(file).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(%file, error = %e, "read failed");
                    None
                }
            },
        }
    }
}

/// Extraction tool for a file, by extension. `None` means plain text.
fn tool_for_extension(file: &str) -> Option<&'static str> {
    let ext = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("pdf_parser"),
        "jpg" | "jpeg" | "png" | "gif" | "bmp" => Some("image_reader"),
        "xlsx" | "xls" => Some("excel_reader"),
        _ => None,
    }
}

/// Pull the text out of a tool result, probing the known field names.
fn text_of(result: &Value) -> Option<String> {
    match result {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => TEXT_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}
