//! LLM summarization
//!
//! The executor talks to models through the [`LlmInvoker`] trait. Two
//! implementations ship with the crate: [`OpenAiInvoker`] for the real
//! chat-completions endpoint and [`MockLlmInvoker`] for tests and offline
//! runs. Prompt text comes from [`PromptLibrary`] unless the request carries
//! a custom prompt, which replaces the template outright.

mod openai;
mod prompts;

pub use openai::OpenAiInvoker;
pub use prompts::{PromptLibrary, BUILTIN_TEMPLATES};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::LlmError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPLATE: &str = "default";

/// A request for one summarization call.
#[derive(Debug, Clone)]
pub struct SummarizeRequest<'a> {
    /// Document text to summarize.
    pub content: &'a str,
    /// Template name, resolved through the prompt library.
    pub template: &'a str,
    /// Model override; each invoker falls back to its own default.
    pub model: Option<&'a str>,
    /// Replaces the template entirely when present.
    pub custom_prompt: Option<&'a str>,
}

/// Summary text plus call metadata for the run record.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSummary {
    pub text: String,
    pub metadata: Value,
}

fn call_metadata(model: &str, template: &str, prompt_len: usize, custom: bool) -> Value {
    json!({
        "model_used": model,
        "template_used": template,
        "prompt_length": prompt_len,
        "custom_prompt": custom,
    })
}

/// Seam between the executor and a model backend.
#[async_trait]
pub trait LlmInvoker: Send + Sync {
    async fn summarize(&self, request: SummarizeRequest<'_>) -> Result<LlmSummary, LlmError>;
}

/// Deterministic invoker for tests and the `--provider mock` CLI path.
///
/// Produces a truncated echo of the content so assertions can check that the
/// right text reached the model, without any network traffic.
pub struct MockLlmInvoker {
    prompts: PromptLibrary,
    max_echo: usize,
}

impl MockLlmInvoker {
    pub fn new() -> Self {
        Self {
            prompts: PromptLibrary::new(),
            max_echo: 200,
        }
    }

    pub fn with_max_echo(max_echo: usize) -> Self {
        Self {
            prompts: PromptLibrary::new(),
            max_echo,
        }
    }
}

impl Default for MockLlmInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmInvoker for MockLlmInvoker {
    async fn summarize(&self, request: SummarizeRequest<'_>) -> Result<LlmSummary, LlmError> {
        let model = request.model.unwrap_or(DEFAULT_MODEL);
        let prompt = match request.custom_prompt {
            Some(p) => p.to_string(),
            None => self.prompts.render(request.template, request.content)?,
        };
        let mut echo: String = request.content.chars().take(self.max_echo).collect();
        if request.content.chars().count() > self.max_echo {
            echo.push_str("...");
        }
        Ok(LlmSummary {
            text: format!("[mock summary] {echo}"),
            metadata: call_metadata(
                model,
                request.template,
                prompt.chars().count(),
                request.custom_prompt.is_some(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_echoes_content() {
        let llm = MockLlmInvoker::new();
        let out = llm
            .summarize(SummarizeRequest {
                content: "the findings",
                template: "default",
                model: None,
                custom_prompt: None,
            })
            .await
            .unwrap();
        assert!(out.text.contains("the findings"));
        assert_eq!(out.metadata["model_used"], json!(DEFAULT_MODEL));
        assert_eq!(out.metadata["template_used"], json!("default"));
        assert_eq!(out.metadata["custom_prompt"], json!(false));
    }

    #[tokio::test]
    async fn mock_truncates_long_content() {
        let llm = MockLlmInvoker::with_max_echo(4);
        let out = llm
            .summarize(SummarizeRequest {
                content: "abcdefgh",
                template: "default",
                model: None,
                custom_prompt: None,
            })
            .await
            .unwrap();
        assert_eq!(out.text, "[mock summary] abcd...");
    }

    #[tokio::test]
    async fn custom_prompt_skips_template_lookup() {
        let llm = MockLlmInvoker::new();
        // "missing" is not a known template; the custom prompt bypasses it.
        let out = llm
            .summarize(SummarizeRequest {
                content: "x",
                template: "missing",
                model: Some("gpt-4"),
                custom_prompt: Some("just say hi"),
            })
            .await
            .unwrap();
        assert_eq!(out.metadata["custom_prompt"], json!(true));
        assert_eq!(out.metadata["model_used"], json!("gpt-4"));
    }

    #[tokio::test]
    async fn unknown_template_without_custom_prompt_fails() {
        let llm = MockLlmInvoker::new();
        let err = llm
            .summarize(SummarizeRequest {
                content: "x",
                template: "missing",
                model: None,
                custom_prompt: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Template { .. }));
    }
}
