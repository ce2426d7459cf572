//! OpenAI chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::{call_metadata, LlmInvoker, LlmSummary, PromptLibrary, SummarizeRequest, DEFAULT_MODEL};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Models this invoker accepts, with their wire names.
const KNOWN_MODELS: &[(&str, &str)] = &[
    ("gpt-3.5-turbo", "gpt-3.5-turbo"),
    ("gpt-4", "gpt-4"),
    ("gpt-4-turbo", "gpt-4-turbo-preview"),
];

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completions client. Reads `OPENAI_API_KEY` and optionally
/// `OPENAI_BASE_URL` from the environment.
pub struct OpenAiInvoker {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    prompts: PromptLibrary,
}

impl OpenAiInvoker {
    /// Build from the environment. Fails with [`LlmError::ModelUnavailable`]
    /// when no API key is set, since no model can be reached without one.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| LlmError::ModelUnavailable {
            model: DEFAULT_MODEL.to_string(),
        })?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, base_url))
    }

    pub fn new(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            prompts: PromptLibrary::new(),
        }
    }

    fn wire_name(model: &str) -> Result<&'static str, LlmError> {
        KNOWN_MODELS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, wire)| *wire)
            .ok_or_else(|| LlmError::ModelUnavailable {
                model: model.to_string(),
            })
    }
}

#[async_trait]
impl LlmInvoker for OpenAiInvoker {
    async fn summarize(&self, request: SummarizeRequest<'_>) -> Result<LlmSummary, LlmError> {
        let model = request.model.unwrap_or(DEFAULT_MODEL);
        let wire_model = Self::wire_name(model)?;

        let prompt = match request.custom_prompt {
            Some(p) => p.to_string(),
            None => self.prompts.render(request.template, request.content)?,
        };

        debug!(model, template = request.template, prompt_len = prompt.len(), "chat completion");

        let body = json!({
            "model": wire_model,
            "messages": [ChatMessage { role: "user", content: &prompt }],
            "temperature": DEFAULT_TEMPERATURE,
            "max_tokens": DEFAULT_MAX_TOKENS,
        });
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Request {
                reason: format!("HTTP {status}: {detail}"),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::Request {
            reason: e.to_string(),
        })?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Request {
                reason: "response carried no choices".to_string(),
            })?;

        Ok(LlmSummary {
            text,
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

    #[test]
    fn known_models_map_to_wire_names() {
        assert_eq!(OpenAiInvoker::wire_name("gpt-4").unwrap(), "gpt-4");
        assert_eq!(
            OpenAiInvoker::wire_name("gpt-4-turbo").unwrap(),
            "gpt-4-turbo-preview"
        );
    }

    #[test]
    fn unknown_model_is_unavailable() {
        let err = OpenAiInvoker::wire_name("claude-opus").unwrap_err();
        assert!(matches!(err, LlmError::ModelUnavailable { model } if model == "claude-opus"));
    }

    #[tokio::test]
    async fn model_gate_runs_before_any_request() {
        // An invoker pointed at an unroutable host still rejects unknown
        // models without touching the network.
        let invoker = OpenAiInvoker::new("sk-test".into(), "http://127.0.0.1:0".into());
        let err = invoker
            .summarize(SummarizeRequest {
                content: "x",
                template: "default",
                model: Some("not-a-model"),
                custom_prompt: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ModelUnavailable { .. }));
    }
}
