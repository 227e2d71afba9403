use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::{ChatCompletion, ChatMessage, ToolDefinition};
use crate::config::ChatConfig;

/// Completions can take a while when the model writes whole files.
const COMPLETION_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// A completion is sent exactly once; failures surface to the caller.
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(COMPLETION_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &ChatConfig, api_key: &str) -> Result<Self> {
        Self::new(&config.url, api_key, &config.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

impl ChatCompletion for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ChatMessage> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            tools,
            tool_choice: (!tools.is_empty()).then_some("auto"),
        };

        debug!(
            "Requesting completion from {} (model {}, {} messages)",
            self.url,
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text);
            error!("Chat completion failed (HTTP {}): {}", status.as_u16(), message);
            anyhow::bail!("Chat completion failed (HTTP {}): {}", status.as_u16(), message);
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .context("Chat completion returned no choices")
    }
}
