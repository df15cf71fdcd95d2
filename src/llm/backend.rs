//! Chat completion transport.

use crate::{
    config::app::LlmConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 300;

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// A system prompt.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Something that completes a conversation with a given API key.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the assistant's reply.
    async fn complete(&self, key: &str, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// OpenRouter's OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenRouterBackend {
    /// Creates a backend from the `[llm]` section.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, key: &str, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {key}"))
            .header("X-Title", "Frostkeeper")
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Llm {
                message: "Completion without choices".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_request_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let body = serde_json::to_value(CompletionRequest {
            model: "openai/gpt-3.5-turbo",
            messages: &messages,
            max_tokens: 100,
        })
        .unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 100);
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hello"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hello");
    }
}
