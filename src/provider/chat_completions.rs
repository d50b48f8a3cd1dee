//! OpenAI-compatible `/chat/completions` client.
//!
//! OpenAI and OpenRouter speak the same request/response shape, so both
//! providers wrap this client with their own endpoint and model.

use crate::error::ProviderError;
use crate::provider::{read_json, request_error};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Chat API request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// Connection details for one chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    provider: String,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    http_client: reqwest::Client,
}

impl ChatCompletionsClient {
    /// `endpoint` is the full URL of the chat-completions route.
    pub fn new(
        provider: &str,
        endpoint: String,
        api_key: &str,
        model: &str,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            endpoint,
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature: None,
            http_client,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Send a single user message and return the assistant's text.
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: self.temperature,
        };

        debug!("Sending chat request to {} ({})", self.provider, self.model);

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(&self.provider, e))?;

        let body = read_json(&self.provider, response).await?;
        message_content(&body).ok_or_else(|| {
            ProviderError::unexpected(&self.provider, "missing choices[0].message.content")
        })
    }
}

/// `choices[0].message.content`, treating null or blank content as absent.
fn message_content(body: &Value) -> Option<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
