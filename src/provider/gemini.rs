//! Gemini primary provider (`generateContent`).

use crate::config::{GeminiConfig, GEMINI};
use crate::error::ProviderError;
use crate::models::Verdict;
use crate::provider::{
    classification_prompt, parse_verdict, read_json, request_error, ClassificationProvider,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Header carrying the API key. Keeps the key out of the request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig, api_key: &str, http_client: reqwest::Client) -> Self {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        Self {
            endpoint,
            api_key: api_key.to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl ClassificationProvider for GeminiProvider {
    fn name(&self) -> &str {
        GEMINI
    }

    async fn classify(&self, text: &str) -> Result<Verdict, ProviderError> {
        let prompt = classification_prompt(text);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        debug!("Sending generateContent request to {}", GEMINI);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(GEMINI, e))?;

        let body = read_json(GEMINI, response).await?;
        let output = candidate_text(&body).ok_or_else(|| {
            ProviderError::unexpected(GEMINI, "missing candidates[0].content.parts[0].text")
        })?;

        parse_verdict(GEMINI, output)
    }
}

fn candidate_text(body: &Value) -> Option<&str> {
    body["candidates"][0]["content"]["parts"][0]["text"].as_str()
}
