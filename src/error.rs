//! Error types for provider calls and the analysis pipeline.

use thiserror::Error;

/// Failure of a single call to a hosted model.
///
/// Every variant carries the provider name so that a log line or an
/// aggregated error message can tell the stages apart.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{provider} returned an unexpected response: {detail}")]
    UnexpectedShape { provider: String, detail: String },

    #[error("{provider} returned a malformed verdict: {detail}")]
    MalformedVerdict { provider: String, detail: String },
}

impl ProviderError {
    pub fn unexpected(provider: &str, detail: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    pub fn malformed(provider: &str, detail: impl Into<String>) -> Self {
        Self::MalformedVerdict {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }
}

/// Failure of a whole analysis job.
///
/// The `Display` output is the exact `error` string sent back to the caller.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No text to analyze was provided.")]
    NoText,

    #[error("All primary analysis providers failed: {}", .failures.join("; "))]
    AllProvidersFailed { failures: Vec<String> },

    #[error("Synthesis failed: {0}")]
    Synthesis(#[source] ProviderError),
}

/// Rejection of an inbound job message before it reaches the pipeline.
#[derive(Error, Debug)]
pub enum InboundError {
    #[error("message is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no id")]
    MissingId,

    #[error("job {id}: no text")]
    NoText { id: serde_json::Value },
}
