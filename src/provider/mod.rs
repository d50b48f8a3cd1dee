//! Hosted-model clients.
//!
//! Two primary providers classify a message independently; a third model
//! reconciles their verdicts. Each vendor sits behind one of the two traits
//! below so the pipeline never sees vendor request shapes.

pub mod chat_completions;
pub mod gemini;
pub mod openai;
pub mod openrouter;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterSynthesizer;

use crate::error::ProviderError;
use crate::models::Verdict;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A service that classifies a message on its own.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    /// Short provider name used in logs and error details.
    fn name(&self) -> &str;

    /// Classify `text`. Called exactly once per job.
    async fn classify(&self, text: &str) -> Result<Verdict, ProviderError>;
}

/// A service that merges several primary verdicts into one.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Reconcile `verdicts` (non-empty, in provider order) into a final verdict.
    async fn synthesize(&self, verdicts: &[Verdict]) -> Result<Verdict, ProviderError>;
}

/// Build the shared HTTP client for provider calls.
pub fn http_client(timeout_seconds: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
}

/// Instruction prompt sent to every primary provider.
pub fn classification_prompt(text: &str) -> String {
    format!(
        r#"
Bạn là một hệ thống phân tích an toàn thông minh. Hãy phân tích đoạn tin nhắn sau và trả lời dưới dạng JSON với các key:

- "is_scam" (boolean): Đây có phải nội dung lừa đảo, độc hại, hoặc nguy hiểm không (vd: true, false)?
- "reason" (string): Giải thích ngắn gọn vì sao bị đánh giá như vậy.
- "types" (string): Các loại rủi ro tiềm ẩn (vd: "Lừa đảo", "bạo lực", v.v.).
- "score" (number 1-5): Mức độ nghiêm trọng (1 là nhẹ, 5 là cực kỳ nguy hiểm).
- "recommend" (string): Gợi ý hành động nên làm (vd: báo cáo, xoá, bỏ qua, cảnh giác, v.v.).

Đoạn tin nhắn: {}
"#,
        text
    )
}

/// Prompt asking the synthesizer to reconcile the primary verdicts.
pub fn synthesis_prompt(verdicts: &[Verdict]) -> String {
    let analyses = serde_json::to_string_pretty(verdicts).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Bạn là chuyên gia an ninh, hãy tổng hợp các phân tích sau thành một kết quả JSON cuối cùng và chính xác nhất với các key:
- "is_scam", "reason", "types", "score", "recommend".

--- CÁC PHÂN TÍCH ---
{}"#,
        analyses
    )
}

/// Remove a Markdown code fence wrapping the model output, if any.
///
/// Text without a fence comes back trimmed but otherwise unchanged.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag on the opening fence line ("```json").
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse raw model output into a verdict.
///
/// Falls back to the outermost `{ .. }` span when the model wrapped the JSON
/// in prose.
pub fn parse_verdict(provider: &str, raw: &str) -> Result<Verdict, ProviderError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ProviderError::malformed(provider, "empty output"));
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(first) => outermost_object(text)
            .and_then(|span| serde_json::from_str(span).ok())
            .ok_or_else(|| ProviderError::malformed(provider, format!("not JSON: {}", first)))?,
    };

    Verdict::from_value(&value).map_err(|detail| ProviderError::malformed(provider, detail))
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Read the response body, mapping a non-2xx status to [`ProviderError::Status`].
pub(crate) async fn read_json(
    provider: &str,
    response: reqwest::Response,
) -> Result<Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status,
            body: excerpt(&body),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::unexpected(provider, format!("body is not JSON: {}", e)))
}

/// Transport failure. The URL is dropped so no endpoint detail reaches logs
/// or callers.
pub(crate) fn request_error(provider: &str, source: reqwest::Error) -> ProviderError {
    ProviderError::Request {
        provider: provider.to_string(),
        source: source.without_url(),
    }
}

fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}
