//! Verdict rendering for the one-shot CLI mode.

use crate::models::Verdict;
use anyhow::{Context, Result};

/// Render the verdict as pretty-printed JSON.
pub fn render_json(verdict: &Verdict) -> Result<String> {
    serde_json::to_string_pretty(verdict).context("Failed to serialize verdict")
}

/// Render the verdict as a chat-style warning message.
pub fn render_text(verdict: &Verdict) -> String {
    let reason = or_default(&verdict.reason, "Không có lý do cụ thể.");

    if !verdict.is_scam {
        return format!("✅ Tin nhắn này có vẻ An Toàn.\n\n- Phân tích: {}", reason);
    }

    format!(
        "{} Cảnh báo từ CyberShield! Tin nhắn này có dấu hiệu NGUY HIỂM.\n\n\
         - Loại nguy hiểm: {}\n\
         - Lý do: {}\n\
         - Mức độ: {}/{}\n\
         ➡️ Hành động đề xuất: {}",
        danger_emoji(verdict.score),
        or_default(&verdict.types, "Không xác định"),
        reason,
        verdict.score,
        Verdict::MAX_SCORE,
        or_default(&verdict.recommend, "Hãy tự mình xem xét cẩn thận."),
    )
}

/// ❌ for severe scams (score 4-5), ⚠️ otherwise.
pub fn danger_emoji(score: u8) -> &'static str {
    if score >= 4 {
        "❌"
    } else {
        "⚠️"
    }
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
