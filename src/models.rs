//! Data models shared across the pipeline.
//!
//! A [`Verdict`] is produced by every provider call and by the synthesizer;
//! [`AnalysisRequest`] and [`JobResult`] are the two halves of a job as it
//! travels over the host channel.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured classification of a message.
///
/// Used both for the per-provider verdicts and for the final synthesized one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Verdict {
    /// Whether the message is a scam or otherwise malicious.
    pub is_scam: bool,
    /// Short explanation of the assessment.
    pub reason: String,
    /// Kinds of risk detected (e.g. "Lừa đảo").
    pub types: String,
    /// Severity from 1 (mild) to 5 (extremely dangerous).
    pub score: u8,
    /// Suggested action (e.g. "báo cáo", "bỏ qua").
    pub recommend: String,
}

impl Verdict {
    pub const MIN_SCORE: u8 = 1;
    pub const MAX_SCORE: u8 = 5;

    /// Decode a verdict from model output, tolerating the usual drift:
    /// booleans and scores sent as strings, float scores, `types` as a list.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected a JSON object, got {}", kind_of(value)))?;

        let is_scam = match obj.get("is_scam") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => false,
            Some(other) => return Err(format!("is_scam is not a boolean: {}", other)),
            None => return Err("missing field is_scam".to_string()),
        };

        Ok(Self {
            is_scam,
            reason: text_field(obj.get("reason")),
            types: types_field(obj.get("types")),
            score: score_field(obj.get("score"))?,
            recommend: text_field(obj.get("recommend")),
        })
    }
}

impl TryFrom<Value> for Verdict {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn types_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| text_field(Some(item)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => text_field(other),
    }
}

fn score_field(value: Option<&Value>) -> Result<u8, String> {
    let raw = match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("score is not representable: {}", n))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("score is not numeric: {:?}", s))?,
        Some(other) => return Err(format!("score is not a number: {}", other)),
        None => return Err("missing field score".to_string()),
    };

    let rounded = raw.round();
    if !(f64::from(Verdict::MIN_SCORE)..=f64::from(Verdict::MAX_SCORE)).contains(&rounded) {
        return Err(format!(
            "score {} is outside {}-{}",
            raw,
            Verdict::MIN_SCORE,
            Verdict::MAX_SCORE
        ));
    }

    Ok(rounded as u8)
}

/// One job submitted by the host process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Opaque correlation token, echoed back verbatim.
    pub id: Value,
    /// Message text to classify.
    pub text: String,
}

/// Outcome of a job, correlated with its request by `id`.
///
/// Serializes as `{"id": .., "payload": {..}}` or `{"id": .., "error": ".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    Success { id: Value, payload: Verdict },
    Failure { id: Value, error: String },
}

impl JobResult {
    pub fn from_outcome(id: Value, outcome: Result<Verdict, AnalysisError>) -> Self {
        match outcome {
            Ok(payload) => Self::Success { id, payload },
            Err(e) => Self::Failure {
                id,
                error: e.to_string(),
            },
        }
    }

    pub fn id(&self) -> &Value {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Verdict {
        Verdict {
            is_scam: true,
            reason: "Advance-fee scam pattern".to_string(),
            types: "Lừa đảo".to_string(),
            score: 5,
            recommend: "báo cáo".to_string(),
        }
    }

    #[test]
    fn test_verdict_strict_shape() {
        let value = json!({
            "is_scam": true,
            "reason": "Advance-fee scam pattern",
            "types": "Lừa đảo",
            "score": 5,
            "recommend": "báo cáo"
        });
        assert_eq!(Verdict::from_value(&value).unwrap(), sample());
    }

    #[test]
    fn test_verdict_tolerates_drift() {
        let value = json!({
            "is_scam": "True",
            "reason": "Link rút gọn",
            "types": ["Lừa đảo", "Phishing"],
            "score": "4.2",
        });
        let verdict = Verdict::from_value(&value).unwrap();
        assert!(verdict.is_scam);
        assert_eq!(verdict.types, "Lừa đảo, Phishing");
        assert_eq!(verdict.score, 4);
        assert_eq!(verdict.recommend, "");
    }

    #[test]
    fn test_verdict_rejects_bad_score() {
        let out_of_range = json!({"is_scam": false, "score": 9});
        assert!(Verdict::from_value(&out_of_range).is_err());

        let missing = json!({"is_scam": false, "reason": "ok"});
        assert!(Verdict::from_value(&missing).is_err());
    }

    #[test]
    fn test_verdict_rejects_non_object() {
        assert!(Verdict::from_value(&json!([1, 2])).is_err());
        assert!(Verdict::from_value(&json!({"score": 2})).is_err());
    }

    #[test]
    fn test_verdict_serializes_five_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        for key in ["is_scam", "reason", "types", "score", "recommend"] {
            assert!(keys.contains(&key.to_string()));
        }
    }

    #[test]
    fn test_job_result_wire_shape() {
        let ok = JobResult::from_outcome(json!("42"), Ok(sample()));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"id": "42", "payload": serde_json::to_value(sample()).unwrap()})
        );

        let failed = JobResult::from_outcome(json!(7), Err(AnalysisError::NoText));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"id": 7, "error": "No text to analyze was provided."})
        );
        assert!(!failed.is_success());
        assert_eq!(failed.id(), &json!(7));
    }
}
