//! Job bridge between a host process and the analysis pipeline.
//!
//! The host submits `{"id", "text"}` messages over an asynchronous channel
//! and receives exactly one `{"id", "payload"}` or `{"id", "error"}` message
//! per job. The bridge itself knows nothing about the transport; see
//! [`stdio`] for the line-delimited stdin/stdout channel.

pub mod stdio;

use crate::analysis::Pipeline;
use crate::error::{AnalysisError, InboundError};
use crate::models::{AnalysisRequest, JobResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Readiness notification sent once, before any job is processed.
pub const READY_MESSAGE: &str = "Analysis engine has started and is ready.";

/// Characters of job text included in log lines.
const LOG_PREVIEW_CHARS: usize = 50;

/// Turns one request into one result. Implementations must never panic
/// on bad input; every failure becomes a [`JobResult::Failure`].
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, request: AnalysisRequest) -> JobResult;
}

#[async_trait]
impl JobHandler for Pipeline {
    async fn handle(&self, request: AnalysisRequest) -> JobResult {
        info!(
            "Received job {}: analyzing '{}...'",
            request.id,
            preview(&request.text)
        );

        let outcome = self.run(&request.text).await;
        match &outcome {
            Ok(verdict) => info!(
                "Job {} complete: is_scam={} score={}",
                request.id, verdict.is_scam, verdict.score
            ),
            Err(e) => warn!("Job {} failed: {}", request.id, e),
        }

        JobResult::from_outcome(request.id, outcome)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

/// Decode an inbound message.
///
/// The id is recovered whenever the message is a JSON object with a non-null
/// `id`, so a missing or empty `text` can still be answered.
pub fn parse_inbound(raw: &str) -> Result<AnalysisRequest, InboundError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut fields) = value else {
        return Err(InboundError::NotAnObject);
    };

    let id = match fields.remove("id") {
        None | Some(Value::Null) => return Err(InboundError::MissingId),
        Some(id) => id,
    };

    match fields.remove("text") {
        Some(Value::String(text)) if !text.is_empty() => Ok(AnalysisRequest { id, text }),
        _ => Err(InboundError::NoText { id }),
    }
}

/// Error string sent when a handler panics instead of returning a result.
pub const INTERNAL_ERROR: &str = "Internal error while analyzing the message.";

/// Handle one raw message. Returns `None` only when no id could be recovered.
///
/// A panicking handler still yields a [`JobResult::Failure`] for the job.
pub async fn process_message(handler: &dyn JobHandler, raw: &str) -> Option<JobResult> {
    match parse_inbound(raw) {
        Ok(request) => {
            let id = request.id.clone();
            let result = AssertUnwindSafe(handler.handle(request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("Job {} panicked", id);
                    JobResult::Failure {
                        id,
                        error: INTERNAL_ERROR.to_string(),
                    }
                });
            Some(result)
        }
        Err(InboundError::NoText { id }) => {
            warn!("Job {} rejected: {}", id, AnalysisError::NoText);
            Some(JobResult::from_outcome(id, Err(AnalysisError::NoText)))
        }
        Err(e) => {
            warn!("Dropping inbound message without a usable id: {}", e);
            None
        }
    }
}

/// Dispatches inbound messages to a [`JobHandler`], one task per job.
pub struct Bridge {
    handler: Arc<dyn JobHandler>,
}

impl Bridge {
    pub fn new(handler: Arc<dyn JobHandler>) -> Self {
        Self { handler }
    }

    /// Serve jobs until `inbound` closes, then wait for in-flight jobs.
    ///
    /// Jobs run independently: a slow job never delays the intake or the
    /// result of another.
    pub async fn run(
        &self,
        mut inbound: mpsc::Receiver<String>,
        outbound: mpsc::Sender<String>,
    ) -> Result<()> {
        outbound
            .send(READY_MESSAGE.to_string())
            .await
            .context("Host channel closed before the ready notification")?;
        info!("Job bridge ready");

        let mut jobs = JoinSet::new();

        while let Some(message) = inbound.recv().await {
            let handler = Arc::clone(&self.handler);
            let outbound = outbound.clone();

            jobs.spawn(async move {
                if let Some(result) = process_message(handler.as_ref(), &message).await {
                    deliver(&outbound, &result).await;
                }
            });

            while let Some(joined) = jobs.try_join_next() {
                log_join(joined);
            }
        }

        debug!(
            "Inbound channel closed, waiting for {} in-flight jobs",
            jobs.len()
        );
        while let Some(joined) = jobs.join_next().await {
            log_join(joined);
        }

        info!("Job bridge stopped");
        Ok(())
    }
}

async fn deliver(outbound: &mpsc::Sender<String>, result: &JobResult) {
    let message = match serde_json::to_string(result) {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to encode result for job {}: {}", result.id(), e);
            return;
        }
    };

    debug!(
        "Delivering {} for job {}",
        if result.is_success() { "payload" } else { "error" },
        result.id()
    );
    if outbound.send(message).await.is_err() {
        warn!(
            "Host channel closed; result for job {} was not delivered",
            result.id()
        );
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!("Job task failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{verdict, StubProvider};
    use crate::analysis::MultiProviderAnalyzer;
    use crate::provider::ClassificationProvider;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn scam_pipeline() -> (Pipeline, Arc<AtomicUsize>) {
        let gemini = StubProvider::ok("gemini", verdict(true, 5, "g"));
        let calls = gemini.calls.clone();
        let providers: Vec<Arc<dyn ClassificationProvider>> = vec![
            Arc::new(gemini),
            Arc::new(StubProvider::ok("openai", verdict(true, 4, "o"))),
        ];
        let synthesizer = StubProvider::ok("openrouter", verdict(true, 5, "Advance-fee scam pattern"));
        (
            Pipeline::new(MultiProviderAnalyzer::new(providers), Arc::new(synthesizer)),
            calls,
        )
    }

    async fn exchange(handler: Arc<dyn JobHandler>, messages: &[&str]) -> Vec<String> {
        let (in_tx, in_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);

        for message in messages {
            in_tx.send(message.to_string()).await.unwrap();
        }
        drop(in_tx);

        Bridge::new(handler).run(in_rx, out_tx).await.unwrap();

        let mut received = Vec::new();
        while let Some(message) = out_rx.recv().await {
            received.push(message);
        }
        received
    }

    #[test]
    fn test_parse_inbound() {
        let request = parse_inbound(r#"{"id": "42", "text": "hello"}"#).unwrap();
        assert_eq!(request.id, json!("42"));
        assert_eq!(request.text, "hello");

        let numeric = parse_inbound(r#"{"id": 9, "text": "hello"}"#).unwrap();
        assert_eq!(numeric.id, json!(9));

        assert!(matches!(parse_inbound("not json"), Err(InboundError::NotJson(_))));
        assert!(matches!(parse_inbound("[1]"), Err(InboundError::NotAnObject)));
        assert!(matches!(
            parse_inbound(r#"{"text": "hi"}"#),
            Err(InboundError::MissingId)
        ));
        assert!(matches!(
            parse_inbound(r#"{"id": null, "text": "hi"}"#),
            Err(InboundError::MissingId)
        ));

        assert!(matches!(
            parse_inbound(r#"{"id": "3", "text": 12}"#),
            Err(InboundError::NoText { id }) if id == json!("3")
        ));
    }

    #[tokio::test]
    async fn test_success_is_correlated() {
        let (pipeline, _) = scam_pipeline();
        let out = exchange(
            Arc::new(pipeline),
            &[r#"{"id":"42","text":"Send $500 now to claim your prize"}"#],
        )
        .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0], READY_MESSAGE);
        let result: Value = serde_json::from_str(&out[1]).unwrap();
        assert_eq!(
            result,
            json!({"id": "42", "payload": {
                "is_scam": true,
                "reason": "Advance-fee scam pattern",
                "types": "Lừa đảo",
                "score": 5,
                "recommend": "báo cáo"
            }})
        );
    }

    #[tokio::test]
    async fn test_empty_text_error_without_calls() {
        let (pipeline, calls) = scam_pipeline();
        let out = exchange(Arc::new(pipeline), &[r#"{"id":"7","text":""}"#, r#"{"id":"8"}"#]).await;

        assert_eq!(out.len(), 3);
        let results: Vec<Value> = out[1..]
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect();
        assert!(results.contains(&json!({"id": "7", "error": "No text to analyze was provided."})));
        assert!(results.contains(&json!({"id": "8", "error": "No text to analyze was provided."})));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unrecoverable_id_gets_no_response() {
        let (pipeline, calls) = scam_pipeline();
        let out = exchange(
            Arc::new(pipeline),
            &["{broken", r#"{"text":"hi"}"#, r#""just a string""#],
        )
        .await;

        assert_eq!(out, vec![READY_MESSAGE.to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pipeline_failure_becomes_error_result() {
        let providers: Vec<Arc<dyn ClassificationProvider>> = vec![
            Arc::new(StubProvider::failing("gemini", "boom")),
            Arc::new(StubProvider::failing("openai", "bang")),
        ];
        let pipeline = Pipeline::new(
            MultiProviderAnalyzer::new(providers),
            Arc::new(StubProvider::ok("openrouter", verdict(true, 5, "s"))),
        );

        let out = exchange(Arc::new(pipeline), &[r#"{"id":1,"text":"hello"}"#]).await;
        let result: JobResult = serde_json::from_str(&out[1]).unwrap();
        match result {
            JobResult::Failure { id, error } => {
                assert_eq!(id, json!(1));
                assert!(error.starts_with("All primary analysis providers failed"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    /// Sleeps for the number of milliseconds given as the job text.
    struct SleepyHandler;

    #[async_trait]
    impl JobHandler for SleepyHandler {
        async fn handle(&self, request: AnalysisRequest) -> JobResult {
            let millis: u64 = request.text.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            JobResult::Failure {
                id: request.id,
                error: "done".to_string(),
            }
        }
    }

    /// Panics on any text containing "panic".
    struct PanickyHandler;

    #[async_trait]
    impl JobHandler for PanickyHandler {
        async fn handle(&self, request: AnalysisRequest) -> JobResult {
            if request.text.contains("panic") {
                panic!("handler bug");
            }
            JobResult::Failure {
                id: request.id,
                error: "handled".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_panicking_job_still_gets_result() {
        let out = exchange(
            Arc::new(PanickyHandler),
            &[r#"{"id":"p","text":"panic now"}"#, r#"{"id":"q","text":"fine"}"#],
        )
        .await;

        assert_eq!(out.len(), 3);
        let results: Vec<Value> = out[1..]
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect();
        assert!(results.contains(&json!({"id": "p", "error": INTERNAL_ERROR})));
        assert!(results.contains(&json!({"id": "q", "error": "handled"})));
    }

    #[tokio::test]
    async fn test_jobs_do_not_block_each_other() {
        let out = exchange(
            Arc::new(SleepyHandler),
            &[r#"{"id":"slow","text":"200"}"#, r#"{"id":"fast","text":"1"}"#],
        )
        .await;

        assert_eq!(out.len(), 3);
        let ids: Vec<Value> = out[1..]
            .iter()
            .map(|m| serde_json::from_str::<Value>(m).unwrap()["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("fast"), json!("slow")]);
    }
}
