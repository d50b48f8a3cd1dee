//! HTTP surface.
//!
//! `POST /api/analyze` drives the same [`JobHandler`] as the host bridge.
//! `GET /admin/api/logs` tails the log file for the admin log viewer served
//! at `GET /admin/dashboard`.

use crate::bridge::JobHandler;
use crate::models::{AnalysisRequest, JobResult, Verdict};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Number of trailing log lines returned to the viewer.
pub const LOG_TAIL_LINES: usize = 50;

/// Bytes read from the end of the log file per request.
pub const LOG_TAIL_BYTES: u64 = 64 * 1024;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<dyn JobHandler>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct LogsBody {
    pub logs: Vec<String>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/admin/api/logs", get(get_logs))
        .route("/admin/dashboard", get(dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until it fails.
pub async fn run_server(state: AppState, bind: &str) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("HTTP server listening on http://{}", bind);

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}

async fn analyze(State(state): State<AppState>, body: Bytes) -> Result<Json<Verdict>, ApiError> {
    let text = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(mut fields)) => match fields.remove("text") {
            Some(Value::String(text)) => text,
            _ => return Err(missing_text_key()),
        },
        _ => return Err(missing_text_key()),
    };

    if text.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No text provided"));
    }

    let request = AnalysisRequest {
        id: Value::String("http".to_string()),
        text,
    };

    match state.handler.handle(request).await {
        JobResult::Success { payload, .. } => Ok(Json(payload)),
        JobResult::Failure { error, .. } => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, error)),
    }
}

fn missing_text_key() -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "Invalid request body, missing \"text\" key",
    )
}

async fn get_logs(State(state): State<AppState>) -> (StatusCode, Json<LogsBody>) {
    let reply = |status, logs| (status, Json(LogsBody { logs }));

    let Some(path) = state.log_file.as_ref() else {
        return reply(StatusCode::OK, vec!["File logging is disabled.".to_string()]);
    };

    match read_tail(path, LOG_TAIL_BYTES).await {
        Ok(content) => reply(StatusCode::OK, tail_lines(&content, LOG_TAIL_LINES)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            reply(StatusCode::OK, vec!["Log file not found yet.".to_string()])
        }
        Err(e) => {
            warn!("Failed to read log file {}: {}", path.display(), e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                vec![format!("Error reading log file: {}", e)],
            )
        }
    }
}

/// Read at most the last `max_bytes` of the file at `path`.
///
/// When the read starts mid-file, the partial first line is dropped.
pub async fn read_tail(path: &Path, max_bytes: u64) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let start = len.saturating_sub(max_bytes);
    file.seek(SeekFrom::Start(start)).await?;

    let mut bytes = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut bytes).await?;

    if start > 0 {
        match bytes.iter().position(|&b| b == b'\n') {
            Some(newline) => {
                bytes.drain(..=newline);
            }
            None => bytes.clear(),
        }
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Last `n` lines of `content`, oldest first, each keeping its line ending.
pub fn tail_lines(content: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

async fn dashboard() -> Html<&'static str> {
    Html(include_str!("dashboard.html"))
}
