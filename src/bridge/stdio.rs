//! Line-delimited JSON channel over stdin/stdout.
//!
//! One message per line in each direction. Nothing else may be written to
//! stdout while the bridge runs; logs go to stderr.

use crate::bridge::{Bridge, JobHandler};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffered messages per direction before the producer waits.
const CHANNEL_CAPACITY: usize = 64;

/// Serve the host process attached to this process's stdin and stdout.
pub async fn run(handler: Arc<dyn JobHandler>) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_lines(handler, stdin, stdout).await
}

/// Serve jobs read line-by-line from `reader`, writing results to `writer`.
///
/// Returns after `reader` hits end of input and every in-flight job has
/// been answered.
pub async fn run_lines<R, W>(handler: Arc<dyn JobHandler>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (in_tx, in_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let read_task = tokio::spawn(async move {
        let mut reader = reader;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            // Invalid UTF-8 becomes U+FFFD; the bridge then rejects or answers the line.
            let line = match String::from_utf8(std::mem::take(&mut buf)) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Host sent a line that is not valid UTF-8");
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if in_tx.send(line.to_string()).await.is_err() {
                break;
            }
        }
        debug!("Host input closed");
        Ok::<_, std::io::Error>(())
    });

    let write_task = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            writer.write_all(message.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    Bridge::new(handler).run(in_rx, out_tx).await?;

    read_task
        .await
        .context("Host reader task failed")?
        .context("Failed to read from host input")?;
    write_task
        .await
        .context("Host writer task failed")?
        .context("Failed to write to host output")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::READY_MESSAGE;
    use crate::models::{AnalysisRequest, JobResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    struct EchoHandler;

    #[async_trait]
    impl JobHandler for EchoHandler {
        async fn handle(&self, request: AnalysisRequest) -> JobResult {
            JobResult::Failure {
                id: request.id,
                error: request.text,
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_bridge() {
        let input = Cursor::new(b"\xff\xfe garbage\n{\"id\":\"a\",\"text\":\"after\"}\n".to_vec());
        let (mut host_side, engine_side) = tokio::io::duplex(64 * 1024);

        run_lines(Arc::new(EchoHandler), input, engine_side)
            .await
            .unwrap();

        let mut output = String::new();
        host_side.read_to_string(&mut output).await.unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], READY_MESSAGE);
        let result: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(result, json!({"id": "a", "error": "after"}));
    }

    #[tokio::test]
    async fn test_run_lines_round_trip() {
        let input = Cursor::new(
            "{\"id\":\"a\",\"text\":\"first\"}\n\n{\"id\":\"b\",\"text\":\"second\"}\n".as_bytes().to_vec(),
        );
        let (mut host_side, engine_side) = tokio::io::duplex(64 * 1024);

        run_lines(Arc::new(EchoHandler), input, engine_side)
            .await
            .unwrap();

        let mut output = String::new();
        host_side.read_to_string(&mut output).await.unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], READY_MESSAGE);
        let results: Vec<Value> = lines[1..]
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert!(results.contains(&json!({"id": "a", "error": "first"})));
        assert!(results.contains(&json!({"id": "b", "error": "second"})));
    }
}
