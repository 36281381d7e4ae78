use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::schema::{
    ErrorResponse, Request, Response, SubmitOperationsRequest, SubmitOperationsResponse,
};

/// Implemented by operation-execution backends served over stdio.
#[async_trait]
pub trait OperationsBackend {
    async fn submit_operations(
        &self,
        request: SubmitOperationsRequest,
    ) -> Result<SubmitOperationsResponse>;
}

/// Serve `backend` on this process's stdin/stdout: each request line is
/// answered with exactly one response line, until stdin reaches EOF.
///
/// Stdout is the protocol channel, so backends must log to stderr only.
pub async fn run_main(backend: impl OperationsBackend) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&backend, &line).await;
        let mut response_line = serde_json::to_string(&response)?;
        response_line.push('\n');
        out.write_all(response_line.as_bytes()).await?;
        out.flush().await?;
    }
    debug!("request stream closed, shutting down");
    Ok(())
}

async fn handle_line(backend: &impl OperationsBackend, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(Request::SubmitOperationsRequest(request)) => {
            match backend.submit_operations(request).await {
                Ok(response) => Response::SubmitOperationsResponse(response),
                Err(e) => Response::ErrorResponse(ErrorResponse {
                    error: format!("{:#}", e),
                }),
            }
        }
        Err(e) => Response::ErrorResponse(ErrorResponse {
            error: format!("could not parse request message: {}", e),
        }),
    }
}
