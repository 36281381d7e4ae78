use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::schema::{self, Request, Response, SubmitOperationsRequest};
use crate::{KatoService, OperationRequest, TaskId};

pub struct KatoClientConfig {
    pub backend_executable: String,
    pub backend_args: Vec<String>,
}

/// Talks to an operation-execution backend by spawning its executable and
/// exchanging newline-delimited JSON over the child's stdio.
/// Stderr is inherited, so backend logs end up with ours.
pub struct KatoClient {
    config: KatoClientConfig,
    // TODO: maintain a long-lived process
}

impl KatoClient {
    pub fn new(config: KatoClientConfig) -> Self {
        KatoClient { config }
    }
}

#[async_trait]
impl KatoService for KatoClient {
    async fn request_operations(
        &self,
        cloud_provider: &str,
        operations: Vec<OperationRequest>,
    ) -> Result<TaskId> {
        let request_line = {
            let request = Request::SubmitOperationsRequest(SubmitOperationsRequest {
                cloud_provider: cloud_provider.to_string(),
                operations,
            });
            serde_json::to_string(&request).context("could not serialize submission request")?
        };

        let mut process = tokio::process::Command::new(&self.config.backend_executable)
            .args(&self.config.backend_args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .with_context(|| {
                format!(
                    "could not spawn backend process {}",
                    self.config.backend_executable
                )
            })?;

        // Write the request; dropping stdin afterwards closes it
        {
            let mut child_in = process.stdin.take().unwrap();
            child_in.write_all(request_line.as_bytes()).await?;
            child_in.write_all(b"\n").await?;
            child_in.flush().await?;
        }

        // Read the response
        let response: Response = {
            let child_out = process.stdout.take().unwrap();
            let mut child_reader = BufReader::new(child_out);
            let mut line = String::new();
            let n = child_reader
                .read_line(&mut line)
                .await
                .context("error reading from backend process stdout")?;
            if n == 0 {
                bail!("backend process closed its stdout without responding");
            }
            serde_json::from_str(&line).context("could not parse backend response")?
        };

        // Wait for the process to finish
        process.wait().await?;

        match response {
            Response::SubmitOperationsResponse(r) => {
                debug!(task_id = %r.id, "backend accepted submission");
                Ok(r.id)
            }
            Response::ErrorResponse(schema::ErrorResponse { error }) => {
                bail!("backend rejected the submission: {}", error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn sh_backend(script: &str) -> KatoClient {
        KatoClient::new(KatoClientConfig {
            backend_executable: "sh".to_string(),
            backend_args: vec!["-c".to_string(), script.to_string()],
        })
    }

    #[tokio::test]
    async fn submits_one_line_and_reads_the_task_id() {
        let client = sh_backend(
            r#"read line; echo '{"SubmitOperationsResponse":{"id":"task-42"}}'"#,
        );
        let op = OperationRequest::new("patchManifest", Map::new());
        let id = client
            .request_operations("kubernetes", vec![op])
            .await
            .unwrap();
        assert_eq!(id, TaskId("task-42".to_string()));
    }

    #[tokio::test]
    async fn surfaces_a_backend_rejection() {
        let client = sh_backend(
            r#"read line; echo '{"ErrorResponse":{"error":"no credentials for account"}}'"#,
        );
        let e = client
            .request_operations("kubernetes", vec![])
            .await
            .unwrap_err();
        assert!(
            e.to_string().contains("no credentials for account"),
            "got: {}",
            e
        );
    }

    #[tokio::test]
    async fn surfaces_a_backend_that_dies_without_responding() {
        let client = sh_backend("cat >/dev/null");
        let e = client
            .request_operations("kubernetes", vec![])
            .await
            .unwrap_err();
        assert!(
            e.to_string().contains("without responding"),
            "got: {}",
            e
        );
    }
}
