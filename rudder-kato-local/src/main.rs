use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use rudder_kato::framework::{run_main, OperationsBackend};
use rudder_kato::schema::{SubmitOperationsRequest, SubmitOperationsResponse};
use rudder_kato::TaskId;
use tracing::info;

/// A backend that performs no mutations: it validates the submission shape,
/// logs what it would do, and hands out `local-N` correlation handles.
struct LocalOperationsBackend {
    counter: AtomicU64,
}

impl LocalOperationsBackend {
    fn new() -> Self {
        LocalOperationsBackend {
            counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl OperationsBackend for LocalOperationsBackend {
    async fn submit_operations(
        &self,
        request: SubmitOperationsRequest,
    ) -> Result<SubmitOperationsResponse> {
        if request.cloud_provider.is_empty() {
            bail!("submission is missing a cloud provider");
        }
        if request.operations.is_empty() {
            bail!("submission contains no operations");
        }
        for operation in &request.operations {
            info!(
                cloud_provider = %request.cloud_provider,
                operation = %operation.name(),
                "accepted operation"
            );
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SubmitOperationsResponse {
            id: TaskId(format!("local-{}", n)),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Stdout carries the protocol; all logging must go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    run_main(LocalOperationsBackend::new()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rudder_kato::OperationRequest;
    use serde_json::Map;

    fn request(cloud_provider: &str, operations: Vec<OperationRequest>) -> SubmitOperationsRequest {
        SubmitOperationsRequest {
            cloud_provider: cloud_provider.to_string(),
            operations,
        }
    }

    fn patch_op() -> OperationRequest {
        OperationRequest::new("patchManifest", Map::new())
    }

    #[tokio::test]
    async fn task_ids_are_distinct_and_sequential() {
        let backend = LocalOperationsBackend::new();
        let a = backend
            .submit_operations(request("kubernetes", vec![patch_op()]))
            .await
            .unwrap();
        let b = backend
            .submit_operations(request("kubernetes", vec![patch_op()]))
            .await
            .unwrap();
        assert_eq!(a.id, TaskId("local-1".to_string()));
        assert_eq!(b.id, TaskId("local-2".to_string()));
    }

    #[tokio::test]
    async fn empty_submissions_are_rejected() {
        let backend = LocalOperationsBackend::new();
        assert!(backend
            .submit_operations(request("kubernetes", vec![]))
            .await
            .is_err());
        assert!(backend
            .submit_operations(request("", vec![patch_op()]))
            .await
            .is_err());
    }
}
