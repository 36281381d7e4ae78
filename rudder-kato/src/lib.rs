pub mod client;
pub mod framework;
pub mod schema;

pub use client::{KatoClient, KatoClientConfig};
pub use schema::{OperationRequest, TaskId};

use anyhow::Result;
use async_trait::async_trait;

/// Submission contract of the operation-execution backend.
///
/// The backend performs infrastructure mutations asynchronously: a
/// submission only hands over the work and returns a correlation handle.
/// Callers that care about the outcome watch the handle elsewhere.
#[async_trait]
pub trait KatoService: Send + Sync {
    /// Submit `operations` to be executed under `cloud_provider`.
    ///
    /// This is a single logical call; it is not retried here. Failures
    /// (unreachable backend, rejected payload) propagate to the caller.
    async fn request_operations(
        &self,
        cloud_provider: &str,
        operations: Vec<OperationRequest>,
    ) -> Result<TaskId>;
}
