use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// This interface is internal to rudder. It is the contract between the
/// pipeline engine and the individual tasks that make up a stage.
/// No promises are made about this interface.
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable task name; also the key tasks use for any operation they submit.
    fn name(&self) -> &str;

    /// Run the task once against `stage`. A failed invocation must be
    /// restarted from the beginning by the engine; tasks keep no state
    /// between invocations.
    async fn execute(&self, stage: &StageExecution) -> Result<TaskResult, TaskError>;
}

/// The terminal status a task reports back to the engine for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Terminal,
}

/// What a task hands back to the engine: a status plus the context fields
/// that downstream stages read by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: ExecutionStatus,
    pub context: Map<String, Value>,
}

impl TaskResult {
    pub fn succeeded(context: Map<String, Value>) -> Self {
        TaskResult {
            status: ExecutionStatus::Succeeded,
            context,
        }
    }
}

/// One stage of a pipeline execution, as handed to a task by the engine.
///
/// The context is a plain JSON object owned by this invocation. Tasks read
/// typed views out of it with [`StageExecution::map_to`] and otherwise treat
/// fields they do not know as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageExecution {
    /// The name of the stage, e.g. `"patchManifest"`.
    pub name: String,
    /// Arbitrary configuration and upstream outputs for this stage.
    pub context: Map<String, Value>,
}

impl StageExecution {
    pub fn new(name: impl Into<String>, context: Map<String, Value>) -> Self {
        StageExecution {
            name: name.into(),
            context,
        }
    }

    /// Deserialize the whole stage context into a typed view.
    /// Unknown fields are ignored, so views stay small.
    pub fn map_to<T: DeserializeOwned>(&self) -> Result<T, TaskError> {
        serde_json::from_value(Value::Object(self.context.clone()))
            .map_err(|e| TaskError::Configuration(format!("invalid stage context: {}", e)))
    }

    /// Look up a context field that must be a string, e.g. an account name.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

/// The ways a task invocation can fail. Neither kind is retried at this
/// layer; the engine owns retry, backoff and stage failure policy.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The stage is configured such that it can never dispatch: the
    /// invocation fails before any network interaction.
    #[error("invalid stage configuration: {0}")]
    Configuration(String),

    /// The backend rejected the submission or could not be reached, after
    /// validation and operation building already succeeded.
    #[error("operation dispatch failed: {0}")]
    Dispatch(#[source] anyhow::Error),
}

/// Facade for engine frontends that receive the stage context as text.
pub fn stage_context_from_json(s: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(s).map_err(|e| e.into())
}
