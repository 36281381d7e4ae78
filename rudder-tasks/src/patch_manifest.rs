//! The patch-manifest task: turns a "patch this deployed manifest" stage
//! into a single validated operation submission, and publishes the
//! backend's correlation handle for the stages that follow.

use std::sync::Arc;

use async_trait::async_trait;
use rudder_core::pipeline_api::{StageExecution, Task, TaskError, TaskResult};
use rudder_kato::{KatoService, OperationRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info_span, Instrument as _};

use crate::cloud_provider::CloudProviderAware;

/// Operation name, and the stage type this task runs in.
pub const TASK_NAME: &str = "patchManifest";

/// Output context keys read by downstream stages. Frozen contract.
pub const KATO_RESULT_EXPECTED: &str = "kato.result.expected";
pub const KATO_LAST_TASK_ID: &str = "kato.last.task.id";
pub const DEPLOY_ACCOUNT_NAME: &str = "deploy.account.name";

/// How patch fragments are combined with the live manifest. Only the
/// `json` strategy accepts more than one fragment per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Strategic,
    Merge,
    Json,
}

/// Typed view of the stage context for this task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchManifestContext {
    #[serde(default)]
    pub options: PatchManifestOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchManifestOptions {
    #[serde(default, rename = "mergeStrategy")]
    pub merge_strategy: MergeStrategy,
}

pub struct PatchManifestTask {
    kato: Arc<dyn KatoService>,
}

impl CloudProviderAware for PatchManifestTask {}

impl PatchManifestTask {
    pub fn new(kato: Arc<dyn KatoService>) -> Self {
        PatchManifestTask { kato }
    }

    fn get_operation(&self, stage: &StageExecution) -> Result<OperationRequest, TaskError> {
        let context: PatchManifestContext = stage.map_to()?;
        let merge_strategy = context.options.merge_strategy;
        let patch_body = parse_patch_body(stage)?;
        validate_patch_body(&patch_body, merge_strategy)?;
        Ok(build_operation(&stage.context, merge_strategy, patch_body))
    }

    fn get_outputs(
        &self,
        task_id: rudder_kato::TaskId,
        credentials: String,
    ) -> Map<String, Value> {
        let mut outputs = Map::new();
        outputs.insert(KATO_RESULT_EXPECTED.to_string(), Value::Bool(true));
        outputs.insert(KATO_LAST_TASK_ID.to_string(), Value::String(task_id.0));
        outputs.insert(DEPLOY_ACCOUNT_NAME.to_string(), Value::String(credentials));
        outputs
    }
}

#[async_trait]
impl Task for PatchManifestTask {
    fn name(&self) -> &str {
        TASK_NAME
    }

    async fn execute(&self, stage: &StageExecution) -> Result<TaskResult, TaskError> {
        let operation = self.get_operation(stage)?;
        let cloud_provider = self.cloud_provider(stage)?;
        // Resolved up front: a stage without credentials must never dispatch.
        let credentials = self.credentials(stage)?;

        let task_id = self
            .kato
            .request_operations(&cloud_provider, vec![operation])
            .instrument(info_span!("request_operations", %cloud_provider))
            .await
            .map_err(TaskError::Dispatch)?;
        debug!(task_id = %task_id, "patch operation submitted");

        Ok(TaskResult::succeeded(self.get_outputs(task_id, credentials)))
    }
}

/// The patch fragments from the stage's `manifests` field. A missing field
/// is the empty sequence; validation rejects it either way.
fn parse_patch_body(stage: &StageExecution) -> Result<Vec<Map<String, Value>>, TaskError> {
    match stage.context.get("manifests") {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            TaskError::Configuration(format!("invalid manifests in stage context: {}", e))
        }),
    }
}

fn validate_patch_body(
    patch_body: &[Map<String, Value>],
    merge_strategy: MergeStrategy,
) -> Result<(), TaskError> {
    if patch_body.is_empty() {
        return Err(TaskError::Configuration(
            "the patch (manifest) stage requires a valid patch body; \
             add a patch body inline or with an artifact"
                .to_string(),
        ));
    }
    if merge_strategy != MergeStrategy::Json && patch_body.len() > 1 {
        return Err(TaskError::Configuration(
            "only one patch object is valid when patching with the `strategic` \
             and `merge` strategies"
                .to_string(),
        ));
    }
    Ok(())
}

fn build_operation(
    stage_context: &Map<String, Value>,
    merge_strategy: MergeStrategy,
    mut patch_body: Vec<Map<String, Value>>,
) -> OperationRequest {
    let mut params = stage_context.clone();
    params.insert("source".to_string(), Value::String("text".to_string()));
    // `json` patches keep the whole sequence; the other strategies take
    // their single fragment unwrapped. Any pre-existing `source` or
    // `patchBody` field is overwritten.
    let body = match merge_strategy {
        MergeStrategy::Json => Value::Array(patch_body.into_iter().map(Value::Object).collect()),
        MergeStrategy::Strategic | MergeStrategy::Merge => Value::Object(patch_body.remove(0)),
    };
    params.insert("patchBody".to_string(), body);
    OperationRequest::new(TASK_NAME, params)
}
