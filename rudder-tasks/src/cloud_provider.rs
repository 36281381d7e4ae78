use rudder_core::pipeline_api::{StageExecution, TaskError};

/// Stage context lookups shared by tasks that submit backend operations.
///
/// Several context keys are accepted for historical reasons; downstream
/// stages and the backend agree on the canonical ones, so the fallbacks
/// only apply on the way in.
pub trait CloudProviderAware {
    /// The provider implementation that should execute the operation,
    /// from `cloudProvider`, falling back to `cloudProviderType`.
    fn cloud_provider(&self, stage: &StageExecution) -> Result<String, TaskError> {
        stage
            .context_str("cloudProvider")
            .or_else(|| stage.context_str("cloudProviderType"))
            .map(str::to_string)
            .ok_or_else(|| {
                TaskError::Configuration(format!(
                    "no cloud provider found in context of stage {}",
                    stage.name
                ))
            })
    }

    /// The account the operation runs under, from `account.name`, falling
    /// back to `account`, then `credentials`.
    fn credentials(&self, stage: &StageExecution) -> Result<String, TaskError> {
        stage
            .context_str("account.name")
            .or_else(|| stage.context_str("account"))
            .or_else(|| stage.context_str("credentials"))
            .map(str::to_string)
            .ok_or_else(|| {
                TaskError::Configuration(format!(
                    "no credentials found in context of stage {}",
                    stage.name
                ))
            })
    }
}
