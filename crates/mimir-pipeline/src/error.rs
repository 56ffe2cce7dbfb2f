use mimir_types::{ErrorCode, ErrorEnvelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline definition: {0}")]
    InvalidDefinition(String),

    #[error("failed to parse pipeline file: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("step {step}: plugin '{plugin}' not found")]
    PluginNotFound { step: String, plugin: String },

    #[error("step {step} failed: {message}")]
    ExecutionFailed { step: String, message: String },

    #[error("step {step}: goto target '{target}' does not exist")]
    GotoTargetNotFound { step: String, target: String },

    #[error("run exceeded the step-execution budget of {budget}")]
    StepBudgetExceeded { budget: usize },

    #[error(transparent)]
    Context(#[from] mimir_context::ContextError),

    #[error(transparent)]
    Plugin(#[from] mimir_plugin::PluginError),

    #[error("run was cancelled")]
    Cancelled,
}

impl From<&PipelineError> for ErrorCode {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::InvalidDefinition(_) | PipelineError::ParseFailed(_) => {
                ErrorCode::ValidationError
            }
            PipelineError::PluginNotFound { .. } => ErrorCode::PluginNotFound,
            PipelineError::ExecutionFailed { .. } | PipelineError::Plugin(_) => {
                ErrorCode::ExecutionFailed
            }
            PipelineError::GotoTargetNotFound { .. } => ErrorCode::GotoTargetNotFound,
            PipelineError::StepBudgetExceeded { .. } => ErrorCode::StepBudgetExceeded,
            PipelineError::Context(_) => ErrorCode::ContextOverflow,
            PipelineError::Cancelled => ErrorCode::TaskCancelled,
        }
    }
}

impl From<PipelineError> for ErrorEnvelope {
    fn from(err: PipelineError) -> Self {
        let code = ErrorCode::from(&err);
        ErrorEnvelope::new(code, err.to_string())
    }
}
