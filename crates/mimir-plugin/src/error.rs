use mimir_types::{ErrorCode, ErrorEnvelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{0}' is not registered")]
    NotFound(String),

    #[error("plugin '{0}' is already registered")]
    Conflict(String),

    #[error("config validation failed: {0}")]
    InvalidConfig(String),

    #[error("action '{action}' failed: {message}")]
    ExecutionFailed { action: String, message: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Context(#[from] mimir_context::ContextError),
}

impl From<&PluginError> for ErrorCode {
    fn from(err: &PluginError) -> Self {
        match err {
            PluginError::NotFound(_) => ErrorCode::PluginNotFound,
            PluginError::Conflict(_) | PluginError::InvalidConfig(_) => ErrorCode::ValidationError,
            PluginError::ExecutionFailed { .. } | PluginError::Http(_) => ErrorCode::ExecutionFailed,
            PluginError::Context(_) => ErrorCode::ContextOverflow,
        }
    }
}

impl From<PluginError> for ErrorEnvelope {
    fn from(err: PluginError) -> Self {
        let code = ErrorCode::from(&err);
        ErrorEnvelope::new(code, err.to_string())
    }
}
