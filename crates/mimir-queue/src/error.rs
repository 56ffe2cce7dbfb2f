use mimir_types::{ErrorCode, ErrorEnvelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task '{0}' already exists")]
    DuplicateTask(uuid::Uuid),

    #[error("task '{0}' not found")]
    NotFound(uuid::Uuid),

    #[error("illegal status transition for task '{id}': {from:?} -> {to:?}")]
    IllegalTransition {
        id: uuid::Uuid,
        from: mimir_types::TaskStatus,
        to: mimir_types::TaskStatus,
    },
}

impl From<&QueueError> for ErrorCode {
    fn from(err: &QueueError) -> Self {
        match err {
            QueueError::DuplicateTask(_) | QueueError::IllegalTransition { .. } => ErrorCode::ValidationError,
            QueueError::NotFound(_) => ErrorCode::QueueUnavailable,
        }
    }
}

impl From<QueueError> for ErrorEnvelope {
    fn from(err: QueueError) -> Self {
        let code = ErrorCode::from(&err);
        ErrorEnvelope::new(code, err.to_string())
    }
}
