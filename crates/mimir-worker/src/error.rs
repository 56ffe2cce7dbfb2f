use mimir_types::{ErrorCode, ErrorEnvelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("queue: {0}")]
    Queue(#[from] mimir_queue::QueueError),

    #[error("task type '{0}' has no registered handler")]
    UnhandledTaskType(String),

    #[error("pipeline execution failed: {0}")]
    PipelineFailed(ErrorEnvelope),
}

impl From<&WorkerError> for ErrorCode {
    fn from(err: &WorkerError) -> Self {
        match err {
            WorkerError::Queue(e) => ErrorCode::from(e),
            WorkerError::UnhandledTaskType(_) => ErrorCode::ValidationError,
            WorkerError::PipelineFailed(envelope) => envelope.code,
        }
    }
}

impl From<WorkerError> for ErrorEnvelope {
    fn from(err: WorkerError) -> Self {
        let code = ErrorCode::from(&err);
        ErrorEnvelope::new(code, err.to_string())
    }
}
