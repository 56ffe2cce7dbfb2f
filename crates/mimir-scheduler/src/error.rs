use mimir_types::{ErrorCode, ErrorEnvelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expr}': {message}")]
    InvalidCron { expr: String, message: String },

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("schedule store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

impl From<&SchedulerError> for ErrorCode {
    fn from(err: &SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidCron { .. }
            | SchedulerError::InvalidTimezone(_)
            | SchedulerError::InvalidSchedule(_) => ErrorCode::ValidationError,
            SchedulerError::StoreUnavailable(_) => ErrorCode::QueueUnavailable,
        }
    }
}

impl From<SchedulerError> for ErrorEnvelope {
    fn from(err: SchedulerError) -> Self {
        let code = ErrorCode::from(&err);
        ErrorEnvelope::new(code, err.to_string())
    }
}
