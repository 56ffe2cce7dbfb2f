use mimir_types::{ErrorCode, ErrorEnvelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContextError>;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context write would exceed the configured maximum of {max} bytes")]
    Overflow { max: usize },

    #[error("template '{{{{{path}}}}}': unknown context key '{root}'")]
    UnknownKey { path: String, root: String },

    #[error("template '{{{{{path}}}}}': cannot resolve segment '{segment}'")]
    UnresolvedSegment { path: String, segment: String },

    #[error("empty template expression")]
    EmptyExpression,
}

impl From<&ContextError> for ErrorCode {
    fn from(err: &ContextError) -> Self {
        match err {
            ContextError::Overflow { .. } => ErrorCode::ContextOverflow,
            ContextError::UnknownKey { .. }
            | ContextError::UnresolvedSegment { .. }
            | ContextError::EmptyExpression => ErrorCode::ValidationError,
        }
    }
}

impl From<ContextError> for ErrorEnvelope {
    fn from(err: ContextError) -> Self {
        let code = ErrorCode::from(&err);
        ErrorEnvelope::new(code, err.to_string())
    }
}
