//! The error taxonomy codes (§7) and the envelope every surfaced error
//! carries: `{code, message, details?}`.

use serde::{Deserialize, Serialize};

/// Stable error codes, independent of how a given crate models its local
/// `thiserror` enum — each crate's error type maps onto one of these at the
/// boundary where it's surfaced to a caller (CLI output, queue record,
/// execution record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    PluginNotFound,
    ExecutionFailed,
    GotoTargetNotFound,
    ContextOverflow,
    StepBudgetExceeded,
    TaskTimeout,
    TaskCancelled,
    QueueUnavailable,
    InternalError,
}

/// `{code, message, details?}` — the shape every surfaced error takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let env = ErrorEnvelope::new(ErrorCode::PluginNotFound, "Input.missing not registered")
            .with_details(serde_json::json!({"step": "A"}));
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("PLUGIN_NOT_FOUND"));
        let back: ErrorEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, ErrorCode::PluginNotFound);
    }
}
