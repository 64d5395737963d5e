// Error types for Executor module

use thiserror::Error;

/// Errors reported before any process exists.
///
/// Everything that goes wrong after validation is folded into the
/// `ExecutionResult` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Command validation failed: {reason}")]
    PolicyViolation {
        reason: String,
        suggestions: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
