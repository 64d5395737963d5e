// Error types for Service module

use crate::executor::ExecutorError;
use crate::history::HistoryError;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors surfaced to transport callers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Command validation failed: {reason}")]
    PolicyViolation {
        reason: String,
        suggestions: Vec<String>,
    },

    #[error("Command not found")]
    NotFound(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP-equivalent status code
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::InvalidRequest(_) | ServiceError::PolicyViolation { .. } => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Internal(_) => 500,
        }
    }

    /// JSON error body
    pub fn body(&self) -> Value {
        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        if let ServiceError::PolicyViolation { suggestions, .. } = self {
            body["suggestions"] = json!(suggestions);
        }
        body
    }
}

impl From<ExecutorError> for ServiceError {
    fn from(e: ExecutorError) -> Self {
        match e {
            ExecutorError::InvalidRequest(msg) => ServiceError::InvalidRequest(msg),
            ExecutorError::PolicyViolation {
                reason,
                suggestions,
            } => ServiceError::PolicyViolation {
                reason,
                suggestions,
            },
        }
    }
}

impl From<HistoryError> for ServiceError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::NotFound(id) => ServiceError::NotFound(id),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
