// Error types for History module

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Command not found: {0}")]
    NotFound(u64),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
