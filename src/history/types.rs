// Data types for History module

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity recorded when a caller does not name itself
pub const ANONYMOUS_USER: &str = "anonymous";

/// Record of one execution attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Assigned at submission, increasing for the life of the process
    pub id: u64,
    pub command: String,
    pub working_directory: String,
    /// Process exit status, or -1 when the process failed to run or was killed
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Completion time
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub success: bool,
    #[serde(default)]
    pub timed_out: bool,
    /// Set when either stream hit the output cap
    #[serde(default)]
    pub truncated: bool,
}

/// Pagination metadata for a history listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_commands: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: usize,
}

/// One page of history, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub commands: Vec<ExecutionResult>,
    pub pagination: Pagination,
}
