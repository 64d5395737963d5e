// Data types for Executor module

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default wall-clock limit for one execution
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// A caller's request to run a command line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Whole command line; the first token names the program
    pub command: String,
    /// Timeout in milliseconds; absent or zero means the configured default
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Used only when absolute
    #[serde(default)]
    pub working_directory: Option<String>,
    /// Caller identity, "anonymous" when absent
    #[serde(default)]
    pub user: Option<String>,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Constraints for a single execution
#[derive(Debug, Clone)]
pub struct ExecutionConstraints {
    /// Timeout applied when the request names none
    pub default_timeout_ms: u64,
    /// Maximum bytes kept per output stream
    pub max_output_bytes: usize,
}

impl Default for ExecutionConstraints {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: 1048576, // 1MB
        }
    }
}

/// A process ready to be launched
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// What came back from a launched process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    /// Exit status, or -1 when there is none
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub truncated: bool,
}
