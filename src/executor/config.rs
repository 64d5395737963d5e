// Executor configuration

use crate::executor::types::ExecutionConstraints;
use std::str::FromStr;

/// How approved command lines are handed to the operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnMode {
    /// Program and argument vector, no shell
    #[default]
    Direct,
    /// `<shell> -c "<line>"`, with the whole line screened for metacharacters
    Shell,
}

impl FromStr for SpawnMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "shell" => Ok(Self::Shell),
            other => Err(format!("unknown spawn mode: {}", other)),
        }
    }
}

impl std::fmt::Display for SpawnMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpawnMode::Direct => write!(f, "direct"),
            SpawnMode::Shell => write!(f, "shell"),
        }
    }
}

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Default execution constraints
    pub constraints: ExecutionConstraints,
    /// Spawn strategy
    pub spawn_mode: SpawnMode,
    /// Shell path for shell mode
    pub shell: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            constraints: ExecutionConstraints::default(),
            spawn_mode: SpawnMode::default(),
            shell: String::from("/bin/sh"),
        }
    }
}
