// Executor module - timeout-bounded execution of approved commands
#![allow(unused_imports)]

pub mod config;
pub mod error;
pub mod launcher;
pub mod process;
pub mod runner;
pub mod types;

pub use config::{ExecutorConfig, SpawnMode};
pub use error::{ExecutorError, Result};
pub use launcher::{DirectLauncher, ProcessLauncher, ShellLauncher};
pub use runner::Executor;
pub use types::{DEFAULT_TIMEOUT_MS, ExecutionConstraints, ExecutionRequest};
