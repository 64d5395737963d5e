// Main Executor implementation

use crate::executor::config::{ExecutorConfig, SpawnMode};
use crate::executor::error::{ExecutorError, Result};
use crate::executor::launcher::{ProcessLauncher, launcher_for};
use crate::executor::types::{ExecutionRequest, LaunchSpec};
use crate::history::{ANONYMOUS_USER, ExecutionResult, HistoryStore};
use crate::policy::{CommandPolicy, ValidationResult, tokenize};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Execution gateway: validates, launches, records
pub struct Executor {
    config: ExecutorConfig,
    policy: Arc<CommandPolicy>,
    history: Arc<HistoryStore>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl Executor {
    /// Create an executor using the launcher for the configured spawn mode
    pub fn new(config: ExecutorConfig, policy: Arc<CommandPolicy>, history: Arc<HistoryStore>) -> Self {
        let launcher = launcher_for(&config);
        Self::with_launcher(config, policy, history, launcher)
    }

    pub fn with_launcher(
        config: ExecutorConfig,
        policy: Arc<CommandPolicy>,
        history: Arc<HistoryStore>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        debug!(
            default_timeout_ms = config.constraints.default_timeout_ms,
            max_output_bytes = config.constraints.max_output_bytes,
            spawn_mode = %config.spawn_mode,
            launcher = launcher.name(),
            "initializing executor"
        );

        Self {
            config,
            policy,
            history,
            launcher,
        }
    }

    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validate a command line the way `execute` will
    pub fn validate(&self, raw: &str) -> ValidationResult {
        match self.config.spawn_mode {
            SpawnMode::Direct => self.policy.validate(raw),
            SpawnMode::Shell => self.policy.validate_shell_line(raw),
        }
    }

    fn resolve_working_dir(requested: Option<&str>) -> PathBuf {
        if let Some(dir) = requested.filter(|d| Path::new(d).is_absolute()) {
            return PathBuf::from(dir);
        }
        std::env::current_dir().unwrap_or_else(|e| {
            warn!(error = %e, "cannot read current directory, using '.'");
            PathBuf::from(".")
        })
    }

    /// Run one request.
    ///
    /// Returns `Err` only for an empty command or a policy denial; in both
    /// cases nothing is spawned and nothing is recorded. Any later failure
    /// (spawn error, missing directory, timeout kill) yields a recorded
    /// result with `exit_code == -1`.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let command = request.command.trim();
        if command.is_empty() {
            return Err(ExecutorError::InvalidRequest("Command is required".to_string()));
        }

        let validation = self.validate(command);
        if !validation.is_valid {
            info!(command = %command, reason = %validation.reason, "command rejected");
            return Err(ExecutorError::PolicyViolation {
                reason: validation.reason,
                suggestions: validation.suggestions,
            });
        }

        let working_dir = Self::resolve_working_dir(request.working_directory.as_deref());
        let timeout_ms = request
            .timeout_ms
            .filter(|&t| t > 0)
            .unwrap_or(self.config.constraints.default_timeout_ms);
        let user = request
            .user
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        let id = self.history.next_id();
        let start = Instant::now();

        let tokens = tokenize(command);
        let (program, args): (String, Vec<String>) = match tokens.split_first() {
            Some((program, args)) => (program.to_string(), args.iter().map(|a| a.to_string()).collect()),
            None => (String::new(), Vec::new()),
        };
        let spec = LaunchSpec {
            program,
            args,
            working_dir: working_dir.clone(),
        };

        debug!(id, command = %command, cwd = %working_dir.display(), timeout_ms, "launching");

        let outcome = self
            .launcher
            .launch(
                spec,
                Duration::from_millis(timeout_ms),
                self.config.constraints.max_output_bytes,
            )
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;

        let result = ExecutionResult {
            id,
            command: request.command.clone(),
            working_directory: working_dir.display().to_string(),
            exit_code: outcome.exit_code,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            duration_ms,
            timestamp: Utc::now(),
            user,
            success: outcome.exit_code == 0,
            timed_out: outcome.timed_out,
            truncated: outcome.truncated,
        };

        info!(
            id,
            command = %command.chars().take(100).collect::<String>(),
            duration_ms,
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            truncated = result.truncated,
            "command executed"
        );

        self.history.append(result.clone());
        Ok(result)
    }
}
