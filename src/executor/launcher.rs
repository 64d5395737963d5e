// Process launchers

use crate::executor::config::{ExecutorConfig, SpawnMode};
use crate::executor::process::run_process;
use crate::executor::types::{LaunchSpec, ProcessOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Strategy for turning an approved command line into a running process
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Build the OS command for a launch
    fn command(&self, spec: &LaunchSpec) -> Command;

    /// Launch and wait, bounded by `limit`
    async fn launch(&self, spec: LaunchSpec, limit: Duration, max_output_bytes: usize) -> ProcessOutcome {
        run_process(self.command(&spec), limit, max_output_bytes).await
    }
}

/// Runs the program with its argument vector; nothing is shell-interpreted
#[derive(Debug, Default)]
pub struct DirectLauncher;

#[async_trait]
impl ProcessLauncher for DirectLauncher {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn command(&self, spec: &LaunchSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).current_dir(&spec.working_dir);
        cmd
    }
}

/// Runs `<shell> -c "<program> <args...>"`
#[derive(Debug)]
pub struct ShellLauncher {
    shell: String,
}

impl ShellLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl ProcessLauncher for ShellLauncher {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn command(&self, spec: &LaunchSpec) -> Command {
        let mut line = spec.program.clone();
        for arg in &spec.args {
            line.push(' ');
            line.push_str(arg);
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(line).current_dir(&spec.working_dir);
        cmd
    }
}

/// Launcher matching the configured spawn mode
pub fn launcher_for(config: &ExecutorConfig) -> Arc<dyn ProcessLauncher> {
    match config.spawn_mode {
        SpawnMode::Direct => Arc::new(DirectLauncher),
        SpawnMode::Shell => Arc::new(ShellLauncher::new(config.shell.clone())),
    }
}
