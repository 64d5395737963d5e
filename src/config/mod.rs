// Daemon configuration loaded from the environment

use crate::comm::CommConfig;
use crate::executor::{ExecutorConfig, SpawnMode};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{Level, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Parse an environment variable, logging a warning if the value is present but invalid.
fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    parse_value(name, std::env::var(name).ok(), default)
}

fn parse_value<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(v) => match v.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "Invalid env var value, using default");
                default
            }
        },
        None => default,
    }
}

fn level_or_default(raw: Option<&str>) -> Level {
    raw.and_then(|v| v.trim().parse().ok())
        .unwrap_or(GateConfig::default().log_level)
}

/// `SHELLGATE_LOG_LEVEL` alone, for starting the subscriber before
/// [`GateConfig::from_env`] logs anything. Invalid values are reported
/// later by `from_env`.
pub fn log_level_from_env() -> Level {
    dotenvy::dotenv().ok();
    level_or_default(std::env::var("SHELLGATE_LOG_LEVEL").ok().as_deref())
}

/// Full daemon configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub comm: CommConfig,
    pub executor: ExecutorConfig,
    /// TOML policy file; built-in tables are used when it does not exist
    pub policy_path: PathBuf,
    pub history_capacity: usize,
    pub log_level: Level,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            comm: CommConfig::default(),
            executor: ExecutorConfig::default(),
            policy_path: PathBuf::from("policy.toml"),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            log_level: Level::DEBUG,
        }
    }
}

impl GateConfig {
    /// Load from environment variables (and `.env` when present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = GateConfig::default();

        if let Ok(addr) = std::env::var("SHELLGATE_LISTEN_ADDR") {
            config.comm.listen_addr = addr;
        }
        config.comm.listen_port = parse_env_var("SHELLGATE_LISTEN_PORT", config.comm.listen_port);
        config.comm.max_payload_bytes =
            parse_env_var("SHELLGATE_MAX_PAYLOAD_BYTES", config.comm.max_payload_bytes);
        config.comm.reply_timeout_secs =
            parse_env_var("SHELLGATE_REPLY_TIMEOUT_SECS", config.comm.reply_timeout_secs);

        config.executor.constraints.default_timeout_ms = parse_env_var(
            "SHELLGATE_DEFAULT_TIMEOUT_MS",
            config.executor.constraints.default_timeout_ms,
        );
        config.executor.constraints.max_output_bytes = parse_env_var(
            "SHELLGATE_MAX_OUTPUT_BYTES",
            config.executor.constraints.max_output_bytes,
        );
        if let Ok(mode) = std::env::var("SHELLGATE_SPAWN_MODE") {
            config.executor.spawn_mode = mode
                .parse::<SpawnMode>()
                .map_err(|reason| ConfigError::Invalid {
                    var: "SHELLGATE_SPAWN_MODE",
                    reason,
                })?;
        }
        if let Ok(shell) = std::env::var("SHELLGATE_SHELL") {
            config.executor.shell = shell;
        }

        if let Ok(path) = std::env::var("SHELLGATE_POLICY_PATH") {
            config.policy_path = PathBuf::from(path);
        }
        config.history_capacity =
            parse_env_var("SHELLGATE_HISTORY_CAPACITY", config.history_capacity);
        config.log_level = parse_env_var("SHELLGATE_LOG_LEVEL", config.log_level);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.comm.bind_addr().map_err(|reason| ConfigError::Invalid {
            var: "SHELLGATE_LISTEN_ADDR",
            reason,
        })?;
        if self.executor.constraints.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "SHELLGATE_DEFAULT_TIMEOUT_MS",
                reason: "must be positive".to_string(),
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "SHELLGATE_HISTORY_CAPACITY",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
