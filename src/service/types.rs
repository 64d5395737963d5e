// Request and response bodies for Service module

use crate::history::ExecutionResult;
use crate::policy::CommandInfo;
use serde::{Deserialize, Serialize};

/// One call into the service, as carried by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    ListCommands,
    Validate {
        command: String,
    },
    Execute {
        command: String,
        #[serde(default, rename = "timeoutMs")]
        timeout_ms: Option<u64>,
        #[serde(default, rename = "workingDirectory")]
        working_directory: Option<String>,
        #[serde(default)]
        user: Option<String>,
    },
    ListHistory {
        #[serde(default)]
        page: Option<usize>,
        #[serde(default, rename = "pageSize")]
        page_size: Option<usize>,
        #[serde(default)]
        user: Option<String>,
    },
    GetHistory {
        id: String,
    },
    DeleteHistory {
        id: String,
    },
    SystemInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandList {
    pub commands: Vec<CommandInfo>,
    pub total: usize,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub command: String,
    pub is_valid: bool,
    pub reason: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedEntry {
    pub message: String,
    pub command: ExecutionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: Option<u64>,
    pub available: Option<u64>,
    pub free: Option<u64>,
    /// `total - available`
    pub used: Option<u64>,
}

/// Host and process facts that are safe to expose
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: String,
    pub arch: String,
    pub family: String,
    pub version: String,
    pub hostname: Option<String>,
    pub pid: u32,
    pub cwd: String,
    pub uptime_secs: u64,
    pub cpu_cores: usize,
    pub cpu_model: Option<String>,
    pub memory: MemoryInfo,
    pub network_interfaces: Vec<String>,
    pub spawn_mode: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
