// Service facade over policy, executor and history

use crate::executor::{ExecutionRequest, Executor};
use crate::history::{DEFAULT_PAGE_SIZE, ExecutionResult, HistoryPage};
use crate::service::error::{Result, ServiceError};
use crate::service::sysinfo;
use crate::service::types::{
    ApiRequest, CommandList, DeletedEntry, SystemInfo, ValidationReport,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

fn require_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("Command is required".to_string()));
    }
    Ok(())
}

/// Parse a history id received as text
pub fn parse_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::InvalidRequest("Invalid command ID format".to_string()))
}

/// Transport-neutral entry point for every operation
pub struct ShellService {
    executor: Arc<Executor>,
    started: Instant,
}

impl ShellService {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            started: Instant::now(),
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn list_commands(&self) -> CommandList {
        let commands = self.executor.policy().list_commands();
        CommandList {
            total: commands.len(),
            commands,
            note: "Only whitelisted commands are allowed for security reasons".to_string(),
        }
    }

    /// Dry run: no process, no history entry
    pub fn validate_command(&self, command: &str) -> Result<ValidationReport> {
        require_command(command)?;
        let result = self.executor.validate(command);
        Ok(ValidationReport {
            command: command.to_string(),
            is_valid: result.is_valid,
            reason: result.reason,
            suggestions: result.suggestions,
        })
    }

    pub async fn execute_command(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        Ok(self.executor.execute(request).await?)
    }

    pub fn list_history(
        &self,
        page: Option<usize>,
        page_size: Option<usize>,
        user: Option<&str>,
    ) -> HistoryPage {
        self.executor.history().list(
            page.unwrap_or(1),
            page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            user.filter(|u| !u.is_empty()),
        )
    }

    pub fn get_history(&self, id: &str) -> Result<ExecutionResult> {
        let id = parse_id(id)?;
        Ok(self.executor.history().get(id)?)
    }

    pub fn delete_history(&self, id: &str) -> Result<DeletedEntry> {
        let id = parse_id(id)?;
        let command = self.executor.history().delete(id)?;
        info!(id, "history entry deleted");
        Ok(DeletedEntry {
            message: "Command history deleted successfully".to_string(),
            command,
        })
    }

    pub fn system_info(&self) -> SystemInfo {
        sysinfo::collect(self.started, &self.executor.config().spawn_mode.to_string())
    }

    /// Dispatch a decoded request and serialize the reply body
    pub async fn handle(&self, request: ApiRequest) -> Result<Value> {
        debug!(?request, "dispatching request");
        match request {
            ApiRequest::ListCommands => to_body(&self.list_commands()),
            ApiRequest::Validate { command } => to_body(&self.validate_command(&command)?),
            ApiRequest::Execute {
                command,
                timeout_ms,
                working_directory,
                user,
            } => {
                let request = ExecutionRequest {
                    command,
                    timeout_ms,
                    working_directory,
                    user,
                };
                to_body(&self.execute_command(request).await?)
            }
            ApiRequest::ListHistory {
                page,
                page_size,
                user,
            } => to_body(&self.list_history(page, page_size, user.as_deref())),
            ApiRequest::GetHistory { id } => to_body(&self.get_history(&id)?),
            ApiRequest::DeleteHistory { id } => to_body(&self.delete_history(&id)?),
            ApiRequest::SystemInfo => to_body(&self.system_info()),
        }
    }

    /// Decode a JSON request, dispatch it, and return `(status, body)`
    pub async fn handle_json(&self, content: &str) -> (u16, Value) {
        let request: ApiRequest = match serde_json::from_str(content) {
            Ok(request) => request,
            Err(e) => {
                let err = ServiceError::InvalidRequest(format!("Malformed request: {}", e));
                return (err.status(), err.body());
            }
        };

        match self.handle(request).await {
            Ok(body) => (200, body),
            Err(e) => (e.status(), e.body()),
        }
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
