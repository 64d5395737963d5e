// Data types for Policy module

use serde::{Deserialize, Serialize};

/// A whitelisted command and the flags it may be given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRule {
    /// Exact, case-sensitive command name
    pub name: String,
    /// Flag tokens allowed verbatim (e.g. "-la")
    pub allowed_flags: Vec<String>,
    /// Human readable description
    pub description: String,
}

impl CommandRule {
    pub fn new(name: impl Into<String>, allowed_flags: &[&str], description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_flags: allowed_flags.iter().map(|f| f.to_string()).collect(),
            description: description.into(),
        }
    }
}

/// Outcome of validating a raw command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub reason: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub fn allow() -> Self {
        Self {
            is_valid: true,
            reason: "Command is safe to execute".to_string(),
            suggestions: Vec::new(),
        }
    }

    pub fn deny(reason: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
            suggestions,
        }
    }
}

/// Public listing entry for a whitelisted command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    pub command: String,
    pub allowed_flags: Vec<String>,
    pub description: String,
}

impl From<&CommandRule> for CommandInfo {
    fn from(rule: &CommandRule) -> Self {
        Self {
            command: rule.name.clone(),
            allowed_flags: rule.allowed_flags.clone(),
            description: rule.description.clone(),
        }
    }
}
