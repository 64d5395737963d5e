// Command policy: blacklist, whitelist and flag checks

use crate::policy::defaults::{SHELL_METACHARACTERS, default_blacklist, default_rules};
use crate::policy::types::{CommandInfo, CommandRule, ValidationResult};
use std::collections::HashMap;
use tracing::debug;

/// Split a command line on runs of whitespace
pub fn tokenize(raw: &str) -> Vec<&str> {
    raw.split_whitespace().collect()
}

/// Immutable command policy
///
/// Lookups never mutate, so a single instance can be shared across tasks
/// behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    rules: Vec<CommandRule>,
    index: HashMap<String, usize>,
    blacklist: Vec<String>,
}

impl CommandPolicy {
    /// Build a policy from explicit tables. Later rules with a duplicate name
    /// replace earlier ones.
    pub fn new(rules: Vec<CommandRule>, blacklist: Vec<String>) -> Self {
        let mut ordered: Vec<CommandRule> = Vec::with_capacity(rules.len());
        let mut index = HashMap::new();

        for rule in rules {
            match index.get(&rule.name) {
                Some(&pos) => ordered[pos] = rule,
                None => {
                    index.insert(rule.name.clone(), ordered.len());
                    ordered.push(rule);
                }
            }
        }

        Self {
            rules: ordered,
            index,
            blacklist,
        }
    }

    pub fn rule(&self, name: &str) -> Option<&CommandRule> {
        self.index.get(name).map(|&pos| &self.rules[pos])
    }

    pub fn rules(&self) -> &[CommandRule] {
        &self.rules
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Whitelisted commands in listing order
    pub fn list_commands(&self) -> Vec<CommandInfo> {
        self.rules.iter().map(CommandInfo::from).collect()
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.blacklist
            .iter()
            .any(|banned| lowered.contains(&banned.to_lowercase()))
    }

    /// Decide whether a raw command line may run.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// 1. the command name must not contain a blacklisted substring (any case)
    /// 2. the command name must be whitelisted (exact match)
    /// 3. every `-`-prefixed token must be an allowed flag for that command
    ///
    /// Positional arguments are never inspected.
    pub fn validate(&self, raw: &str) -> ValidationResult {
        let tokens = tokenize(raw);
        let (cmd, args) = match tokens.split_first() {
            Some((cmd, args)) => (*cmd, args),
            None => ("", &[][..]),
        };

        if self.is_blacklisted(cmd) {
            debug!(command = %cmd, "command rejected by blacklist");
            return ValidationResult::deny(
                format!("Command '{}' is not allowed for security reasons", cmd),
                Vec::new(),
            );
        }

        let Some(rule) = self.rule(cmd) else {
            // Keys extending the candidate, or keys the candidate extends
            let prefix = cmd.to_lowercase();
            let suggestions = self
                .rules
                .iter()
                .filter(|r| r.name.starts_with(&prefix) || prefix.starts_with(&r.name))
                .map(|r| r.name.clone())
                .collect();
            debug!(command = %cmd, "command not in whitelist");
            return ValidationResult::deny(
                format!("Command '{}' is not in the allowed commands list", cmd),
                suggestions,
            );
        };

        for arg in args {
            if arg.starts_with('-') && !rule.allowed_flags.iter().any(|f| f == arg) {
                debug!(command = %cmd, flag = %arg, "flag rejected");
                return ValidationResult::deny(
                    format!("Flag '{}' is not allowed for command '{}'", arg, cmd),
                    rule.allowed_flags.clone(),
                );
            }
        }

        ValidationResult::allow()
    }

    /// Validation for lines that will be handed to a shell.
    ///
    /// Runs [`validate`](Self::validate) first, then rejects any shell
    /// metacharacter or blacklisted token anywhere in the line.
    pub fn validate_shell_line(&self, raw: &str) -> ValidationResult {
        let result = self.validate(raw);
        if !result.is_valid {
            return result;
        }

        if let Some(meta) = SHELL_METACHARACTERS.iter().find(|m| raw.contains(*m)) {
            return ValidationResult::deny(
                format!("Shell metacharacter '{}' is not allowed", meta.escape_default()),
                Vec::new(),
            );
        }

        for token in tokenize(raw).into_iter().skip(1) {
            if self.is_blacklisted(token) {
                return ValidationResult::deny(
                    format!("Argument '{}' is not allowed for security reasons", token),
                    Vec::new(),
                );
            }
        }

        result
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::new(default_rules(), default_blacklist())
    }
}
