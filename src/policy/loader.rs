// Policy loading from TOML

use crate::policy::defaults::{DEFAULT_DESCRIPTION, default_blacklist};
use crate::policy::error::{PolicyError, Result};
use crate::policy::rules::CommandPolicy;
use crate::policy::types::CommandRule;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// On-disk policy layout
///
/// ```toml
/// [blacklist]
/// substrings = ["rm", "sudo", ";"]
///
/// [commands.ls]
/// flags = ["-la", "-l"]
/// description = "List directory contents"
/// ```
#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    blacklist: Option<BlacklistSection>,
    #[serde(default)]
    commands: BTreeMap<String, CommandSection>,
}

#[derive(Debug, Deserialize)]
struct BlacklistSection {
    substrings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CommandSection {
    #[serde(default)]
    flags: Vec<String>,
    description: Option<String>,
}

/// Parse a policy from TOML text.
///
/// A missing `[blacklist]` section keeps the built-in blacklist; an empty
/// `substrings` list disables it.
pub fn parse_policy(content: &str) -> Result<CommandPolicy> {
    let file: PolicyFile = toml::from_str(content)?;

    if file.commands.is_empty() {
        return Err(PolicyError::Invalid("no commands defined".to_string()));
    }

    // Listing order follows key order
    let mut rules = Vec::with_capacity(file.commands.len());
    for (name, section) in file.commands {
        if name.split_whitespace().count() != 1 || name.trim() != name {
            return Err(PolicyError::Invalid(format!("invalid command name '{}'", name)));
        }
        let description = section
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        rules.push(CommandRule {
            name,
            allowed_flags: section.flags,
            description,
        });
    }

    let blacklist = file
        .blacklist
        .map(|b| b.substrings)
        .unwrap_or_else(default_blacklist);

    Ok(CommandPolicy::new(rules, blacklist))
}

/// Load the policy file at `path`, falling back to the built-in tables when
/// the file does not exist.
pub fn load_policy(path: &Path) -> Result<CommandPolicy> {
    if !path.exists() {
        debug!(path = %path.display(), "policy file not found, using built-in policy");
        return Ok(CommandPolicy::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| PolicyError::Read(path.display().to_string(), e))?;
    let policy = parse_policy(&content)?;

    info!(
        path = %path.display(),
        commands = policy.rules().len(),
        blacklist = policy.blacklist().len(),
        "loaded command policy"
    );
    Ok(policy)
}
