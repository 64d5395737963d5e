// Built-in policy tables

use crate::policy::types::CommandRule;

/// Description used when a command has none configured
pub const DEFAULT_DESCRIPTION: &str = "System command";

/// Substrings that forbid a command name outright
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "rm", "rmdir", "del", "rd",
    "format", "fdisk", "mkfs",
    "shutdown", "reboot", "halt",
    "sudo", "su",
    "chmod", "chown",
    "passwd", "useradd", "userdel",
    "kill", "killall", "pkill",
    "dd", ">", ">>", "|", "&", ";", "&&", "||",
    "eval", "exec", "system",
];

/// Characters and sequences a shell would interpret
pub const SHELL_METACHARACTERS: &[&str] = &[";", "|", "&", ">", "<", "`", "$(", "\n"];

/// Default whitelist, in listing order
pub fn default_rules() -> Vec<CommandRule> {
    vec![
        // File system
        CommandRule::new("ls", &["-la", "-l", "-a", "-h"], "List directory contents"),
        CommandRule::new("pwd", &[], "Print working directory"),
        CommandRule::new("whoami", &[], "Display current user"),
        CommandRule::new("date", &[], "Display current date and time"),
        CommandRule::new("uptime", &[], "Show system uptime"),
        CommandRule::new("df", &["-h"], "Show disk space usage"),
        CommandRule::new("free", &["-h"], "Show memory usage"),
        CommandRule::new("ps", &["aux"], "Show running processes"),
        CommandRule::new("top", &["-n", "1"], "Show system processes"),
        CommandRule::new("cat", &[], "Display file contents"),
        CommandRule::new("head", &["-n"], "Show first lines of file"),
        CommandRule::new("tail", &["-n"], "Show last lines of file"),
        CommandRule::new("wc", &["-l", "-w", "-c"], "Word count"),
        CommandRule::new("grep", &["-n", "-i", "-r"], "Search text patterns"),
        CommandRule::new("find", &[".", "-name", "-type"], "Search for files"),
        CommandRule::new("du", &["-h", "-s"], "Show directory sizes"),
        // Network
        CommandRule::new("ping", &["-c", "1"], "Test network connectivity"),
        CommandRule::new("curl", &["-I", "--max-time", "5"], "Transfer data from/to server"),
        CommandRule::new("wget", &["--spider", "--timeout", "5"], "Download files from web"),
        // Version control
        CommandRule::new(
            "git",
            &["status", "log", "--oneline", "branch", "remote", "-v"],
            "Git version control",
        ),
        // Runtimes
        CommandRule::new("node", &["--version"], "Node.js runtime"),
        CommandRule::new("npm", &["--version", "list", "--depth", "0"], "Node package manager"),
    ]
}

pub fn default_blacklist() -> Vec<String> {
    DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect()
}
