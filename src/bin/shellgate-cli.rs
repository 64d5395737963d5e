//! Shellgate CLI client
//!
//! A command-line client that talks to the shellgate daemon via UDP.
//! Uses rustyline for readline-style editing and history.

use clap::Parser;
use rustyline::Editor;
use rustyline::history::FileHistory;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const HEADER_LEN: usize = 5;

/// Message types
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum MsgType {
    Request = 0x01,
    RequestAck = 0x02,
    Response = 0x03,
}

/// Request payload
#[derive(Debug, Serialize)]
struct RequestPayload {
    content: String,
}

/// Response payload
#[derive(Debug, Deserialize)]
struct ResponsePayload {
    status: u16,
    content: String,
    is_error: bool,
}

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "shellgate-cli")]
#[command(about = "Shellgate daemon CLI client")]
struct Args {
    /// Daemon address (e.g., 127.0.0.1:9710)
    #[arg(short, long, default_value = "127.0.0.1:9710")]
    target: SocketAddr,

    /// ACK timeout in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,

    /// Maximum retry attempts
    #[arg(short, long, default_value = "3")]
    max_retries: u32,

    /// History file path
    #[arg(long)]
    history_file: Option<PathBuf>,

    /// Caller identity recorded with each execution
    #[arg(short, long)]
    user: Option<String>,

    /// Per-command timeout in milliseconds (daemon default when omitted)
    #[arg(long)]
    cmd_timeout_ms: Option<u64>,

    /// Absolute working directory for executed commands
    #[arg(long)]
    cwd: Option<String>,
}

/// CLI configuration
#[derive(Debug, Clone)]
struct Config {
    target: SocketAddr,
    ack_timeout_secs: u64,
    max_retries: u32,
    history_file: PathBuf,
    user: Option<String>,
    cmd_timeout_ms: Option<u64>,
    cwd: Option<String>,
}

impl Config {
    fn from_args(args: Args) -> Self {
        let history_file = args.history_file.unwrap_or_else(|| {
            dirs::home_dir()
                .map(|p| p.join(".shellgate_history"))
                .unwrap_or_else(|| PathBuf::from(".shellgate_history"))
        });

        Self {
            target: args.target,
            ack_timeout_secs: args.timeout,
            max_retries: args.max_retries,
            history_file,
            user: args.user,
            cmd_timeout_ms: args.cmd_timeout_ms,
            cwd: args.cwd,
        }
    }

    /// Response wait covers the command's own timeout plus slack
    fn response_timeout(&self) -> Duration {
        let cmd_ms = self.cmd_timeout_ms.unwrap_or(10_000);
        Duration::from_millis(cmd_ms) + Duration::from_secs(30)
    }
}

/// A line typed at the prompt, turned into an operation
#[derive(Debug, PartialEq)]
enum Input {
    Help,
    Request(Value),
    Usage(&'static str),
}

/// Map a prompt line onto the daemon's JSON operations
fn parse_input(line: &str, config: &Config) -> Input {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "help" => Input::Help,
        "commands" => Input::Request(json!({ "op": "list_commands" })),
        "sysinfo" => Input::Request(json!({ "op": "system_info" })),
        "validate" if rest.is_empty() => Input::Usage("validate <command>"),
        "validate" => Input::Request(json!({ "op": "validate", "command": rest })),
        "run" if rest.is_empty() => Input::Usage("run <command>"),
        "run" => Input::Request(execute_request(rest, config)),
        "history" => {
            let mut parts = rest.split_whitespace();
            let page = parts.next().map(str::parse::<usize>);
            let size = parts.next().map(str::parse::<usize>);
            match (page, size) {
                (Some(Err(_)), _) | (_, Some(Err(_))) => Input::Usage("history [page] [size]"),
                (page, size) => Input::Request(json!({
                    "op": "list_history",
                    "page": page.and_then(Result::ok),
                    "pageSize": size.and_then(Result::ok),
                    "user": config.user,
                })),
            }
        }
        "show" if rest.is_empty() => Input::Usage("show <id>"),
        "show" => Input::Request(json!({ "op": "get_history", "id": rest })),
        "delete" if rest.is_empty() => Input::Usage("delete <id>"),
        "delete" => Input::Request(json!({ "op": "delete_history", "id": rest })),
        _ => Input::Request(execute_request(line, config)),
    }
}

fn execute_request(command: &str, config: &Config) -> Value {
    json!({
        "op": "execute",
        "command": command,
        "timeoutMs": config.cmd_timeout_ms,
        "workingDirectory": config.cwd,
        "user": config.user,
    })
}

fn print_help() {
    println!("Commands:");
    println!("  commands               list whitelisted commands");
    println!("  validate <command>     check a command without running it");
    println!("  run <command>          execute a command (bare text works too)");
    println!("  history [page] [size]  list past executions, newest first");
    println!("  show <id>              show one execution");
    println!("  delete <id>            remove one execution from history");
    println!("  sysinfo                show daemon host information");
    println!("  help                   show this message");
}

/// Print an execution record the way a terminal would show it
fn print_execution(record: &Value) -> bool {
    let Some(exit_code) = record.get("exitCode").and_then(Value::as_i64) else {
        return false;
    };

    if let Some(stdout) = record.get("stdout").and_then(Value::as_str)
        && !stdout.is_empty()
    {
        print!("{}", stdout);
        if !stdout.ends_with('\n') {
            println!();
        }
    }
    if let Some(stderr) = record.get("stderr").and_then(Value::as_str)
        && !stderr.is_empty()
    {
        eprint!("{}", stderr);
        if !stderr.ends_with('\n') {
            eprintln!();
        }
    }

    let id = record.get("id").and_then(Value::as_u64).unwrap_or_default();
    let duration = record
        .get("durationMs")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    let mut flags = String::new();
    if record.get("timedOut").and_then(Value::as_bool) == Some(true) {
        flags.push_str(" timed-out");
    }
    if record.get("truncated").and_then(Value::as_bool) == Some(true) {
        flags.push_str(" truncated");
    }
    println!("[#{} exit={} {}ms{}]", id, exit_code, duration, flags);
    true
}

fn print_response(response: &ResponsePayload) {
    let body: Option<Value> = serde_json::from_str(&response.content).ok();

    if response.is_error {
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(&response.content);
        println!("[error {}] {}", response.status, message);

        if let Some(suggestions) = body
            .as_ref()
            .and_then(|b| b.get("suggestions"))
            .and_then(Value::as_array)
            .filter(|s| !s.is_empty())
        {
            let names: Vec<&str> = suggestions.iter().filter_map(Value::as_str).collect();
            println!("Did you mean: {}", names.join(", "));
        }
        return;
    }

    match body {
        Some(body) => {
            if !print_execution(&body) {
                match serde_json::to_string_pretty(&body) {
                    Ok(pretty) => println!("{}", pretty),
                    Err(_) => println!("{}", response.content),
                }
            }
        }
        None => println!("{}", response.content),
    }
}

/// Main client state
struct Client {
    socket: UdpSocket,
    config: Config,
    seq: AtomicU32,
}

impl Client {
    /// Create a new client
    async fn new(config: Config) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;

        Ok(Self {
            socket,
            config,
            seq: AtomicU32::new(1),
        })
    }

    /// Send a request and wait for response
    async fn send_request(&self, content: String) -> io::Result<ResponsePayload> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);

        let body = rmp_serde::to_vec_named(&RequestPayload { content })
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut packet = Vec::with_capacity(HEADER_LEN + body.len());
        packet.push(MsgType::Request as u8);
        packet.extend_from_slice(&seq.to_be_bytes());
        packet.extend_from_slice(&body);

        // The daemon deduplicates by seq, so resending is safe
        for _attempt in 0..self.config.max_retries {
            self.socket.send_to(&packet, self.config.target).await?;

            match self.wait_for_reply(seq).await {
                Ok(Some(response)) => return Ok(response),
                Ok(None) => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    eprintln!("[warning] Response timeout, retrying...");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "shellgate not responding",
        ))
    }

    /// Wait for the ACK (or an early RESPONSE), then for the RESPONSE.
    ///
    /// `Ok(None)` means no ACK arrived in time and the request should be resent.
    async fn wait_for_reply(&self, expected_seq: u32) -> io::Result<Option<ResponsePayload>> {
        let mut buf = vec![0u8; 65536];
        let ack_wait = Duration::from_secs(self.config.ack_timeout_secs);
        let mut acked = false;

        loop {
            let wait = if acked {
                self.config.response_timeout()
            } else {
                ack_wait
            };

            let (len, addr) = match timeout(wait, self.socket.recv_from(&mut buf)).await {
                Ok(result) => result?,
                Err(_) if acked => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "Response timeout"));
                }
                Err(_) => return Ok(None),
            };

            if addr != self.config.target || len < HEADER_LEN {
                continue;
            }

            let msg_type = buf[0];
            let seq = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
            if seq != expected_seq {
                // Late reply to an earlier request
                continue;
            }

            if msg_type == MsgType::RequestAck as u8 {
                acked = true;
            } else if msg_type == MsgType::Response as u8 {
                return rmp_serde::from_slice(&buf[HEADER_LEN..len])
                    .map(Some)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
            }
        }
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let config = Config::from_args(args);

    if let Ok(lang) = std::env::var("LANG")
        && !lang.to_lowercase().contains("utf-8")
        && !lang.to_lowercase().contains("utf8")
    {
        eprintln!(
            "[warning] Terminal locale is not UTF-8. Non-ASCII output may not display correctly."
        );
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_client(config).await })
}

async fn run_client(config: Config) -> io::Result<()> {
    let client = Client::new(config.clone()).await?;

    let mut rl: Editor<(), FileHistory> = Editor::new().map_err(io::Error::other)?;

    if config.history_file.exists()
        && let Err(e) = rl.load_history(&config.history_file)
    {
        eprintln!("[warning] Failed to load history: {}", e);
    }

    println!("shellgate-cli v{}", env!("CARGO_PKG_VERSION"));
    println!("Target: {}", client.config.target);
    println!("Type a command and press Enter, or 'help'. Ctrl+D to quit.");
    println!();

    loop {
        match rl.readline("$ ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(input);

                let request = match parse_input(input, &config) {
                    Input::Help => {
                        print_help();
                        continue;
                    }
                    Input::Usage(usage) => {
                        println!("usage: {}", usage);
                        continue;
                    }
                    Input::Request(request) => request,
                };

                print!("[waiting...]");
                io::stdout().flush()?;

                let result = client.send_request(request.to_string()).await;
                print!("\r            \r");
                match result {
                    Ok(response) => print_response(&response),
                    Err(e) => println!("[error] {}", e),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("[error] Readline error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&config.history_file) {
        eprintln!("[warning] Failed to save history: {}", e);
    }

    println!("\nGoodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            target: "127.0.0.1:9710".parse().unwrap(),
            ack_timeout_secs: 5,
            max_retries: 3,
            history_file: PathBuf::from(".shellgate_history"),
            user: Some("alice".to_string()),
            cmd_timeout_ms: Some(2000),
            cwd: None,
        }
    }

    #[test]
    fn test_bare_text_executes() {
        let Input::Request(req) = parse_input("ls -la", &config()) else {
            panic!("expected request");
        };
        assert_eq!(req["op"], "execute");
        assert_eq!(req["command"], "ls -la");
        assert_eq!(req["timeoutMs"], 2000);
        assert_eq!(req["user"], "alice");
        assert!(req["workingDirectory"].is_null());
    }

    #[test]
    fn test_run_strips_keyword() {
        let Input::Request(req) = parse_input("run  pwd", &config()) else {
            panic!("expected request");
        };
        assert_eq!(req["command"], "pwd");
    }

    #[test]
    fn test_history_arguments() {
        let Input::Request(req) = parse_input("history 2 5", &config()) else {
            panic!("expected request");
        };
        assert_eq!(req["op"], "list_history");
        assert_eq!(req["page"], 2);
        assert_eq!(req["pageSize"], 5);

        let Input::Request(req) = parse_input("history", &config()) else {
            panic!("expected request");
        };
        assert!(req["page"].is_null());

        assert_eq!(
            parse_input("history two", &config()),
            Input::Usage("history [page] [size]")
        );
    }

    #[test]
    fn test_missing_arguments_show_usage() {
        assert_eq!(parse_input("show", &config()), Input::Usage("show <id>"));
        assert_eq!(parse_input("validate", &config()), Input::Usage("validate <command>"));
        assert_eq!(parse_input("help", &config()), Input::Help);
    }

    #[test]
    fn test_id_operations() {
        let Input::Request(req) = parse_input("delete 7", &config()) else {
            panic!("expected request");
        };
        assert_eq!(req, json!({ "op": "delete_history", "id": "7" }));
    }
}
