// Subprocess launch, output capture and timeout handling

use crate::executor::types::ProcessOutcome;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How long to keep draining pipes after a timed-out child was killed
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Growing output buffer that keeps at most `limit` bytes
#[derive(Debug)]
struct Capture {
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Capture {
    fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            truncated: false,
        }
    }

    fn push(&mut self, data: &[u8]) {
        let room = self.limit.saturating_sub(self.buf.len());
        if data.len() > room {
            self.truncated = true;
        }
        self.buf.extend_from_slice(&data[..data.len().min(room)]);
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

/// Read a pipe to EOF. Bytes beyond the cap are read and discarded so the
/// child never blocks on a full pipe.
async fn drain<R>(reader: &mut Option<R>, capture: &mut Capture)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader.as_mut() else {
        return;
    };

    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => capture.push(&buf[..n]),
            Err(e) => {
                warn!(error = %e, "pipe read failed");
                break;
            }
        }
    }
}

/// Run a prepared command to completion or until `limit` elapses.
///
/// Never fails: spawn and wait errors come back as `exit_code = -1` with the
/// error text in `stderr`, and a timeout kills the child and sets `timed_out`.
pub async fn run_process(mut cmd: Command, limit: Duration, max_output_bytes: usize) -> ProcessOutcome {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!(error = %e, "spawn failed");
            return ProcessOutcome {
                exit_code: -1,
                stderr: e.to_string(),
                ..Default::default()
            };
        }
    };

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out = Capture::new(max_output_bytes);
    let mut err = Capture::new(max_output_bytes);

    let run = async {
        let (_, _, status) = tokio::join!(
            drain(&mut stdout, &mut out),
            drain(&mut stderr, &mut err),
            child.wait()
        );
        status
    };

    let finished = timeout(limit, run).await;
    let (status, timed_out) = match finished {
        Ok(status) => (status, false),
        Err(_) => {
            warn!(
                pid = child.id().unwrap_or_default(),
                timeout_ms = limit.as_millis() as u64,
                "process timed out, killing"
            );
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to signal timed-out process");
            }
            let status = child.wait().await;

            // Pick up whatever was written before the kill
            let drained = timeout(DRAIN_GRACE, async {
                tokio::join!(drain(&mut stdout, &mut out), drain(&mut stderr, &mut err))
            })
            .await;
            if drained.is_err() {
                debug!("output pipes still open after kill, giving up on them");
            }
            (status, true)
        }
    };

    let truncated = out.truncated || err.truncated;
    let stdout = out.into_string();
    let mut stderr = err.into_string();

    let exit_code = match status {
        Ok(status) if !timed_out => status.code().unwrap_or(-1),
        Ok(_) => -1,
        Err(e) => {
            // Wait failures replace stderr with the error text
            stderr = e.to_string();
            -1
        }
    };

    if timed_out {
        if !stderr.is_empty() && !stderr.ends_with('\n') {
            stderr.push('\n');
        }
        stderr.push_str(&format!(
            "process terminated after {}ms timeout",
            limit.as_millis()
        ));
    }

    ProcessOutcome {
        exit_code,
        stdout,
        stderr,
        timed_out,
        truncated,
    }
}
