//! Helpers for running child processes with an optional deadline.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How the child's stderr is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrMode {
    /// Passed through to the runner's own stderr.
    Inherit,
    /// Collected in memory, keeping at most `limit` bytes.
    Capture { limit: usize },
}

/// Exit status and (optionally) captured stderr of a child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stderr: Vec<u8>,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// Captured stderr as text, with notices for truncation and timeouts.
    pub fn stderr_text(&self, timeout: Option<Duration>) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_truncated > 0 {
            text.push_str(&format!(
                "\n[stderr truncated {} bytes]\n",
                self.stderr_truncated
            ));
        }
        if self.timed_out
            && let Some(timeout) = timeout
        {
            text.push_str(&format!("\n[timed out after {}s]\n", timeout.as_secs()));
        }
        text
    }
}

/// Run `cmd` to completion. Stdout is always inherited, stdin is closed.
///
/// With `timeout` set, a child still running at the deadline is killed and
/// reported with `timed_out = true`. Captured stderr is drained on a reader
/// thread so a chatty child cannot block on a full pipe.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs()), stderr_mode = ?stderr_mode))]
pub fn run_command(
    mut cmd: Command,
    stderr_mode: StderrMode,
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null()).stdout(Stdio::inherit());
    match stderr_mode {
        StderrMode::Inherit => cmd.stderr(Stdio::inherit()),
        StderrMode::Capture { .. } => cmd.stderr(Stdio::piped()),
    };

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stderr_handle = match stderr_mode {
        StderrMode::Inherit => None,
        StderrMode::Capture { limit } => {
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| anyhow!("stderr was not piped"))?;
            Some(thread::spawn(move || read_stream_limited(stderr, limit)))
        }
    };

    let (status, timed_out) = wait_for_exit(&mut child, timeout)?;

    let (stderr, stderr_truncated) = match stderr_handle {
        Some(handle) => join_output(handle).context("join stderr")?,
        None => (Vec::new(), 0),
    };
    if stderr_truncated > 0 {
        warn!(stderr_truncated, "stderr truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stderr,
        stderr_truncated,
        timed_out,
    })
}

fn wait_for_exit(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("wait for command")?;
        return Ok((status, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((status, false)),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            let status = child.wait().context("wait command after kill")?;
            Ok((status, true))
        }
    }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
