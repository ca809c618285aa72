//! Extraction tool process runner.
//!
//! Owns the child process for the whole attempt: spawn, drain both output
//! streams line-by-line into the caller's sink, enforce the wall-clock
//! timeout, and kill on every early exit path. `kill_on_drop` is set so a
//! caller that drops the returned future mid-flight (cancellation) still
//! reaps the child.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Lines of stderr kept for failure reporting.
const STDERR_TAIL_LINES: usize = 50;

/// Which stream a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One raw line of tool output.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub text: String,
}

/// How one attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit code zero; the job directory holds the artifacts
    Success,
    /// Non-zero exit
    Failed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },
    /// Hard timeout hit; the process was killed
    TimedOut,
    /// The tool could not be spawned at all
    LaunchError(String),
}

/// Seam for the download loop; tests substitute a scripted fake.
#[async_trait]
pub trait ExtractionRunner: Send + Sync {
    /// Run one attempt. Every output line is forwarded through `lines`
    /// before the outcome is returned, and the sender is dropped by then,
    /// so a caller draining the channel to exhaustion has seen everything.
    async fn run(
        &self,
        args: &[String],
        timeout: Duration,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> RunOutcome;
}

/// Real runner that spawns the yt-dlp binary.
pub struct YtDlpRunner {
    binary: String,
}

impl YtDlpRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for YtDlpRunner {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl ExtractionRunner for YtDlpRunner {
    async fn run(
        &self,
        args: &[String],
        timeout: Duration,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> RunOutcome {
        debug!(binary = %self.binary, ?args, "Spawning extraction tool");

        let mut child = match Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return RunOutcome::LaunchError(e.to_string()),
        };

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");

        let stdout_lines = lines.clone();
        let stdout_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let _ = stdout_lines.send(OutputLine {
                    stream: StreamKind::Stdout,
                    text: line,
                });
            }
        });

        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = reader.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.clone());
                let _ = lines.send(OutputLine {
                    stream: StreamKind::Stderr,
                    text: line,
                });
            }
            tail
        });

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return RunOutcome::LaunchError(e.to_string());
            }
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "Attempt exceeded timeout, killing process"
                );
                let _ = child.kill().await;
                // drain the readers so every line reaches the sink first
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                return RunOutcome::TimedOut;
            }
        };

        let _ = stdout_task.await;
        let tail = stderr_task.await.unwrap_or_default();

        if status.success() {
            RunOutcome::Success
        } else {
            RunOutcome::Failed {
                exit_code: status.code(),
                stderr_tail: Vec::from(tail).join("\n"),
            }
        }
    }
}
