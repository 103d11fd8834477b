// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Subprocess tool runtime.
//!
//! [`ToolRuntime`] is the execution seam: the orchestrator talks to the
//! trait, and [`ProcessRuntime`] is the one shell-out implementation. An
//! in-process implementation can slot in later without touching callers.
//!
//! Contract per invocation:
//! - the tool receives the JSON-serialized payload as its single positional
//!   argument and runs in its own process group;
//! - stdout/stderr are drained incrementally into bounded buffers, so a
//!   chatty tool cannot grow memory without bound (and cannot deadlock on a
//!   full pipe; excess output is read and discarded);
//! - at the timeout the whole process group is killed and the child is
//!   reaped before the outcome returns, so a `TimedOut` outcome implies the
//!   process is no longer running.
//!
//! There is no grace period before the kill; escalation behavior for tools
//! that ignore termination is an open product decision.

use crate::domain::tool::ToolDescriptor;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// How a single subprocess run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The process started and exited on its own.
    Completed { exit_code: i32 },
    /// The process outlived its budget and was forcibly terminated.
    TimedOut,
    /// The process never started.
    SpawnFailed { reason: String },
}

/// Raw outcome of one subprocess run, before the engine maps it onto an
/// execution result.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Execution seam between the orchestrator and whatever actually runs a
/// tool.
#[async_trait]
pub trait ToolRuntime: Send + Sync {
    async fn run(
        &self,
        descriptor: &ToolDescriptor,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> RunOutcome;
}

/// Shell-out runtime: one OS subprocess per invocation.
pub struct ProcessRuntime {
    capture_limit: usize,
}

impl ProcessRuntime {
    pub fn new(capture_limit: usize) -> Self {
        Self { capture_limit }
    }
}

#[async_trait]
impl ToolRuntime for ProcessRuntime {
    async fn run(
        &self,
        descriptor: &ToolDescriptor,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> RunOutcome {
        let started = Instant::now();
        let payload_arg = payload.to_string();

        let mut command = tokio::process::Command::new(&descriptor.executable);
        command
            .arg(&payload_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(error) => {
                warn!(tool = %descriptor.id, %error, "failed to spawn tool process");
                return RunOutcome {
                    status: RunStatus::SpawnFailed {
                        reason: error.to_string(),
                    },
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: started.elapsed(),
                };
            }
        };

        #[cfg(unix)]
        let pgid = child.id();

        // Drain both pipes concurrently; a blocked pipe must never be the
        // reason a tool hangs.
        let stdout_task = child
            .stdout
            .take()
            .map(|r| tokio::spawn(drain_capped(r, self.capture_limit)));
        let stderr_task = child
            .stderr
            .take()
            .map(|r| tokio::spawn(drain_capped(r, self.capture_limit)));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(exit)) => {
                let exit_code = exit.code().unwrap_or(-1);
                debug!(tool = %descriptor.id, exit_code, "tool process exited");
                RunStatus::Completed { exit_code }
            }
            Ok(Err(error)) => {
                warn!(tool = %descriptor.id, %error, "failed waiting on tool process");
                RunStatus::Completed { exit_code: -1 }
            }
            Err(_) => {
                warn!(tool = %descriptor.id, timeout_ms = timeout.as_millis() as u64,
                      "tool exceeded its timeout, killing process group");
                #[cfg(unix)]
                if let Some(pid) = pgid {
                    // The child leads its own process group, so this takes
                    // down any grandchildren it spawned as well.
                    unsafe {
                        libc::killpg(pid as i32, libc::SIGKILL);
                    }
                }
                #[cfg(not(unix))]
                let _ = child.start_kill();

                // Reap before returning: a TimedOut outcome guarantees the
                // process is gone.
                let _ = child.wait().await;
                RunStatus::TimedOut
            }
        };

        let stdout = match stdout_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        RunOutcome {
            status,
            stdout,
            stderr,
            duration: started.elapsed(),
        }
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes. Reading continues past
/// the cap (discarding) so the child never blocks on a full pipe.
async fn drain_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> String {
    let mut collected: Vec<u8> = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if collected.len() < cap {
                    let take = n.min(cap - collected.len());
                    collected.extend_from_slice(&buf[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }
    let mut text = String::from_utf8_lossy(&collected).into_owned();
    if truncated {
        text.push_str("\n[output truncated]");
    }
    text
}
