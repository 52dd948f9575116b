//! Approval channel backed by an external approver binary.
//!
//! Each approval request runs `<program> <args..> pretooluse` once, pipes the
//! request JSON on stdin, and waits for the exit code. The process is killed
//! when the deadline passes. Nothing is retried: a second invocation would
//! show the human a second prompt.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tollgate_contracts::{
    approval::{ApprovalOutcome, ApprovalRequest},
    error::{GateError, GateResult},
    session::SessionContext,
};
use tollgate_core::traits::ApprovalChannel;

use crate::wire::{
    outcome_for_exit, PreToolUseInput, SessionStartInput, StopInput, HOOK_PRE_TOOL_USE,
    HOOK_SESSION_START, HOOK_STOP,
};

/// Longest wait for the approver's stderr once it has exited.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Settings for [`CommandChannel`].
///
/// Every field has a default, so an empty TOML table is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandChannelConfig {
    /// Approver executable, resolved through `PATH`.
    pub program: String,
    /// Arguments placed before the hook name.
    pub args: Vec<String>,
    /// Upper bound for each session notification.
    pub notify_timeout_secs: u64,
    /// How often a running approver is polled for exit.
    pub poll_interval_ms: u64,
}

impl Default for CommandChannelConfig {
    fn default() -> Self {
        Self {
            program: "afk".to_string(),
            args: vec!["hook".to_string()],
            notify_timeout_secs: 30,
            poll_interval_ms: 25,
        }
    }
}

/// Why a hook invocation produced no exit status.
#[derive(Debug)]
enum RunFailure {
    /// The program does not exist.
    NotFound(io::Error),
    /// The program exists but could not be started.
    Spawn(io::Error),
    /// Waiting on the child failed.
    Wait(io::Error),
    /// The deadline passed; the child was killed.
    TimedOut,
}

/// A finished hook invocation.
struct Finished {
    status: ExitStatus,
    stderr: String,
}

/// An `ApprovalChannel` that shells out to an external approver.
#[derive(Debug, Clone, Default)]
pub struct CommandChannel {
    config: CommandChannelConfig,
}

impl CommandChannel {
    pub fn new(config: CommandChannelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CommandChannelConfig {
        &self.config
    }

    /// Run one hook with `input` on stdin, bounded by `timeout`.
    ///
    /// A timeout too large to represent as an `Instant` means no deadline.
    fn run(&self, hook: &str, input: Vec<u8>, timeout: Duration) -> Result<Finished, RunFailure> {
        let deadline = Instant::now().checked_add(timeout);

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(hook)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RunFailure::NotFound(e),
                _ => RunFailure::Spawn(e),
            })?;

        // Feed stdin and drain stderr off-thread so a full pipe can never
        // stall the deadline loop.
        if let Some(mut stdin) = child.stdin.take() {
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(&input) {
                    debug!(error = %e, "approver closed stdin early");
                }
            });
        }
        let (stderr_tx, stderr_rx) = mpsc::channel();
        if let Some(mut stderr) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                let _ = stderr_tx.send(buf);
            });
        }

        let status = self.wait_until(&mut child, deadline)?;

        // Anything the approver left running in the background can hold
        // stderr open after it exits. The exit code is the answer; stderr is
        // only detail, so it gets whatever is left of the deadline, capped.
        let grace = deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(STDERR_GRACE)
            .min(STDERR_GRACE);
        let stderr = stderr_rx.recv_timeout(grace).unwrap_or_else(|_| {
            debug!(hook, "approver stderr still open after exit, ignoring it");
            String::new()
        });

        Ok(Finished { status, stderr })
    }

    /// Poll `child` until it exits or `deadline` passes. `None` waits forever.
    fn wait_until(&self, child: &mut Child, deadline: Option<Instant>) -> Result<ExitStatus, RunFailure> {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    let mut nap = poll;
                    if let Some(deadline) = deadline {
                        let now = Instant::now();
                        if now >= deadline {
                            // Abandon the request; a late answer is never read.
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(RunFailure::TimedOut);
                        }
                        nap = nap.min(deadline - now);
                    }
                    thread::sleep(nap);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(RunFailure::Wait(e));
                }
            }
        }
    }

    /// Fire a session notification and report whether it was delivered.
    fn notify(&self, hook: &str, input: GateResult<Vec<u8>>) -> GateResult<()> {
        let timeout = Duration::from_secs(self.config.notify_timeout_secs);
        let failed = |reason: String| GateError::ChannelFailed { reason };

        match self.run(hook, input?, timeout) {
            Ok(finished) if finished.status.success() => Ok(()),
            Ok(finished) => Err(failed(format!("'{hook}' notification exited with {}", finished.status))),
            Err(RunFailure::TimedOut) => Err(failed(format!(
                "'{hook}' notification timed out after {}s",
                timeout.as_secs()
            ))),
            Err(RunFailure::NotFound(e) | RunFailure::Spawn(e) | RunFailure::Wait(e)) => {
                Err(failed(format!("'{hook}' notification failed: {e}")))
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> GateResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| GateError::ChannelFailed {
        reason: format!("failed to encode hook input: {e}"),
    })
}

impl ApprovalChannel for CommandChannel {
    fn request(&self, request: &ApprovalRequest, timeout: Duration) -> ApprovalOutcome {
        let input = match serde_json::to_vec_pretty(&PreToolUseInput::from(request)) {
            Ok(input) => input,
            Err(e) => {
                return ApprovalOutcome::ChannelError {
                    reason: format!("failed to encode approval request: {e}"),
                }
            }
        };

        debug!(
            dispatch_id = %request.dispatch_id,
            program = %self.config.program,
            action = %request.action.name,
            "sending approval request"
        );

        match self.run(HOOK_PRE_TOOL_USE, input, timeout) {
            Ok(finished) => outcome_for_exit(finished.status.code(), &finished.stderr),
            Err(RunFailure::TimedOut) => ApprovalOutcome::TimedOut,
            Err(RunFailure::NotFound(e)) => {
                warn!(program = %self.config.program, "approver binary not found");
                ApprovalOutcome::ChannelUnavailable {
                    reason: format!("'{}' not found: {e}", self.config.program),
                }
            }
            Err(RunFailure::Spawn(e)) => ApprovalOutcome::ChannelError {
                reason: format!("failed to start '{}': {e}", self.config.program),
            },
            Err(RunFailure::Wait(e)) => ApprovalOutcome::ChannelError {
                reason: format!("failed waiting on '{}': {e}", self.config.program),
            },
        }
    }

    fn announce_start(&self, session: &SessionContext) -> GateResult<()> {
        self.notify(HOOK_SESSION_START, encode(&SessionStartInput::from(session)))
    }

    fn announce_end(&self, session: &SessionContext) -> GateResult<()> {
        self.notify(HOOK_STOP, encode(&StopInput::from(session)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
