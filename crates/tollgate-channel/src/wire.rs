//! Wire format spoken to the external approver binary.
//!
//! Each hook invocation receives one JSON document on stdin and answers with
//! its exit code:
//!
//! | exit code | meaning  |
//! |-----------|----------|
//! | 0         | approved |
//! | 2         | denied   |
//! | other     | error    |

use std::path::Path;

use serde::Serialize;

use tollgate_contracts::{
    action::Parameters,
    approval::{ApprovalOutcome, ApprovalRequest},
    session::SessionContext,
};

/// Hook name for an approval request.
pub const HOOK_PRE_TOOL_USE: &str = "pretooluse";
/// Hook name for the session start notification.
pub const HOOK_SESSION_START: &str = "sessionstart";
/// Hook name for the session end notification.
pub const HOOK_STOP: &str = "stop";

pub const EXIT_APPROVED: i32 = 0;
pub const EXIT_DENIED: i32 = 2;

/// Stdin payload for `hook pretooluse`.
#[derive(Debug, Serialize)]
pub struct PreToolUseInput<'a> {
    pub tool_name: &'a str,
    pub tool_input: &'a Parameters,
    pub session_id: &'a str,
    pub cwd: &'a Path,
    pub transcript_path: &'a Path,
}

impl<'a> From<&'a ApprovalRequest> for PreToolUseInput<'a> {
    fn from(request: &'a ApprovalRequest) -> Self {
        Self {
            tool_name: &request.action.name,
            tool_input: &request.action.parameters,
            session_id: &request.session_id,
            cwd: &request.working_directory,
            transcript_path: &request.transcript_path,
        }
    }
}

/// Stdin payload for `hook sessionstart`.
#[derive(Debug, Serialize)]
pub struct SessionStartInput<'a> {
    pub session_id: &'a str,
    pub cwd: &'a Path,
    pub transcript_path: &'a Path,
}

impl<'a> From<&'a SessionContext> for SessionStartInput<'a> {
    fn from(session: &'a SessionContext) -> Self {
        Self {
            session_id: &session.session_id,
            cwd: &session.working_directory,
            transcript_path: &session.transcript_path,
        }
    }
}

/// Stdin payload for `hook stop`.
#[derive(Debug, Serialize)]
pub struct StopInput<'a> {
    pub session_id: &'a str,
    pub cwd: &'a Path,
    pub stop_hook_active: bool,
}

impl<'a> From<&'a SessionContext> for StopInput<'a> {
    fn from(session: &'a SessionContext) -> Self {
        Self {
            session_id: &session.session_id,
            cwd: &session.working_directory,
            stop_hook_active: true,
        }
    }
}

/// Map the approver's exit status to an outcome.
///
/// `None` means the process was terminated by a signal.
pub fn outcome_for_exit(code: Option<i32>, stderr: &str) -> ApprovalOutcome {
    match code {
        Some(EXIT_APPROVED) => ApprovalOutcome::Approved,
        Some(EXIT_DENIED) => ApprovalOutcome::Denied,
        Some(code) => {
            let stderr = stderr.trim();
            let reason = if stderr.is_empty() {
                format!("approver exited with code {code}")
            } else {
                format!("approver exited with code {code}: {stderr}")
            };
            ApprovalOutcome::ChannelError { reason }
        }
        None => ApprovalOutcome::ChannelError {
            reason: "approver terminated by signal".to_string(),
        },
    }
}
