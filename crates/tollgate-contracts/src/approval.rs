//! Approval round-trip types.
//!
//! An `ApprovalRequest` is built fresh for every dispatch that needs a human
//! decision. The channel answers with exactly one `ApprovalOutcome`.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    action::{Action, DispatchId},
    session::SessionContext,
};

/// Everything the external approver is shown for one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Correlates the request with log lines and the decision record.
    pub dispatch_id: DispatchId,
    /// The action awaiting sign-off, unchanged from submission.
    pub action: Action,
    pub session_id: String,
    pub working_directory: PathBuf,
    /// Transcript reference handed to the approver.
    pub transcript_path: PathBuf,
}

impl ApprovalRequest {
    pub fn new(dispatch_id: DispatchId, action: Action, session: &SessionContext) -> Self {
        Self {
            dispatch_id,
            action,
            session_id: session.session_id.clone(),
            working_directory: session.working_directory.clone(),
            transcript_path: session.transcript_path.clone(),
        }
    }
}

/// The result of one approval round-trip.
///
/// Every variant other than `Approved` means "not approved" to the
/// dispatcher; they stay distinct so logs and audit records can tell a
/// human "no" apart from a broken channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// The approver said yes.
    Approved,

    /// The approver said no.
    Denied,

    /// No answer arrived before the deadline. The pending request was abandoned.
    TimedOut,

    /// The approver could not be reached at all (e.g. binary not installed).
    ChannelUnavailable { reason: String },

    /// Any other transport or protocol failure.
    ChannelError { reason: String },
}

impl ApprovalOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalOutcome::Approved)
    }

    /// The message placed in `ActionResult::error` when this outcome blocks
    /// execution. `None` for `Approved`.
    pub fn denial_message(&self) -> Option<String> {
        match self {
            ApprovalOutcome::Approved => None,
            ApprovalOutcome::Denied => Some("user denied action".to_string()),
            ApprovalOutcome::TimedOut => Some("approval request timed out".to_string()),
            ApprovalOutcome::ChannelUnavailable { reason } => {
                Some(format!("approval channel unavailable: {reason}"))
            }
            ApprovalOutcome::ChannelError { reason } => {
                Some(format!("approval channel error: {reason}"))
            }
        }
    }
}

impl fmt::Display for ApprovalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApprovalOutcome::Approved => "approved",
            ApprovalOutcome::Denied => "denied",
            ApprovalOutcome::TimedOut => "timed_out",
            ApprovalOutcome::ChannelUnavailable { .. } => "channel_unavailable",
            ApprovalOutcome::ChannelError { .. } => "channel_error",
        })
    }
}
