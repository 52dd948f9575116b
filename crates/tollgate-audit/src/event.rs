//! Audit event and log types.
//!
//! `AuditEvent` wraps one `DecisionRecord` with its position in the chain and
//! the hashes that make tampering detectable. `AuditLog` is the sealed export
//! of a whole session.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tollgate_contracts::{
    error::{GateError, GateResult},
    execution::DecisionRecord,
};

use crate::chain::verify_chain;

/// A single entry in the hash chain for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// The session this event belongs to.
    pub session_id: String,

    /// The decision the dispatcher reached.
    pub record: DecisionRecord,

    /// Hash of the previous event, or `GENESIS_HASH` for the first event.
    pub prev_hash: String,

    /// SHA-256 (hex) over (session_id, sequence, prev_hash, record).
    pub this_hash: String,
}

impl AuditEvent {
    /// The `prev_hash` of the first event in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A sealed audit log for a single session.
///
/// `terminal_hash` is the `this_hash` of the last event, a compact
/// commitment to the whole log. It is empty when no event was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub session_id: String,
    pub events: Vec<AuditEvent>,
    pub finalized_at: DateTime<Utc>,
    pub terminal_hash: String,
}

impl AuditLog {
    /// Re-verify the exported chain.
    pub fn verify(&self) -> bool {
        let terminal = self
            .events
            .last()
            .map(|e| e.this_hash.as_str())
            .unwrap_or_default();
        terminal == self.terminal_hash && verify_chain(&self.events)
    }

    /// Number of recorded decisions that ended with the executor running.
    pub fn approved_count(&self) -> usize {
        self.events.iter().filter(|e| e.record.approved).count()
    }

    /// Write the log as pretty JSON to `path`, replacing any existing file.
    pub fn write_json(&self, path: impl AsRef<Path>) -> GateResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| GateError::AuditWriteFailed {
            reason: format!("failed to encode audit log: {}", e),
        })?;
        std::fs::write(path, json).map_err(|e| GateError::AuditWriteFailed {
            reason: format!("failed to write audit log '{}': {}", path.display(), e),
        })
    }

    /// Read a log previously written by [`AuditLog::write_json`].
    pub fn read_json(path: impl AsRef<Path>) -> GateResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| GateError::AuditWriteFailed {
            reason: format!("failed to read audit log '{}': {}", path.display(), e),
        })?;
        serde_json::from_str(&raw).map_err(|e| GateError::AuditWriteFailed {
            reason: format!("failed to decode audit log '{}': {}", path.display(), e),
        })
    }
}
