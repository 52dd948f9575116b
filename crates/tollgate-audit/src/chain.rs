//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. session_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the decision record
//!
//! Action parameters keep their insertion order, so the JSON of a given
//! record is the same on every call.

use sha2::{Digest, Sha256};

use tollgate_contracts::{
    error::{GateError, GateResult},
    execution::DecisionRecord,
};

use crate::event::AuditEvent;

/// Compute the SHA-256 hash for a single audit event.
///
/// Returns a lowercase 64-character hex string, or `AuditWriteFailed` if the
/// record cannot be serialized.
pub fn hash_event(
    session_id: &str,
    sequence: u64,
    record: &DecisionRecord,
    prev_hash: &str,
) -> GateResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| GateError::AuditWriteFailed {
        reason: format!("decision record is not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// A chain is valid when every event's `prev_hash` equals the previous
/// event's `this_hash` (`GENESIS_HASH` for the first), every `this_hash`
/// matches the value recomputed from the event's fields, and sequence
/// numbers count up from 0 without gaps. An empty chain is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    let mut expected_prev = AuditEvent::GENESIS_HASH;

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(&event.session_id, event.sequence, &event.record, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = &event.this_hash;
    }

    true
}
