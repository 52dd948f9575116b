//! In-memory implementation of `AuditWriter`.
//!
//! `InMemoryAuditWriter` keeps the chain in a `Vec` behind a `Mutex`, so one
//! writer can be shared by every thread dispatching in the same session.
//! `export_log()` produces a sealed `AuditLog`; `verify_integrity()` checks
//! the live chain at any time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use tollgate_contracts::{
    error::{GateError, GateResult},
    execution::DecisionRecord,
};
use tollgate_core::traits::AuditWriter;

use crate::{
    chain::{hash_event, verify_chain},
    event::{AuditEvent, AuditLog},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All events written so far, in append order.
    pub(crate) events: Vec<AuditEvent>,

    /// The next sequence number to assign.
    pub(crate) sequence: u64,

    /// `this_hash` of the last event, or `GENESIS_HASH` before the first.
    pub(crate) last_hash: String,

    /// Set by `finalize`; later writes are refused.
    pub(crate) finalized: bool,
}

// ── Public writer ─────────────────────────────────────────────────────────────

/// An append-only audit writer for one session, backed by a SHA-256 chain.
///
/// Cloning is cheap and every clone appends to the same chain.
#[derive(Clone)]
pub struct InMemoryAuditWriter {
    session_id: String,
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryAuditWriter {
    pub fn new(session_id: impl Into<String>) -> Self {
        let state = InMemoryState {
            events: Vec::new(),
            sequence: 0,
            last_hash: AuditEvent::GENESIS_HASH.to_string(),
            finalized: false,
        };
        Self {
            session_id: session_id.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Number of decisions recorded so far.
    pub fn len(&self) -> usize {
        self.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `finalize` has been called for this session.
    pub fn is_finalized(&self) -> bool {
        self.read().finalized
    }

    /// Export a sealed `AuditLog` containing every event written so far.
    pub fn export_log(&self) -> AuditLog {
        let state = self.read();
        let terminal_hash = state
            .events
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        AuditLog {
            session_id: self.session_id.clone(),
            events: state.events.clone(),
            finalized_at: Utc::now(),
            terminal_hash,
        }
    }

    /// Verify that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.read().events)
    }

    /// Lock for reading. A poisoned lock still holds a consistent chain:
    /// `write` only mutates after every fallible step has succeeded.
    fn read(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> GateResult<MutexGuard<'_, InMemoryState>> {
        self.state.lock().map_err(|e| GateError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }
}

// ── AuditWriter impl ──────────────────────────────────────────────────────────

impl AuditWriter for InMemoryAuditWriter {
    fn write(&self, record: &DecisionRecord) -> GateResult<()> {
        let mut state = self.lock()?;

        if state.finalized {
            return Err(GateError::AuditWriteFailed {
                reason: format!("audit log for session '{}' is already finalized", self.session_id),
            });
        }

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_event(&self.session_id, sequence, record, &prev_hash)?;

        debug!(
            session_id = %self.session_id,
            sequence,
            dispatch_id = %record.dispatch_id,
            "decision recorded"
        );

        state.events.push(AuditEvent {
            sequence,
            session_id: self.session_id.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        Ok(())
    }

    fn finalize(&self, session_id: &str) -> GateResult<()> {
        let mut state = self.lock()?;
        state.finalized = true;

        info!(
            session_id = %session_id,
            event_count = state.events.len(),
            terminal_hash = %state.last_hash,
            "audit log finalized"
        );

        Ok(())
    }
}
