//! # tollgate-audit
//!
//! Append-only, SHA-256 hash-chained record of every dispatch decision.
//!
//! ## Overview
//!
//! Each `DecisionRecord` the dispatcher produces is wrapped in an
//! `AuditEvent` that links to the previous event by hash. Changing any byte
//! of a stored record breaks the chain, and `verify_chain` reports it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tollgate_audit::InMemoryAuditWriter;
//!
//! let audit = InMemoryAuditWriter::new(session.session_id.clone());
//! let dispatcher = Dispatcher::new(classifier, policy, channel, Box::new(audit.clone()), session);
//! // ... dispatch ...
//! assert!(audit.verify_integrity());
//! audit.export_log().write_json("audit.json")?;
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::{AuditEvent, AuditLog};
pub use memory::InMemoryAuditWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────
