//! Core trait definitions for the TOLLGATE dispatch pipeline.
//!
//! These traits define the complete trust boundary:
//!
//! - `RiskClassifier` / `RiskAssessor`     : trusted, pure: action → tier
//! - `ApprovalPolicy` / `AutoApproveRule`  : trusted, pure: tier → verdict
//! - `ApprovalChannel`                     : boundary to the human approver
//! - `AuditWriter`                         : trusted sink for decision records
//! - `ActionExecutor`                      : untrusted host capability
//!
//! The dispatcher wires them together. `ActionExecutor::execute` is never
//! called unless the policy auto-approves or the channel returns `Approved`.

use std::time::Duration;

use serde_json::Value;

use tollgate_contracts::{
    action::{Action, Parameters},
    approval::{ApprovalOutcome, ApprovalRequest},
    error::GateResult,
    execution::DecisionRecord,
    policy::PolicyVerdict,
    risk::RiskTier,
    session::SessionContext,
};

/// Maps an action to its risk tier.
///
/// Implementations are configured once and must be pure afterwards: the same
/// action always yields the same tier, and `classify` is safe to call from
/// many threads at once. A returned error is a configuration fault and is
/// propagated out of the dispatch.
pub trait RiskClassifier: Send + Sync {
    fn classify(&self, action: &Action) -> GateResult<RiskTier>;
}

/// A pluggable assessor consulted before the built-in pattern table.
///
/// Returning `Ok(None)` defers to the next assessor; the first `Some` wins.
pub trait RiskAssessor: Send + Sync {
    fn assess(&self, action: &Action) -> GateResult<Option<RiskTier>>;
}

impl<F> RiskAssessor for F
where
    F: Fn(&Action) -> Option<RiskTier> + Send + Sync,
{
    fn assess(&self, action: &Action) -> GateResult<Option<RiskTier>> {
        Ok(self(action))
    }
}

/// Maps a tier plus the action to a verdict.
///
/// Same purity and thread-safety requirements as `RiskClassifier`.
pub trait ApprovalPolicy: Send + Sync {
    fn decide(&self, tier: RiskTier, action: &Action) -> GateResult<PolicyVerdict>;
}

/// A pluggable predicate that lets an action skip the human round-trip.
///
/// Auto-approve rules are only consulted after the auto-deny check, so they
/// can never rescue an auto-denied tier.
pub trait AutoApproveRule: Send + Sync {
    fn evaluate(&self, action: &Action) -> GateResult<bool>;
}

impl<F> AutoApproveRule for F
where
    F: Fn(&Action) -> bool + Send + Sync,
{
    fn evaluate(&self, action: &Action) -> GateResult<bool> {
        Ok(self(action))
    }
}

/// The boundary through which a human decision is solicited and awaited.
pub trait ApprovalChannel: Send + Sync {
    /// Perform exactly one round-trip and block until it resolves.
    ///
    /// Must return within roughly `timeout`; a late answer is abandoned and
    /// reported as `TimedOut`. Implementations never retry, because a
    /// duplicated approval prompt is user-visible.
    fn request(&self, request: &ApprovalRequest, timeout: Duration) -> ApprovalOutcome;

    /// Best-effort notification that a session started.
    fn announce_start(&self, session: &SessionContext) -> GateResult<()>;

    /// Best-effort notification that a session ended.
    fn announce_end(&self, session: &SessionContext) -> GateResult<()>;
}

/// The audit writer: the append-only decision log.
pub trait AuditWriter: Send + Sync {
    /// Append one decision record. Records are never modified afterwards.
    fn write(&self, record: &DecisionRecord) -> GateResult<()>;

    /// Mark a session's log as complete (flush, seal, or just log).
    fn finalize(&self, session_id: &str) -> GateResult<()>;
}

/// The host capability that performs an approved action's side effect.
///
/// The gate never interprets what an executor does; it only decides whether
/// `execute` may be called.
pub trait ActionExecutor {
    fn execute(&self, name: &str, parameters: &Parameters) -> GateResult<Value>;
}

impl<F> ActionExecutor for F
where
    F: Fn(&str, &Parameters) -> GateResult<Value>,
{
    fn execute(&self, name: &str, parameters: &Parameters) -> GateResult<Value> {
        self(name, parameters)
    }
}
