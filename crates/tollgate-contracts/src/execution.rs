//! Dispatch results and decision records.
//!
//! `ActionResult` is what the dispatcher returns to the caller.
//! `DecisionRecord` is what gets written to the audit log, one per dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    action::{Action, DispatchId},
    approval::ApprovalOutcome,
    policy::PolicyVerdict,
    risk::RiskTier,
};

/// The final, immutable outcome of one dispatch.
///
/// Callers branch on the two flags:
/// - `approved && success` → the executor ran and returned `value`
/// - `approved && !success` → approval was granted but the executor failed
/// - `!approved` → the executor was never called; `error` says why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub approved: bool,
    /// The executor's return value, present only when `success` is true.
    pub value: Option<Value>,
    /// Human-readable failure or denial message.
    pub error: Option<String>,
}

impl ActionResult {
    /// The executor ran and succeeded.
    pub fn executed(value: Value) -> Self {
        Self {
            success: true,
            approved: true,
            value: Some(value),
            error: None,
        }
    }

    /// Approval was granted but the executor failed.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            approved: true,
            value: None,
            error: Some(message.into()),
        }
    }

    /// The action never reached the executor.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            approved: false,
            value: None,
            error: Some(message.into()),
        }
    }
}

/// An immutable record of one dispatch decision, written to the audit log.
///
/// Every dispatch that reaches a terminal state produces exactly one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub dispatch_id: DispatchId,
    pub session_id: String,
    /// The action as submitted.
    pub action: Action,
    /// The tier the classifier assigned.
    pub tier: RiskTier,
    /// The verdict the policy returned.
    pub verdict: PolicyVerdict,
    /// The approval outcome, present only when the verdict required approval.
    pub outcome: Option<ApprovalOutcome>,
    pub success: bool,
    pub approved: bool,
    pub error: Option<String>,
    /// Wall-clock time the record was created (UTC).
    pub timestamp: DateTime<Utc>,
}
