//! Reference agent demo scenarios.
//!
//! Each scenario wires real TOLLGATE components (pattern classifier, tiered
//! policy, an approval channel, the hash-chained audit writer) around the
//! host executor and prints what the gate decided at every step.

pub mod gate_cases;
pub mod walkthrough;

use std::time::Duration;

use tollgate_audit::InMemoryAuditWriter;
use tollgate_contracts::{error::GateResult, session::SessionContext};
use tollgate_core::{traits::ApprovalChannel, Dispatcher};
use tollgate_policy::{PatternClassifier, PolicyConfig, TieredApprovalPolicy};

/// Build a dispatcher for `session` from `config`.
///
/// `customize` runs before the dispatcher takes ownership, so callers can
/// register closure assessors or rules on top of the declarative ones.
/// Returns the audit handle alongside; it shares the dispatcher's chain.
pub(crate) fn build_gate(
    config: &PolicyConfig,
    channel: Box<dyn ApprovalChannel>,
    session: SessionContext,
    timeout: Duration,
    customize: impl FnOnce(&mut PatternClassifier, &mut TieredApprovalPolicy),
) -> GateResult<(Dispatcher, InMemoryAuditWriter)> {
    let (mut classifier, mut policy) = tollgate_policy::load(config)?;
    customize(&mut classifier, &mut policy);

    let audit = InMemoryAuditWriter::new(session.session_id.clone());
    let dispatcher = Dispatcher::new(
        Box::new(classifier),
        Box::new(policy),
        channel,
        Box::new(audit.clone()),
        session,
    )
    .with_approval_timeout(timeout);

    Ok((dispatcher, audit))
}
