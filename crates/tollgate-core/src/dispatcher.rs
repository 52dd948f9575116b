//! The TOLLGATE dispatcher: the approval-gated action runner.
//!
//! The dispatcher enforces the gate's execution model:
//!
//!   Submitted → Classified → PolicyEvaluated → {Executed | AwaitingApproval → (Executed | Rejected) | AutoDenied}
//!
//! The security invariant is absolute: `ActionExecutor::execute()` is called
//! if and only if the policy returns `AutoApprove`, or the policy returns
//! `RequireApproval` and the channel returns `Approved`. The code path to
//! `execute()` is only reachable through those two branches.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use tollgate_contracts::{
    action::{Action, DispatchId, Parameters},
    approval::{ApprovalOutcome, ApprovalRequest},
    error::{GateError, GateResult},
    execution::{ActionResult, DecisionRecord},
    policy::PolicyVerdict,
    risk::RiskTier,
    session::SessionContext,
};

use crate::traits::{ActionExecutor, ApprovalChannel, ApprovalPolicy, AuditWriter, RiskClassifier};

/// How long a dispatch waits for a human before resolving to `TimedOut`.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(300);

/// The central dispatcher for one agent session.
///
/// Owns the trusted components (classifier, policy, channel, audit) and the
/// session identity. `dispatch` takes `&self`, so one dispatcher can serve
/// many concurrent actions; nothing inside it is mutated after construction.
pub struct Dispatcher {
    classifier: Box<dyn RiskClassifier>,
    policy: Box<dyn ApprovalPolicy>,
    channel: Box<dyn ApprovalChannel>,
    audit: Box<dyn AuditWriter>,
    session: SessionContext,
    approval_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with the default 300-second approval timeout.
    pub fn new(
        classifier: Box<dyn RiskClassifier>,
        policy: Box<dyn ApprovalPolicy>,
        channel: Box<dyn ApprovalChannel>,
        audit: Box<dyn AuditWriter>,
        session: SessionContext,
    ) -> Self {
        Self {
            classifier,
            policy,
            channel,
            audit,
            session,
            approval_timeout: DEFAULT_APPROVAL_TIMEOUT,
        }
    }

    /// Override how long each approval round-trip may take.
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn approval_timeout(&self) -> Duration {
        self.approval_timeout
    }

    /// Tell the approver a session has started. Failures are logged and dropped.
    pub fn begin_session(&self) {
        info!(session_id = %self.session.session_id, "session starting");
        if let Err(e) = self.channel.announce_start(&self.session) {
            debug!(session_id = %self.session.session_id, error = %e, "session start notification failed");
        }
    }

    /// Tell the approver the session ended and finalize the audit log.
    ///
    /// Neither failure is surfaced; shutdown must always complete.
    pub fn end_session(&self) {
        info!(session_id = %self.session.session_id, "session ending");
        if let Err(e) = self.channel.announce_end(&self.session) {
            debug!(session_id = %self.session.session_id, error = %e, "session end notification failed");
        }
        if let Err(e) = self.audit.finalize(&self.session.session_id) {
            error!(session_id = %self.session.session_id, error = %e, "audit finalize failed");
        }
    }

    /// Submit an action by name and parameters.
    ///
    /// See [`Dispatcher::dispatch_action`].
    pub fn dispatch(
        &self,
        name: impl Into<String>,
        parameters: Parameters,
        executor: &dyn ActionExecutor,
    ) -> GateResult<ActionResult> {
        let action = Action::new(name, parameters);
        self.dispatch_action(&action, executor)
    }

    /// Run one action through the gate.
    ///
    /// # Pipeline
    ///
    /// 1. `classifier.classify()` → tier
    /// 2. `policy.decide()` → verdict
    /// 3. `AutoDeny` → rejected result, executor never called
    /// 4. `AutoApprove` → call the executor
    /// 5. `RequireApproval` → one channel round-trip; `Approved` calls the
    ///    executor, every other outcome is a rejected result
    /// 6. Write one `DecisionRecord` to the audit log
    ///
    /// # Errors
    ///
    /// Only `GateError::ConfigError` from classification or policy evaluation
    /// escapes. Denials, timeouts, channel failures and executor failures are
    /// all valid `ActionResult`s.
    pub fn dispatch_action(
        &self,
        action: &Action,
        executor: &dyn ActionExecutor,
    ) -> GateResult<ActionResult> {
        let dispatch_id = DispatchId::new();

        debug!(
            dispatch_id = %dispatch_id,
            session_id = %self.session.session_id,
            action = %action.name,
            "dispatch submitted"
        );

        // ── Step 1: Classification ───────────────────────────────────────────
        let tier = self.classifier.classify(action).inspect_err(|e| {
            error!(dispatch_id = %dispatch_id, action = %action.name, error = %e, "classification failed");
        })?;

        info!(dispatch_id = %dispatch_id, action = %action.name, tier = %tier, "action classified");

        // ── Step 2: Policy evaluation ────────────────────────────────────────
        let verdict = self.policy.decide(tier, action).inspect_err(|e| {
            error!(dispatch_id = %dispatch_id, action = %action.name, error = %e, "policy evaluation failed");
        })?;

        // ── Step 3: Gate ─────────────────────────────────────────────────────
        let (result, outcome) = match verdict {
            PolicyVerdict::AutoDeny => {
                warn!(
                    dispatch_id = %dispatch_id,
                    action = %action.name,
                    tier = %tier,
                    "action auto-denied"
                );
                (
                    ActionResult::rejected(format!("auto-denied due to {tier} risk")),
                    None,
                )
            }

            PolicyVerdict::AutoApprove => {
                info!(dispatch_id = %dispatch_id, action = %action.name, "action auto-approved");
                (self.execute(dispatch_id, action, executor), None)
            }

            PolicyVerdict::RequireApproval => {
                let outcome = self.await_approval(dispatch_id, action);
                let result = match outcome.denial_message() {
                    None => self.execute(dispatch_id, action, executor),
                    Some(message) => ActionResult::rejected(message),
                };
                (result, Some(outcome))
            }
        };

        // ── Step 4: Record the decision ──────────────────────────────────────
        self.record(dispatch_id, action, tier, verdict, outcome, &result);

        Ok(result)
    }

    /// Block on the approval channel for this dispatch.
    fn await_approval(&self, dispatch_id: DispatchId, action: &Action) -> ApprovalOutcome {
        info!(
            dispatch_id = %dispatch_id,
            action = %action.name,
            timeout_secs = self.approval_timeout.as_secs_f64(),
            "awaiting approval"
        );

        let request = ApprovalRequest::new(dispatch_id, action.clone(), &self.session);
        let outcome = self.channel.request(&request, self.approval_timeout);

        match &outcome {
            ApprovalOutcome::Approved => {
                info!(dispatch_id = %dispatch_id, action = %action.name, "action approved by user");
            }
            ApprovalOutcome::Denied => {
                info!(dispatch_id = %dispatch_id, action = %action.name, "action denied by user");
            }
            ApprovalOutcome::TimedOut => {
                warn!(dispatch_id = %dispatch_id, action = %action.name, "approval timed out");
            }
            ApprovalOutcome::ChannelUnavailable { reason } => {
                warn!(dispatch_id = %dispatch_id, action = %action.name, reason = %reason, "approval channel unavailable");
            }
            ApprovalOutcome::ChannelError { reason } => {
                warn!(dispatch_id = %dispatch_id, action = %action.name, reason = %reason, "approval channel error");
            }
        }

        outcome
    }

    /// Call the executor. Only reachable after the gate has let the action through.
    ///
    /// Executor errors and panics both become a failed-but-approved result.
    fn execute(
        &self,
        dispatch_id: DispatchId,
        action: &Action,
        executor: &dyn ActionExecutor,
    ) -> ActionResult {
        debug!(dispatch_id = %dispatch_id, action = %action.name, "calling executor");

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            executor.execute(&action.name, &action.parameters)
        }));

        match attempt {
            Ok(Ok(value)) => ActionResult::executed(value),
            Ok(Err(e)) => {
                let message = match e {
                    GateError::ExecutionFailed { reason } => reason,
                    other => other.to_string(),
                };
                warn!(dispatch_id = %dispatch_id, action = %action.name, error = %message, "executor failed");
                ActionResult::execution_failed(message)
            }
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic payload".to_string()
                };
                warn!(dispatch_id = %dispatch_id, action = %action.name, panic = %message, "executor panicked");
                ActionResult::execution_failed(format!("executor panicked: {message}"))
            }
        }
    }

    /// Write the decision record. A failed write is logged, never surfaced:
    /// the action has already been decided (and possibly executed).
    fn record(
        &self,
        dispatch_id: DispatchId,
        action: &Action,
        tier: RiskTier,
        verdict: PolicyVerdict,
        outcome: Option<ApprovalOutcome>,
        result: &ActionResult,
    ) {
        let record = DecisionRecord {
            dispatch_id,
            session_id: self.session.session_id.clone(),
            action: action.clone(),
            tier,
            verdict,
            outcome,
            success: result.success,
            approved: result.approved,
            error: result.error.clone(),
            timestamp: Utc::now(),
        };

        if let Err(e) = self.audit.write(&record) {
            error!(dispatch_id = %dispatch_id, error = %e, "decision record could not be written");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::{json, Value};

    use tollgate_contracts::{
        action::{Action, Parameters},
        approval::{ApprovalOutcome, ApprovalRequest},
        error::{GateError, GateResult},
        execution::DecisionRecord,
        policy::PolicyVerdict,
        risk::RiskTier,
        session::SessionContext,
    };

    use crate::traits::{ActionExecutor, ApprovalChannel, ApprovalPolicy, AuditWriter, RiskClassifier};

    use super::Dispatcher;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }

    /// A classifier that always returns a pre-configured tier (or error).
    struct FixedClassifier {
        tier: Option<RiskTier>,
    }

    impl RiskClassifier for FixedClassifier {
        fn classify(&self, _action: &Action) -> GateResult<RiskTier> {
            self.tier.ok_or_else(|| GateError::config("assessor 'broken' failed"))
        }
    }

    /// A policy that always returns a pre-configured verdict (or error).
    struct FixedPolicy {
        verdict: Option<PolicyVerdict>,
    }

    impl ApprovalPolicy for FixedPolicy {
        fn decide(&self, _tier: RiskTier, _action: &Action) -> GateResult<PolicyVerdict> {
            self.verdict.ok_or_else(|| GateError::config("auto-approve rule 'broken' failed"))
        }
    }

    /// A channel that records every request and answers with a fixed outcome.
    struct SpyChannel {
        outcome: ApprovalOutcome,
        requests: Arc<Mutex<Vec<(ApprovalRequest, Duration)>>>,
        announcements: Arc<Mutex<Vec<&'static str>>>,
        fail_announcements: bool,
    }

    impl SpyChannel {
        fn answering(outcome: ApprovalOutcome) -> Self {
            Self {
                outcome,
                requests: Arc::new(Mutex::new(vec![])),
                announcements: Arc::new(Mutex::new(vec![])),
                fail_announcements: false,
            }
        }

        fn announce(&self, which: &'static str) -> GateResult<()> {
            self.announcements.lock().unwrap().push(which);
            if self.fail_announcements {
                Err(GateError::ChannelFailed { reason: "approver not installed".to_string() })
            } else {
                Ok(())
            }
        }
    }

    impl ApprovalChannel for SpyChannel {
        fn request(&self, request: &ApprovalRequest, timeout: Duration) -> ApprovalOutcome {
            self.requests.lock().unwrap().push((request.clone(), timeout));
            self.outcome.clone()
        }

        fn announce_start(&self, _session: &SessionContext) -> GateResult<()> {
            self.announce("start")
        }

        fn announce_end(&self, _session: &SessionContext) -> GateResult<()> {
            self.announce("end")
        }
    }

    /// An audit writer that records every call for later inspection.
    struct MockAudit {
        records: Arc<Mutex<Vec<DecisionRecord>>>,
        finalized: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl MockAudit {
        fn new() -> Self {
            Self {
                records: Arc::new(Mutex::new(vec![])),
                finalized: Arc::new(Mutex::new(vec![])),
                fail: false,
            }
        }
    }

    impl AuditWriter for MockAudit {
        fn write(&self, record: &DecisionRecord) -> GateResult<()> {
            if self.fail {
                return Err(GateError::AuditWriteFailed { reason: "disk full".to_string() });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn finalize(&self, session_id: &str) -> GateResult<()> {
            self.finalized.lock().unwrap().push(session_id.to_string());
            Ok(())
        }
    }

    /// An executor that records every call and replies with a fixed result.
    struct SpyExecutor {
        calls: Mutex<Vec<(String, Parameters)>>,
        reply: fn() -> GateResult<Value>,
    }

    impl SpyExecutor {
        fn ok() -> Self {
            Self { calls: Mutex::new(vec![]), reply: || Ok(json!({ "done": true })) }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(vec![]),
                reply: || Err(GateError::execution("permission denied: /etc/hosts")),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ActionExecutor for SpyExecutor {
        fn execute(&self, name: &str, parameters: &Parameters) -> GateResult<Value> {
            self.calls.lock().unwrap().push((name.to_string(), parameters.clone()));
            (self.reply)()
        }
    }

    fn dispatcher(tier: RiskTier, verdict: PolicyVerdict, channel: SpyChannel, audit: MockAudit) -> Dispatcher {
        Dispatcher::new(
            Box::new(FixedClassifier { tier: Some(tier) }),
            Box::new(FixedPolicy { verdict: Some(verdict) }),
            Box::new(channel),
            Box::new(audit),
            SessionContext::new("test-session", "/work"),
        )
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    /// Core security test: AutoDeny must never reach the executor or the channel.
    #[test]
    fn test_auto_deny_blocks_executor() {
        let channel = SpyChannel::answering(ApprovalOutcome::Approved);
        let requests = channel.requests.clone();
        let audit = MockAudit::new();
        let records = audit.records.clone();

        let gate = dispatcher(RiskTier::Critical, PolicyVerdict::AutoDeny, channel, audit);
        let executor = SpyExecutor::ok();

        let result = gate
            .dispatch("shell_command", params(json!({ "command": "rm -rf /" })), &executor)
            .unwrap();

        assert_eq!(executor.call_count(), 0, "execute() must not be called on AutoDeny");
        assert!(requests.lock().unwrap().is_empty(), "channel must not be asked on AutoDeny");
        assert!(!result.success);
        assert!(!result.approved);
        assert!(result.error.unwrap().starts_with("auto-denied"));

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, PolicyVerdict::AutoDeny);
        assert!(records[0].outcome.is_none());
    }

    /// AutoApprove executes directly and never consults the channel.
    #[test]
    fn test_auto_approve_skips_channel() {
        let channel = SpyChannel::answering(ApprovalOutcome::Denied);
        let requests = channel.requests.clone();

        let gate = dispatcher(RiskTier::Low, PolicyVerdict::AutoApprove, channel, MockAudit::new());
        let executor = SpyExecutor::ok();

        let result = gate
            .dispatch("analyze_data", params(json!({ "data": [1, 2, 3] })), &executor)
            .unwrap();

        assert!(requests.lock().unwrap().is_empty(), "channel must not be asked on AutoApprove");
        assert_eq!(executor.call_count(), 1);
        assert!(result.success && result.approved);
        assert_eq!(result.value, Some(json!({ "done": true })));
    }

    /// An approved request runs the executor exactly once, with the original
    /// name and parameters.
    #[test]
    fn test_approved_executes_once_with_original_arguments() {
        let channel = SpyChannel::answering(ApprovalOutcome::Approved);
        let requests = channel.requests.clone();

        let gate = dispatcher(RiskTier::High, PolicyVerdict::RequireApproval, channel, MockAudit::new())
            .with_approval_timeout(Duration::from_secs(42));
        let executor = SpyExecutor::ok();
        let original = params(json!({ "code": "print('hi')", "language": "python" }));

        let result = gate.dispatch("execute_code", original.clone(), &executor).unwrap();

        assert!(result.success && result.approved);

        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "execute_code");
        assert_eq!(calls[0].1, original);

        // The request carries the session and the configured timeout.
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (request, timeout) = &requests[0];
        assert_eq!(request.action.name, "execute_code");
        assert_eq!(request.action.parameters, original);
        assert_eq!(request.session_id, "test-session");
        assert_eq!(*timeout, Duration::from_secs(42));
    }

    /// Every non-approved outcome blocks the executor and reports approved=false.
    #[test]
    fn test_non_approved_outcomes_block_executor() {
        let outcomes = [
            ApprovalOutcome::Denied,
            ApprovalOutcome::TimedOut,
            ApprovalOutcome::ChannelUnavailable { reason: "afk not found".to_string() },
            ApprovalOutcome::ChannelError { reason: "exit code 1".to_string() },
        ];

        for outcome in outcomes {
            let audit = MockAudit::new();
            let records = audit.records.clone();
            let gate = dispatcher(
                RiskTier::High,
                PolicyVerdict::RequireApproval,
                SpyChannel::answering(outcome.clone()),
                audit,
            );
            let executor = SpyExecutor::ok();

            let result = gate.dispatch("execute_code", Parameters::new(), &executor).unwrap();

            assert_eq!(executor.call_count(), 0, "executor must not run on {outcome}");
            assert!(!result.approved);
            assert!(!result.success);
            assert_eq!(result.error, outcome.denial_message());
            assert_eq!(records.lock().unwrap()[0].outcome, Some(outcome));
        }
    }

    /// Executor failure after approval: approved stays true, message preserved.
    #[test]
    fn test_executor_failure_is_failed_but_approved() {
        let gate = dispatcher(RiskTier::Low, PolicyVerdict::AutoApprove, SpyChannel::answering(ApprovalOutcome::Approved), MockAudit::new());
        let executor = SpyExecutor::failing();

        let result = gate.dispatch("write_file", Parameters::new(), &executor).unwrap();

        assert!(result.approved);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("permission denied: /etc/hosts"));
    }

    /// A panicking executor is contained the same way as a failing one.
    #[test]
    fn test_executor_panic_is_contained() {
        let gate = dispatcher(RiskTier::Low, PolicyVerdict::AutoApprove, SpyChannel::answering(ApprovalOutcome::Approved), MockAudit::new());
        let executor = |_name: &str, _params: &Parameters| -> GateResult<Value> {
            panic!("index out of bounds");
        };

        let result = gate.dispatch("analyze_data", Parameters::new(), &executor).unwrap();

        assert!(result.approved);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("index out of bounds"));
    }

    /// Classification errors are configuration faults: they escape dispatch,
    /// nothing runs, nothing is recorded.
    #[test]
    fn test_classifier_error_propagates() {
        let audit = MockAudit::new();
        let records = audit.records.clone();
        let gate = Dispatcher::new(
            Box::new(FixedClassifier { tier: None }),
            Box::new(FixedPolicy { verdict: Some(PolicyVerdict::AutoApprove) }),
            Box::new(SpyChannel::answering(ApprovalOutcome::Approved)),
            Box::new(audit),
            SessionContext::new("s", "/work"),
        );
        let executor = SpyExecutor::ok();

        match gate.dispatch("analyze_data", Parameters::new(), &executor) {
            Err(GateError::ConfigError { reason }) => assert!(reason.contains("broken")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
        assert_eq!(executor.call_count(), 0);
        assert!(records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_policy_error_propagates() {
        let gate = Dispatcher::new(
            Box::new(FixedClassifier { tier: Some(RiskTier::Low) }),
            Box::new(FixedPolicy { verdict: None }),
            Box::new(SpyChannel::answering(ApprovalOutcome::Approved)),
            Box::new(MockAudit::new()),
            SessionContext::new("s", "/work"),
        );
        let executor = SpyExecutor::ok();

        let err = gate.dispatch("analyze_data", Parameters::new(), &executor).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(executor.call_count(), 0);
    }

    /// A broken audit sink does not change the dispatch result.
    #[test]
    fn test_audit_failure_does_not_change_result() {
        let mut audit = MockAudit::new();
        audit.fail = true;
        let gate = dispatcher(RiskTier::Low, PolicyVerdict::AutoApprove, SpyChannel::answering(ApprovalOutcome::Approved), audit);
        let executor = SpyExecutor::ok();

        let result = gate.dispatch("analyze_data", Parameters::new(), &executor).unwrap();
        assert!(result.success && result.approved);
    }

    /// Session notifications are best-effort and end_session seals the audit log.
    #[test]
    fn test_session_notifications_are_swallowed() {
        let mut channel = SpyChannel::answering(ApprovalOutcome::Approved);
        channel.fail_announcements = true;
        let announcements = channel.announcements.clone();
        let audit = MockAudit::new();
        let finalized = audit.finalized.clone();

        let gate = dispatcher(RiskTier::High, PolicyVerdict::RequireApproval, channel, audit);

        gate.begin_session();
        let result = gate.dispatch("execute_code", Parameters::new(), &SpyExecutor::ok()).unwrap();
        gate.end_session();

        assert!(result.success, "failed notifications must not affect dispatch");
        assert_eq!(*announcements.lock().unwrap(), vec!["start", "end"]);
        assert_eq!(*finalized.lock().unwrap(), vec!["test-session".to_string()]);
    }

    /// Independent dispatches may run concurrently against one dispatcher.
    #[test]
    fn test_concurrent_dispatches_each_get_one_record() {
        let channel = SpyChannel::answering(ApprovalOutcome::Approved);
        let requests = channel.requests.clone();
        let audit = MockAudit::new();
        let records = audit.records.clone();
        let gate = dispatcher(RiskTier::Medium, PolicyVerdict::RequireApproval, channel, audit);
        let executor = SpyExecutor::ok();

        std::thread::scope(|s| {
            for i in 0..8 {
                let gate = &gate;
                let executor = &executor;
                s.spawn(move || {
                    let result = gate
                        .dispatch("write_file", params(json!({ "n": i })), executor)
                        .unwrap();
                    assert!(result.success);
                });
            }
        });

        assert_eq!(executor.call_count(), 8);
        assert_eq!(requests.lock().unwrap().len(), 8);

        let records = records.lock().unwrap();
        let ids: std::collections::HashSet<_> = records.iter().map(|r| r.dispatch_id).collect();
        assert_eq!(ids.len(), 8, "every dispatch gets its own id and record");
    }
}
