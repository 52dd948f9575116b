//! # tollgate-contracts
//!
//! Shared types, schemas, and contracts for the TOLLGATE approval gate.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and the error type.

pub mod action;
pub mod approval;
pub mod error;
pub mod execution;
pub mod policy;
pub mod risk;
pub mod session;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use action::{Action, DispatchId, Parameters};
    use approval::{ApprovalOutcome, ApprovalRequest};
    use error::GateError;
    use execution::ActionResult;
    use policy::PolicyVerdict;
    use risk::RiskTier;
    use session::SessionContext;

    // ── RiskTier ─────────────────────────────────────────────────────────────

    #[test]
    fn risk_tier_total_order() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert!(RiskTier::High < RiskTier::Critical);

        let max = [RiskTier::Medium, RiskTier::Critical, RiskTier::Low]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(max, RiskTier::Critical);
    }

    #[test]
    fn risk_tier_descending_starts_at_critical() {
        assert_eq!(RiskTier::DESCENDING[0], RiskTier::Critical);
        assert_eq!(RiskTier::DESCENDING[3], RiskTier::Low);
        assert!(RiskTier::DESCENDING.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn risk_tier_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<RiskTier>().unwrap(), RiskTier::High);
        assert_eq!(" low ".parse::<RiskTier>().unwrap(), RiskTier::Low);

        match "severe".parse::<RiskTier>() {
            Err(GateError::ConfigError { reason }) => assert!(reason.contains("severe")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn risk_tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskTier::Critical).unwrap(), "\"critical\"");
        assert_eq!(RiskTier::default(), RiskTier::Medium);
    }

    // ── PolicyVerdict ────────────────────────────────────────────────────────

    #[test]
    fn policy_verdict_serializes_kebab_case() {
        let json = serde_json::to_string(&PolicyVerdict::RequireApproval).unwrap();
        assert_eq!(json, "\"require-approval\"");
        assert_eq!(PolicyVerdict::AutoDeny.to_string(), "auto-deny");
    }

    // ── Action ───────────────────────────────────────────────────────────────

    #[test]
    fn action_from_json_object() {
        let action = Action::from_json("write_file", json!({ "filepath": "/tmp/x", "size": 3 }));
        assert_eq!(action.name, "write_file");
        assert_eq!(action.param_str("filepath"), Some("/tmp/x"));
        assert_eq!(action.param_str("size"), None);
        assert_eq!(action.param_str("missing"), None);
    }

    #[test]
    fn action_from_non_object_has_no_parameters() {
        let action = Action::from_json("noop", json!([1, 2, 3]));
        assert!(action.parameters.is_empty());
    }

    #[test]
    fn parameter_serialization_keeps_insertion_order() {
        let mut parameters = Parameters::new();
        parameters.insert("filename".to_string(), json!("a.txt"));
        parameters.insert("delete_after".to_string(), json!(true));
        let action = Action::new("cleanup", parameters);

        let text = serde_json::to_string(&action.parameters).unwrap();
        assert_eq!(text, r#"{"filename":"a.txt","delete_after":true}"#);
        assert_eq!(serde_json::to_string(&action.parameters).unwrap(), text);

        let literal = Action::from_json("x", json!({ "b": 1, "a": 2 }));
        assert_eq!(serde_json::to_string(&literal.parameters).unwrap(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn dispatch_ids_are_unique() {
        let ids: std::collections::HashSet<DispatchId> = (0..100).map(|_| DispatchId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    // ── Approval ─────────────────────────────────────────────────────────────

    #[test]
    fn approval_request_copies_session_fields() {
        let session = SessionContext::new("python-agent", "/work").with_transcript("/tmp/t.jsonl");
        let action = Action::from_json("execute_code", json!({ "code": "1 + 1" }));
        let request = ApprovalRequest::new(DispatchId::new(), action.clone(), &session);

        assert_eq!(request.session_id, "python-agent");
        assert_eq!(request.working_directory, std::path::PathBuf::from("/work"));
        assert_eq!(request.transcript_path, std::path::PathBuf::from("/tmp/t.jsonl"));
        assert_eq!(request.action, action);
    }

    #[test]
    fn default_transcript_lives_in_tmpdir() {
        let session = SessionContext::new("s-1", "/work");
        assert_eq!(session.transcript_path, std::env::temp_dir().join("s-1.jsonl"));
    }

    #[test]
    fn only_approved_is_approved() {
        assert!(ApprovalOutcome::Approved.is_approved());
        assert!(ApprovalOutcome::Approved.denial_message().is_none());

        let failures = [
            ApprovalOutcome::Denied,
            ApprovalOutcome::TimedOut,
            ApprovalOutcome::ChannelUnavailable { reason: "afk not found".into() },
            ApprovalOutcome::ChannelError { reason: "exit code 1".into() },
        ];
        for outcome in &failures {
            assert!(!outcome.is_approved());
            assert!(outcome.denial_message().is_some());
        }

        // Distinguishable for reporting.
        let labels: std::collections::HashSet<String> =
            failures.iter().map(|o| o.to_string()).collect();
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn approval_outcome_serializes_with_tag() {
        let outcome = ApprovalOutcome::ChannelUnavailable { reason: "missing".into() };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "channel_unavailable");
        assert_eq!(value["reason"], "missing");
    }

    // ── ActionResult ─────────────────────────────────────────────────────────

    #[test]
    fn action_result_constructors() {
        let ok = ActionResult::executed(json!({ "average": 7.5 }));
        assert!(ok.success && ok.approved);
        assert!(ok.error.is_none());

        let failed = ActionResult::execution_failed("boom");
        assert!(!failed.success && failed.approved);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        let rejected = ActionResult::rejected("user denied action");
        assert!(!rejected.success && !rejected.approved);
        assert!(rejected.value.is_none());
    }

    // ── GateError ────────────────────────────────────────────────────────────

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(GateError::config("bad regex").is_fatal());
        assert!(!GateError::execution("disk full").is_fatal());
        assert!(!GateError::ChannelFailed { reason: "x".into() }.is_fatal());
        assert!(!GateError::AuditWriteFailed { reason: "x".into() }.is_fatal());
    }

    #[test]
    fn error_display_messages() {
        let msg = GateError::config("invalid pattern 'rm\\s+('").to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("invalid pattern"));

        let msg = GateError::AuditWriteFailed { reason: "lock poisoned".into() }.to_string();
        assert!(msg.contains("audit write failed"));
    }
}
