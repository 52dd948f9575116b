//! Scenario: the five gate cases
//!
//! Runs one action per case through a gate built from the default policy,
//! with an in-memory approver scripted for that case:
//!
//!   - Safe analysis      analyze_data          → Low, auto-approved, executed
//!   - Destructive shell  shell_command rm -rf / → Critical, auto-denied
//!   - Code, denied       execute_code          → approver says no
//!   - Code, approved     execute_code          → approver says yes, executed
//!   - Silent approver    execute_code          → no answer, times out
//!
//! Each case gets a fresh gate, so each audit log holds exactly one decision.

use std::time::{Duration, Instant};

use serde_json::json;

use tollgate_contracts::{
    action::Action,
    approval::ApprovalOutcome,
    error::GateResult,
    execution::{ActionResult, DecisionRecord},
    session::SessionContext,
};
use tollgate_core::traits::ActionExecutor;
use tollgate_channel::ResponderChannel;
use tollgate_policy::PolicyConfig;

use crate::scenarios::build_gate;

/// One scripted dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCase {
    SafeAnalysis,
    DestructiveShell,
    CodeDenied,
    CodeApproved,
    SilentApprover,
}

impl GateCase {
    pub const ALL: [GateCase; 5] = [
        GateCase::SafeAnalysis,
        GateCase::DestructiveShell,
        GateCase::CodeDenied,
        GateCase::CodeApproved,
        GateCase::SilentApprover,
    ];

    pub fn title(self) -> &'static str {
        match self {
            GateCase::SafeAnalysis => "safe analysis",
            GateCase::DestructiveShell => "destructive shell command",
            GateCase::CodeDenied => "code execution, approver denies",
            GateCase::CodeApproved => "code execution, approver approves",
            GateCase::SilentApprover => "code execution, approver never answers",
        }
    }

    pub fn action(self) -> Action {
        match self {
            GateCase::SafeAnalysis => {
                Action::from_json("analyze_data", json!({ "data": [1, 2, 3, 4, 5, 10, 15, 20] }))
            }
            GateCase::DestructiveShell => Action::from_json("shell_command", json!({ "command": "rm -rf /" })),
            GateCase::CodeDenied | GateCase::CodeApproved | GateCase::SilentApprover => Action::from_json(
                "execute_code",
                json!({ "code": "echo 'Hello from approved code'", "language": "sh" }),
            ),
        }
    }

    /// The in-memory approver for this case.
    pub fn approver(self) -> ResponderChannel {
        match self {
            GateCase::CodeDenied => ResponderChannel::always(ApprovalOutcome::Denied),
            GateCase::SilentApprover => ResponderChannel::silent(),
            _ => ResponderChannel::always(ApprovalOutcome::Approved),
        }
    }

    /// Whether the executor should run in this case.
    pub fn expect_approved(self) -> bool {
        matches!(self, GateCase::SafeAnalysis | GateCase::CodeApproved)
    }
}

/// What one case produced.
#[derive(Debug)]
pub struct CaseReport {
    pub case: GateCase,
    pub result: ActionResult,
    /// The single audit record of the dispatch.
    pub record: Option<DecisionRecord>,
    /// How many times the approver was asked.
    pub approver_requests: usize,
    pub elapsed: Duration,
}

/// Run one case with the default policy and the given approval timeout.
pub fn run_case(case: GateCase, executor: &dyn ActionExecutor, timeout: Duration) -> GateResult<CaseReport> {
    let approver = case.approver();
    let (gate, audit) = build_gate(
        &PolicyConfig::default(),
        Box::new(approver.clone()),
        SessionContext::named("ai-gate-cases"),
        timeout,
        |_, _| {},
    )?;

    let started = Instant::now();
    let result = gate.dispatch_action(&case.action(), executor)?;
    let elapsed = started.elapsed();

    let record = audit.export_log().events.pop().map(|e| e.record);

    Ok(CaseReport {
        case,
        result,
        record,
        approver_requests: approver.request_count(),
        elapsed,
    })
}

/// Run every case and print the outcome of each.
pub fn run_scenario(executor: &dyn ActionExecutor, timeout: Duration) -> GateResult<Vec<CaseReport>> {
    println!("=== Scenario: Gate Cases ===");
    println!();

    let mut reports = Vec::new();
    for case in GateCase::ALL {
        let report = run_case(case, executor, timeout)?;

        println!("  Case: {}", case.title());
        if let Some(record) = &report.record {
            println!("    Tier:     {}", record.tier);
            println!("    Verdict:  {}", record.verdict);
            if let Some(outcome) = &record.outcome {
                println!("    Approver: {}", outcome);
            }
        }
        println!(
            "    Result:   approved={} success={} ({:.2}s)",
            report.result.approved,
            report.result.success,
            report.elapsed.as_secs_f64()
        );
        if let Some(error) = &report.result.error {
            println!("    Message:  {}", error);
        }
        let matched = report.result.approved == case.expect_approved();
        println!("    Expected: {}", if matched { "MATCH" } else { "MISMATCH" });
        println!();

        reports.push(report);
    }

    Ok(reports)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
