//! Scenario: agent session walk-through
//!
//! Replays a short agent session through the gate, from harmless analysis to
//! a destructive shell command:
//!
//!   1. analyze_data        → Low, read-only rule   → auto-approved
//!   2. execute_code        → High                  → human decides
//!   3. write_file (scratch)→ Low via assessor      → auto-approved
//!   4. shell_command echo  → High                  → human decides
//!   5. shell_command ls    → High                  → human decides
//!   6. shell_command rm -rf /                      → Critical, auto-denied
//!
//! The session is announced to the channel before the first step and closed
//! after the last; the audit chain is verified at the end.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Value};

use tollgate_audit::AuditLog;
use tollgate_contracts::{
    action::Action,
    error::GateResult,
    execution::ActionResult,
    risk::RiskTier,
    session::SessionContext,
};
use tollgate_core::traits::ApprovalChannel;
use tollgate_policy::PolicyConfig;

use crate::executor::HostExecutor;
use crate::scenarios::build_gate;

/// File name the walk-through writes inside the scratch directory.
pub const SCRATCH_FILE: &str = "tollgate_agent_test.txt";

/// Everything the walk-through produced.
#[derive(Debug)]
pub struct WalkthroughReport {
    /// One entry per step, in order.
    pub steps: Vec<(Action, ActionResult)>,
    pub log: AuditLog,
    pub integrity_ok: bool,
}

impl WalkthroughReport {
    pub fn approved(&self) -> usize {
        self.steps.iter().filter(|(_, r)| r.approved).count()
    }
}

/// The session's actions. Writes land in `scratch_dir`.
pub fn session_actions(scratch_dir: &Path) -> Vec<Action> {
    let scratch_file = scratch_dir.join(SCRATCH_FILE);
    vec![
        Action::from_json("analyze_data", json!({ "data": [1, 2, 3, 4, 5, 10, 15, 20] })),
        Action::from_json(
            "execute_code",
            json!({ "code": "print('Hello from approved Python code!')", "language": "python" }),
        ),
        Action::from_json(
            "write_file",
            json!({
                "filepath": scratch_file,
                "content": "This file was created by the agent after the gate let it through.",
            }),
        ),
        Action::from_json("shell_command", json!({ "command": "echo 'Hello from approved shell command'" })),
        Action::from_json(
            "shell_command",
            json!({ "command": format!("ls -la {}", scratch_file.display()) }),
        ),
        Action::from_json("shell_command", json!({ "command": "rm -rf /" })),
    ]
}

/// Run the walk-through against `channel`.
///
/// `config` is normally [`crate::agent_policy`]. On top of it, writes inside
/// `scratch_dir` are assessed as Low, so the walk-through behaves the same
/// whether or not the scratch directory lives under `/tmp`.
pub fn run_scenario(
    config: &PolicyConfig,
    channel: Box<dyn ApprovalChannel>,
    session: SessionContext,
    timeout: Duration,
    scratch_dir: &Path,
) -> GateResult<WalkthroughReport> {
    println!("=== Scenario: Agent Session Walk-through ===");
    println!();

    // ── Wire up the gate ──────────────────────────────────────────────────────

    let scratch_prefix: PathBuf = scratch_dir.to_path_buf();
    let (gate, audit) = build_gate(config, channel, session, timeout, |classifier, _| {
        classifier.add_assessor(Box::new(move |action: &Action| {
            let inside = action.name == "write_file"
                && action
                    .param_str("filepath")
                    .is_some_and(|p| Path::new(p).starts_with(&scratch_prefix));
            inside.then_some(RiskTier::Low)
        }));
    })?;

    println!("  Session:          {}", gate.session().session_id);
    println!("  Working dir:      {}", gate.session().working_directory.display());
    println!("  Approval timeout: {}s", gate.approval_timeout().as_secs());
    println!();

    gate.begin_session();

    // ── Dispatch each action ──────────────────────────────────────────────────

    let executor = HostExecutor::new();
    let mut steps = Vec::new();

    for (index, action) in session_actions(scratch_dir).into_iter().enumerate() {
        println!("  Step {}: {} {}", index + 1, action.name, Value::Object(action.parameters.clone()));
        let result = gate.dispatch_action(&action, &executor)?;
        print_result(&result);
        println!();
        steps.push((action, result));
    }

    gate.end_session();

    // ── Verify audit chain integrity ──────────────────────────────────────────

    let integrity_ok = audit.verify_integrity();
    let log = audit.export_log();

    println!(
        "  Audit chain integrity:  {} ({} decision(s) in chain)",
        if integrity_ok { "VERIFIED" } else { "FAILED" },
        log.events.len()
    );
    println!();
    println!("  Walk-through complete.");
    println!();

    Ok(WalkthroughReport { steps, log, integrity_ok })
}

fn print_result(result: &ActionResult) {
    match (result.approved, result.success) {
        (true, true) => {
            println!("    Decision: EXECUTED");
            if let Some(value) = &result.value {
                println!("    Result:   {}", value);
            }
        }
        (true, false) => {
            println!("    Decision: APPROVED, execution failed");
            println!("    Error:    {}", result.error.as_deref().unwrap_or("?"));
        }
        (false, _) => {
            println!("    Decision: BLOCKED");
            println!("    Reason:   {}", result.error.as_deref().unwrap_or("?"));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
