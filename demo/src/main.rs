//! TOLLGATE Reference Agent: Demo CLI
//!
//! Runs the reference agent's scenarios, or a single ad-hoc action, through
//! the approval gate.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- walkthrough --auto deny
//!   cargo run -p demo -- gate-cases
//!   cargo run -p demo -- dispatch shell_command --params '{"command":"ls"}'
//!   cargo run -p demo -- --policy policy.toml --audit-out audit.json walkthrough

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate_audit::{AuditLog, InMemoryAuditWriter};
use tollgate_channel::{CommandChannel, CommandChannelConfig, ResponderChannel};
use tollgate_contracts::{
    approval::ApprovalOutcome,
    error::{GateError, GateResult},
    session::SessionContext,
};
use tollgate_core::{traits::ApprovalChannel, Dispatcher, DEFAULT_APPROVAL_TIMEOUT};
use tollgate_policy::PolicyConfig;
use tollgate_ref_agent::{
    executor::HostExecutor,
    scenarios::{gate_cases, walkthrough},
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// TOLLGATE: approval-gated action dispatch demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "TOLLGATE reference agent demo",
    long_about = "Runs agent actions through the TOLLGATE gate: risk classification,\n\
                  approval policy, the out-of-band approval round-trip, and the\n\
                  hash-chained decision log."
)]
struct Cli {
    /// Policy TOML file. Defaults to the reference agent's embedded policy.
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// External approver binary.
    #[arg(long, global = true, default_value = "afk")]
    approver: String,

    /// Seconds to wait for each approval.
    #[arg(long, global = true, default_value_t = DEFAULT_APPROVAL_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Answer every approval request in-process instead of asking a human.
    #[arg(long, global = true, value_enum)]
    auto: Option<AutoAnswer>,

    /// Write the session's audit log as JSON to this file.
    #[arg(long, global = true)]
    audit_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the walk-through, then the five gate cases.
    RunAll,
    /// Agent session walk-through, from data analysis to `rm -rf /`.
    Walkthrough,
    /// The five gate cases with scripted in-memory approvers.
    GateCases,
    /// Dispatch a single action.
    Dispatch {
        /// Action name, e.g. "shell_command".
        action: String,
        /// Action parameters as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AutoAnswer {
    Approve,
    Deny,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to see every pipeline step.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match &cli.command {
        Command::RunAll => run_all(&cli),
        Command::Walkthrough => run_walkthrough(&cli),
        Command::GateCases => run_gate_cases(),
        Command::Dispatch { action, params } => run_dispatch(&cli, action, params),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn load_policy(cli: &Cli) -> GateResult<PolicyConfig> {
    match &cli.policy {
        Some(path) => PolicyConfig::from_file(path),
        None => tollgate_ref_agent::agent_policy(),
    }
}

fn approval_channel(cli: &Cli) -> Box<dyn ApprovalChannel> {
    match cli.auto {
        Some(AutoAnswer::Approve) => Box::new(ResponderChannel::always(ApprovalOutcome::Approved)),
        Some(AutoAnswer::Deny) => Box::new(ResponderChannel::always(ApprovalOutcome::Denied)),
        None => Box::new(CommandChannel::new(CommandChannelConfig {
            program: cli.approver.clone(),
            ..CommandChannelConfig::default()
        })),
    }
}

fn timeout(cli: &Cli) -> Duration {
    Duration::from_secs(cli.timeout_secs)
}

fn write_audit(cli: &Cli, log: &AuditLog) -> GateResult<()> {
    if let Some(path) = &cli.audit_out {
        log.write_json(path)?;
        info!(path = %path.display(), events = log.events.len(), "audit log written");
        println!("Audit log written to {}", path.display());
    }
    Ok(())
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_all(cli: &Cli) -> GateResult<()> {
    run_walkthrough(cli)?;
    run_gate_cases()
}

fn run_walkthrough(cli: &Cli) -> GateResult<()> {
    let report = walkthrough::run_scenario(
        &load_policy(cli)?,
        approval_channel(cli),
        SessionContext::for_current_process(),
        timeout(cli),
        &std::env::temp_dir(),
    )?;
    write_audit(cli, &report.log)?;

    if !report.integrity_ok {
        return Err(GateError::AuditWriteFailed {
            reason: "audit chain failed verification".to_string(),
        });
    }
    Ok(())
}

fn run_gate_cases() -> GateResult<()> {
    let reports = gate_cases::run_scenario(&HostExecutor::new(), Duration::from_secs(1))?;
    let mismatched = reports
        .iter()
        .filter(|r| r.result.approved != r.case.expect_approved())
        .count();
    println!("{} of {} gate cases behaved as expected.", reports.len() - mismatched, reports.len());
    Ok(())
}

fn run_dispatch(cli: &Cli, action: &str, params: &str) -> GateResult<()> {
    let parameters = match serde_json::from_str::<Value>(params) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(GateError::config(format!("--params must be a JSON object, got {}", other)));
        }
        Err(e) => return Err(GateError::config(format!("invalid --params JSON: {}", e))),
    };

    let (classifier, policy) = tollgate_policy::load(&load_policy(cli)?)?;
    let session = SessionContext::for_current_process();
    let audit = InMemoryAuditWriter::new(session.session_id.clone());

    let gate = Dispatcher::new(
        Box::new(classifier),
        Box::new(policy),
        approval_channel(cli),
        Box::new(audit.clone()),
        session,
    )
    .with_approval_timeout(timeout(cli));

    gate.begin_session();
    let result = gate.dispatch(action, parameters, &HostExecutor::new());
    gate.end_session();
    let result = result?;

    let log = audit.export_log();
    if let Some(record) = log.events.last().map(|e| &e.record) {
        println!("Tier:     {}", record.tier);
        println!("Verdict:  {}", record.verdict);
        if let Some(outcome) = &record.outcome {
            println!("Approver: {}", outcome);
        }
    }
    let rendered = serde_json::to_string_pretty(&result).map_err(|e| GateError::ExecutionFailed {
        reason: format!("failed to render result: {}", e),
    })?;
    println!("{}", rendered);

    write_audit(cli, &log)
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("TOLLGATE: Approval-gated Action Dispatch");
    println!("Reference Agent Demo");
    println!("=========================================");
    println!();
    println!("Gate pipeline per action:");
    println!("  [1] Classifier assigns a risk tier (assessors, then patterns Critical → Low)");
    println!("  [2] Policy decides: auto-deny, auto-approve, or require approval");
    println!("  [3] Approval channel asks a human, bounded by the timeout");
    println!("  [4] Executor runs ONLY on auto-approve or an explicit approval");
    println!("  [5] One decision record appended to the SHA-256 audit chain");
    println!();
}
