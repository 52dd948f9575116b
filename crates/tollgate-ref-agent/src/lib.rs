//! # tollgate-ref-agent
//!
//! Reference embedding of the TOLLGATE approval gate in a small host agent.
//!
//! - [`executor::HostExecutor`] performs the agent's actions (data analysis,
//!   file reads and writes, shell commands, code execution) once the gate has
//!   let them through.
//! - [`scenarios::walkthrough`] runs the agent's demo session end to end
//!   against any approval channel and prints each pipeline step.
//! - [`AGENT_POLICY`] is the agent's policy: built-in patterns, `/tmp`
//!   writes assessed as low risk, read-only actions auto-approved.

pub mod executor;
pub mod scenarios;

use tollgate_contracts::error::GateResult;
use tollgate_policy::PolicyConfig;

/// The reference agent's embedded policy file.
pub const AGENT_POLICY: &str = include_str!("../policies/agent.toml");

/// Parse [`AGENT_POLICY`].
pub fn agent_policy() -> GateResult<PolicyConfig> {
    PolicyConfig::from_toml_str(AGENT_POLICY)
}

#[cfg(test)]
mod tests {
    use tollgate_contracts::risk::RiskTier;

    #[test]
    fn test_embedded_policy_loads() {
        let config = super::agent_policy().unwrap();
        assert_eq!(config.auto_deny, vec![RiskTier::Critical]);
        assert_eq!(config.assessors.len(), 1);
        assert_eq!(config.auto_approve[0].actions.len(), 3);
        assert!(tollgate_policy::load(&config).is_ok());
    }
}
