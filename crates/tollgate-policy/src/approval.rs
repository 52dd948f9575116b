//! Tiered approval policy.
//!
//! `TieredApprovalPolicy` implements the `ApprovalPolicy` trait:
//!
//! 1. Tier in the auto-deny set → `AutoDeny`. Terminal, never overridden.
//! 2. First auto-approve rule returning true → `AutoApprove`.
//! 3. Approval table: `true` → `RequireApproval`, `false` → `AutoApprove`.
//!    A tier missing from the table requires approval.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use tollgate_contracts::{action::Action, error::GateResult, policy::PolicyVerdict, risk::RiskTier};
use tollgate_core::traits::{ApprovalPolicy, AutoApproveRule};

use crate::rule::PolicyConfig;

/// An `ApprovalPolicy` driven by a tier table and pluggable rules.
pub struct TieredApprovalPolicy {
    auto_deny: BTreeSet<RiskTier>,
    require_approval: BTreeMap<RiskTier, bool>,
    rules: Vec<Box<dyn AutoApproveRule>>,
}

impl TieredApprovalPolicy {
    /// Policy with the built-in tables and no auto-approve rules.
    pub fn new() -> GateResult<Self> {
        Self::from_config(&PolicyConfig::default())
    }

    /// Build the policy from `config`, including its declarative rules.
    ///
    /// Returns `GateError::ConfigError` when the approval table names an
    /// unknown tier.
    pub fn from_config(config: &PolicyConfig) -> GateResult<Self> {
        let mut policy = Self {
            auto_deny: config.auto_deny.iter().copied().collect(),
            require_approval: config.approval_table()?,
            rules: Vec::new(),
        };
        for rule in &config.auto_approve {
            policy.add_rule(Box::new(rule.clone()));
        }
        Ok(policy)
    }

    /// Register an auto-approve rule. Rules run in registration order.
    pub fn add_rule(&mut self, rule: Box<dyn AutoApproveRule>) {
        self.rules.push(rule);
    }

    pub fn set_requires_approval(&mut self, tier: RiskTier, required: bool) {
        self.require_approval.insert(tier, required);
    }

    /// Drop `tier` from the approval table so it falls back to asking a human.
    pub fn clear_requires_approval(&mut self, tier: RiskTier) {
        self.require_approval.remove(&tier);
    }

    pub fn set_auto_deny(&mut self, tiers: impl IntoIterator<Item = RiskTier>) {
        self.auto_deny = tiers.into_iter().collect();
    }

    pub fn is_auto_denied(&self, tier: RiskTier) -> bool {
        self.auto_deny.contains(&tier)
    }
}

impl ApprovalPolicy for TieredApprovalPolicy {
    fn decide(&self, tier: RiskTier, action: &Action) -> GateResult<PolicyVerdict> {
        if self.auto_deny.contains(&tier) {
            return Ok(PolicyVerdict::AutoDeny);
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.evaluate(action)? {
                debug!(action = %action.name, rule_index = index, "auto-approve rule matched");
                return Ok(PolicyVerdict::AutoApprove);
            }
        }

        let verdict = match self.require_approval.get(&tier) {
            Some(false) => PolicyVerdict::AutoApprove,
            Some(true) | None => PolicyVerdict::RequireApproval,
        };
        Ok(verdict)
    }
}
