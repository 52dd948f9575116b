//! Policy configuration schema and declarative rules.
//!
//! A `PolicyConfig` is deserialized from TOML. Every key is optional; an
//! empty document yields the built-in defaults:
//!
//! ```toml
//! default_tier = "medium"
//! auto_deny = ["critical"]
//!
//! [require_approval]
//! low = false
//! medium = true
//!
//! [[patterns]]
//! tier = "critical"
//! patterns = ['rm\s+-rf\s+/', 'DROP\s+DATABASE']
//!
//! [[assessors]]
//! id = "tmp-writes"
//! action = "write_file"
//! param = "filepath"
//! prefix = "/tmp"
//! tier = "low"
//!
//! [[auto_approve]]
//! id = "read-only"
//! actions = ["read_file", "list_directory", "analyze_data"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tollgate_contracts::{
    action::Action,
    error::{GateError, GateResult},
    risk::RiskTier,
};
use tollgate_core::traits::{AutoApproveRule, RiskAssessor};

// ── Built-in defaults ─────────────────────────────────────────────────────────

const CRITICAL_PATTERNS: &[&str] = &[r"rm\s+-rf\s+/", r"format\s+c:", r"del.*\*.*", r"DROP\s+DATABASE"];

const HIGH_PATTERNS: &[&str] = &[
    r"rm\s+",
    r"delete.*file",
    r"execute.*code",
    r"shell.*command",
    r"subprocess",
    r"eval\(",
    r"exec\(",
];

const MEDIUM_PATTERNS: &[&str] = &[
    r"write.*file",
    r"modify.*config",
    r"network.*request",
    r"http.*request",
    r"install.*package",
];

const LOW_PATTERNS: &[&str] = &[r"read.*file", r"analyze.*data", r"calculate", r"search", r"list.*dir"];

fn builtin_patterns() -> Vec<PatternSet> {
    [
        (RiskTier::Critical, CRITICAL_PATTERNS),
        (RiskTier::High, HIGH_PATTERNS),
        (RiskTier::Medium, MEDIUM_PATTERNS),
        (RiskTier::Low, LOW_PATTERNS),
    ]
    .into_iter()
    .map(|(tier, patterns)| PatternSet {
        tier,
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
    })
    .collect()
}

fn builtin_auto_deny() -> Vec<RiskTier> {
    vec![RiskTier::Critical]
}

fn builtin_require_approval() -> BTreeMap<String, bool> {
    BTreeMap::from([
        ("low".to_string(), false),
        ("medium".to_string(), true),
        ("high".to_string(), true),
        ("critical".to_string(), true),
    ])
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// An ordered list of regex patterns that all yield the same tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    pub tier: RiskTier,
    /// Regexes tested in declaration order, case-insensitively.
    pub patterns: Vec<String>,
}

/// The top-level structure deserialized from a TOML policy file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Tier assigned when no assessor or pattern matches.
    #[serde(default)]
    pub default_tier: RiskTier,

    /// Tiers that are denied without asking anyone.
    #[serde(default = "builtin_auto_deny")]
    pub auto_deny: Vec<RiskTier>,

    /// Tier name → whether a human must approve. Entries override the
    /// built-in table one by one; keys must be tier names.
    #[serde(default = "builtin_require_approval")]
    pub require_approval: BTreeMap<String, bool>,

    /// Pattern table. When present it replaces the built-in table entirely.
    #[serde(default = "builtin_patterns")]
    pub patterns: Vec<PatternSet>,

    /// Declarative assessors, run in declaration order before the patterns.
    #[serde(default)]
    pub assessors: Vec<PathPrefixAssessor>,

    /// Declarative auto-approve rules, run in declaration order.
    #[serde(default)]
    pub auto_approve: Vec<ActionListRule>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_tier: RiskTier::default(),
            auto_deny: builtin_auto_deny(),
            require_approval: builtin_require_approval(),
            patterns: builtin_patterns(),
            assessors: Vec::new(),
            auto_approve: Vec::new(),
        }
    }
}

impl PolicyConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `GateError::ConfigError` if the TOML is malformed or does not
    /// match the expected schema.
    pub fn from_toml_str(s: &str) -> GateResult<Self> {
        toml::from_str(s).map_err(|e| GateError::config(format!("failed to parse policy TOML: {e}")))
    }

    /// Read the file at `path` and parse it as TOML policy configuration.
    pub fn from_file(path: &Path) -> GateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GateError::config(format!("failed to read policy file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// The approval-requirement table with tier names resolved, merged over
    /// the built-in table.
    pub fn approval_table(&self) -> GateResult<BTreeMap<RiskTier, bool>> {
        let mut table: BTreeMap<RiskTier, bool> = BTreeMap::new();
        for (name, required) in builtin_require_approval().into_iter().chain(self.require_approval.clone()) {
            let tier: RiskTier = name.parse()?;
            table.insert(tier, required);
        }
        Ok(table)
    }
}

// ── Declarative rules ─────────────────────────────────────────────────────────

/// Assigns `tier` when the action is `action` and its string parameter
/// `param` starts with `prefix`.
///
/// ```toml
/// [[assessors]]
/// id = "tmp-writes"
/// action = "write_file"
/// param = "filepath"
/// prefix = "/tmp"
/// tier = "low"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPrefixAssessor {
    /// Stable identifier used in log lines.
    pub id: String,
    pub action: String,
    pub param: String,
    pub prefix: String,
    pub tier: RiskTier,
}

impl RiskAssessor for PathPrefixAssessor {
    fn assess(&self, action: &Action) -> GateResult<Option<RiskTier>> {
        if action.name != self.action {
            return Ok(None);
        }
        let hit = action
            .param_str(&self.param)
            .is_some_and(|value| value.starts_with(&self.prefix));
        Ok(hit.then_some(self.tier))
    }
}

/// Auto-approves any action whose name is listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionListRule {
    pub id: String,
    pub actions: Vec<String>,
}

impl AutoApproveRule for ActionListRule {
    fn evaluate(&self, action: &Action) -> GateResult<bool> {
        Ok(self.actions.iter().any(|name| *name == action.name))
    }
}
