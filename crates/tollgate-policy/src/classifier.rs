//! Pattern-table risk classifier.
//!
//! `PatternClassifier` implements the `RiskClassifier` trait from
//! tollgate-core. Evaluation order is part of the contract:
//!
//! 1. Run registered assessors in registration order; the first one that
//!    returns a tier wins.
//! 2. Build `"<name> <json(parameters)>"`, lowercase it, and test it against
//!    the pattern table from `Critical` down to `Low`. Within a tier, the
//!    first matching pattern in declaration order wins.
//! 3. Otherwise return the default tier.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use tollgate_contracts::{
    action::Action,
    error::{GateError, GateResult},
    risk::RiskTier,
};
use tollgate_core::traits::{RiskAssessor, RiskClassifier};

use crate::rule::{PatternSet, PolicyConfig};

/// Which step of the evaluation order produced a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The assessor at this registration index fired.
    Assessor { index: usize, tier: RiskTier },
    /// A built-in or configured pattern matched.
    Pattern { tier: RiskTier, pattern: String },
    /// Nothing matched.
    Default { tier: RiskTier },
}

impl Classification {
    pub fn tier(&self) -> RiskTier {
        match self {
            Classification::Assessor { tier, .. }
            | Classification::Pattern { tier, .. }
            | Classification::Default { tier } => *tier,
        }
    }
}

/// A `RiskClassifier` built from a pattern table plus pluggable assessors.
///
/// Configure with `add_assessor` at setup; `classify` only reads.
pub struct PatternClassifier {
    assessors: Vec<Box<dyn RiskAssessor>>,
    /// Compiled patterns, sorted from the highest tier down.
    table: Vec<(RiskTier, Vec<Regex>)>,
    default_tier: RiskTier,
}

impl PatternClassifier {
    /// Classifier with the built-in pattern table and no assessors.
    pub fn new() -> GateResult<Self> {
        Self::from_config(&PolicyConfig::default())
    }

    /// Compile the pattern table and declarative assessors from `config`.
    ///
    /// Returns `GateError::ConfigError` for any pattern that is not a valid regex.
    pub fn from_config(config: &PolicyConfig) -> GateResult<Self> {
        let mut classifier = Self {
            assessors: Vec::new(),
            table: compile_table(&config.patterns)?,
            default_tier: config.default_tier,
        };
        for assessor in &config.assessors {
            classifier.add_assessor(Box::new(assessor.clone()));
        }
        Ok(classifier)
    }

    /// Register an assessor. Assessors run in registration order.
    pub fn add_assessor(&mut self, assessor: Box<dyn RiskAssessor>) {
        self.assessors.push(assessor);
    }

    pub fn default_tier(&self) -> RiskTier {
        self.default_tier
    }

    /// Classify and report which rule decided.
    pub fn explain(&self, action: &Action) -> GateResult<Classification> {
        for (index, assessor) in self.assessors.iter().enumerate() {
            if let Some(tier) = assessor.assess(action)? {
                return Ok(Classification::Assessor { index, tier });
            }
        }

        let text = classification_text(action)?;
        for (tier, patterns) in &self.table {
            if let Some(re) = patterns.iter().find(|re| re.is_match(&text)) {
                return Ok(Classification::Pattern {
                    tier: *tier,
                    pattern: re.as_str().to_string(),
                });
            }
        }

        Ok(Classification::Default { tier: self.default_tier })
    }
}

impl RiskClassifier for PatternClassifier {
    fn classify(&self, action: &Action) -> GateResult<RiskTier> {
        let classification = self.explain(action)?;
        debug!(action = %action.name, decided_by = ?classification, "risk classified");
        Ok(classification.tier())
    }
}

/// The text blob patterns are matched against.
pub fn classification_text(action: &Action) -> GateResult<String> {
    let params = serde_json::to_string(&action.parameters)
        .map_err(|e| GateError::config(format!("parameters of '{}' are not serializable: {e}", action.name)))?;
    Ok(format!("{} {}", action.name, params).to_lowercase())
}

/// Compile every pattern set and order them strictly by descending tier.
///
/// Sets that share a tier are concatenated in declaration order.
fn compile_table(sets: &[PatternSet]) -> GateResult<Vec<(RiskTier, Vec<Regex>)>> {
    let mut table = Vec::new();
    for tier in RiskTier::DESCENDING {
        let mut compiled = Vec::new();
        for set in sets.iter().filter(|set| set.tier == tier) {
            for pattern in &set.patterns {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        GateError::config(format!("invalid {tier} risk pattern '{pattern}': {e}"))
                    })?;
                compiled.push(re);
            }
        }
        if !compiled.is_empty() {
            table.push((tier, compiled));
        }
    }
    Ok(table)
}
