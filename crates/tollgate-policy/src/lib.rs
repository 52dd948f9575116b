//! # tollgate-policy
//!
//! Risk classification and approval policy for the TOLLGATE runtime.
//!
//! ## Overview
//!
//! This crate provides [`PatternClassifier`], which implements
//! [`RiskClassifier`](tollgate_core::traits::RiskClassifier), and
//! [`TieredApprovalPolicy`], which implements
//! [`ApprovalPolicy`](tollgate_core::traits::ApprovalPolicy). Both are built
//! from a [`PolicyConfig`] that is either the built-in default or loaded from
//! TOML.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tollgate_policy::{load, PolicyConfig};
//!
//! let config = PolicyConfig::from_file(Path::new("policies/agent.toml"))?;
//! let (classifier, policy) = load(&config)?;
//! // Pass both to `tollgate_core::Dispatcher::new(...)`.
//! ```

pub mod approval;
pub mod classifier;
pub mod rule;

pub use approval::TieredApprovalPolicy;
pub use classifier::{classification_text, Classification, PatternClassifier};
pub use rule::{ActionListRule, PathPrefixAssessor, PatternSet, PolicyConfig};

use tollgate_contracts::error::GateResult;

/// Build the classifier and policy described by `config`.
///
/// All configuration errors surface here, before any dispatch.
pub fn load(config: &PolicyConfig) -> GateResult<(PatternClassifier, TieredApprovalPolicy)> {
    Ok((PatternClassifier::from_config(config)?, TieredApprovalPolicy::from_config(config)?))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
