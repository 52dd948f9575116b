//! Policy verdict type.
//!
//! The approval policy maps a `RiskTier` plus the action to one of three
//! verdicts. Only `AutoApprove` reaches the executor without a human.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The decision emitted by the approval policy for a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyVerdict {
    /// The action proceeds without asking anyone.
    AutoApprove,

    /// A human must sign off through the approval channel first.
    RequireApproval,

    /// The action is blocked outright. Terminal; never overridden.
    AutoDeny,
}

impl fmt::Display for PolicyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyVerdict::AutoApprove => "auto-approve",
            PolicyVerdict::RequireApproval => "require-approval",
            PolicyVerdict::AutoDeny => "auto-deny",
        })
    }
}
