//! # tollgate-core
//!
//! The approval-gated dispatch runtime for TOLLGATE.
//!
//! This crate provides:
//! - The seam traits (`RiskClassifier`, `ApprovalPolicy`, `ApprovalChannel`,
//!   `AuditWriter`, `ActionExecutor`, plus the pluggable `RiskAssessor` and
//!   `AutoApproveRule`)
//! - The `Dispatcher` that wires them together in trust order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tollgate_core::{Dispatcher, traits::{ApprovalChannel, ActionExecutor}};
//! ```

pub mod dispatcher;
pub mod traits;

pub use dispatcher::{Dispatcher, DEFAULT_APPROVAL_TIMEOUT};
