//! Error types for the TOLLGATE dispatch pipeline.
//!
//! Only `ConfigError` is allowed to escape `Dispatcher::dispatch`. Every other
//! variant is recovered locally and folded into a well-formed `ActionResult`
//! or swallowed after logging.

use thiserror::Error;

/// The unified error type for the TOLLGATE crates.
#[derive(Debug, Error)]
pub enum GateError {
    /// Rule, pattern, or policy setup is malformed, or a pluggable assessor
    /// or auto-approve rule failed during evaluation.
    ///
    /// This is fatal: a gate that cannot classify an action must not guess.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The externally supplied executor failed to perform an approved action.
    #[error("execution failed: {reason}")]
    ExecutionFailed { reason: String },

    /// A best-effort notification to the approval channel failed.
    #[error("approval channel failure: {reason}")]
    ChannelFailed { reason: String },

    /// The audit writer could not persist a decision record.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },
}

impl GateError {
    /// Shorthand for building a `ConfigError`.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigError { reason: reason.into() }
    }

    /// Shorthand for building an `ExecutionFailed`.
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed { reason: reason.into() }
    }

    /// True for the only variant that may cross the dispatch boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }
}

/// Convenience alias used throughout the TOLLGATE crates.
pub type GateResult<T> = Result<T, GateError>;
