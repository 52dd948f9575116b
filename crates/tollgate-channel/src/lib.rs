//! # tollgate-channel
//!
//! Approval channels for the TOLLGATE runtime.
//!
//! An approval channel carries one `ApprovalRequest` to a human (or a
//! stand-in) and returns exactly one `ApprovalOutcome` within the timeout the
//! dispatcher passes in. Two implementations live here:
//!
//! - [`CommandChannel`]: runs an external approver binary (`afk` by default)
//!   per request and maps its exit code. See [`wire`] for the stdin format.
//! - [`ResponderChannel`]: answers from an in-process function on a worker
//!   thread. Used by tests and by the demo's `--auto` mode.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tollgate_channel::{CommandChannel, CommandChannelConfig};
//!
//! let channel = CommandChannel::new(CommandChannelConfig::default());
//! let outcome = channel.request(&request, Duration::from_secs(300));
//! ```

pub mod command;
pub mod responder;
pub mod wire;

pub use command::{CommandChannel, CommandChannelConfig};
pub use responder::{ResponderChannel, ResponderFn};
