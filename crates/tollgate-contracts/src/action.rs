//! Action identity types.
//!
//! An `Action` is what an agent asks the gate to let through. It is immutable
//! once submitted; the dispatcher only ever hands out shared references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters attached to an action.
///
/// Keys keep the order the caller inserted them in (`preserve_order`), so
/// the serialized form matches what the caller built and is the same on
/// every call.
pub type Parameters = Map<String, Value>;

/// A named operation an agent wants a host-side executor to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action name, e.g. "shell_command" or "write_file".
    pub name: String,
    /// Arbitrary JSON parameters. The gate never mutates these.
    pub parameters: Parameters,
}

impl Action {
    pub fn new(name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Build an action from a `json!({...})` literal.
    ///
    /// Non-object values produce an action with no parameters.
    pub fn from_json(name: impl Into<String>, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Parameters::new(),
        };
        Self::new(name, parameters)
    }

    /// Return the string parameter `key`, if present and a string.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

/// Unique identifier for a single dispatch.
///
/// Appears in the approval request, every log line of the dispatch, and the
/// decision record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchId(pub uuid::Uuid);

impl DispatchId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DispatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
