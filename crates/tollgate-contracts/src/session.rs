//! Session context shared by every approval request of one embedding agent.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identifies the agent session to the external approver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Stable session identifier, e.g. "ai-4242".
    pub session_id: String,
    /// Working directory the agent operates in.
    pub working_directory: PathBuf,
    /// Where the approver may find (or write) the session transcript.
    pub transcript_path: PathBuf,
}

impl SessionContext {
    /// Build a context for `session_id` rooted at `working_directory`.
    ///
    /// The transcript path defaults to `<tmpdir>/<session_id>.jsonl`.
    pub fn new(session_id: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        let session_id = session_id.into();
        let transcript_path = std::env::temp_dir().join(format!("{session_id}.jsonl"));
        Self {
            session_id,
            working_directory: working_directory.into(),
            transcript_path,
        }
    }

    /// Context for the current process: `ai-<pid>` in the current directory.
    pub fn for_current_process() -> Self {
        Self::named(format!("ai-{}", std::process::id()))
    }

    /// Context with the given id in the current directory.
    ///
    /// Falls back to "." when the current directory cannot be read.
    pub fn named(session_id: impl Into<String>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(session_id, cwd)
    }

    /// Override the transcript location.
    pub fn with_transcript(mut self, transcript_path: impl Into<PathBuf>) -> Self {
        self.transcript_path = transcript_path.into();
        self
    }
}
