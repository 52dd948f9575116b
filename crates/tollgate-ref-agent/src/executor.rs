//! Host-side executor for the reference agent.
//!
//! `HostExecutor` performs the side effects the gate lets through. It knows
//! nothing about risk or approval: by the time `execute` runs, the dispatcher
//! has already decided. Every failure is reported as
//! `GateError::ExecutionFailed`, which the dispatcher turns into a
//! failed-but-approved result.
//!
//! Supported actions:
//!
//! | action           | parameters                         |
//! |------------------|------------------------------------|
//! | `analyze_data`   | `data: [number]`                   |
//! | `read_file`      | `filepath`                         |
//! | `list_directory` | `path`                             |
//! | `write_file`     | `filepath`, `content`              |
//! | `shell_command`  | `command`                          |
//! | `execute_code`   | `code`, optional `language`        |

use std::path::PathBuf;
use std::process::{Command, Output};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use tollgate_contracts::{
    action::Parameters,
    error::{GateError, GateResult},
};
use tollgate_core::traits::ActionExecutor;

// ── Parameter shapes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AnalyzeData {
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct FilePath {
    filepath: PathBuf,
}

#[derive(Deserialize)]
struct DirPath {
    path: PathBuf,
}

#[derive(Deserialize)]
struct WriteFile {
    filepath: PathBuf,
    content: String,
}

#[derive(Deserialize)]
struct ShellCommand {
    command: String,
}

#[derive(Deserialize)]
struct ExecuteCode {
    code: String,
    #[serde(default)]
    language: Option<String>,
}

fn params<T: DeserializeOwned>(action: &str, parameters: &Parameters) -> GateResult<T> {
    serde_json::from_value(Value::Object(parameters.clone()))
        .map_err(|e| GateError::execution(format!("invalid parameters for '{action}': {e}")))
}

// ── Executor ──────────────────────────────────────────────────────────────────

/// Executes the reference agent's actions on the local host.
#[derive(Debug, Clone)]
pub struct HostExecutor {
    /// Shell used for `shell_command`, invoked as `<shell> -c <command>`.
    pub shell: String,
    /// Interpreter for `execute_code` when no language (or "python") is given.
    pub python: String,
}

impl Default for HostExecutor {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            python: "python3".to_string(),
        }
    }
}

impl HostExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn analyze_data(&self, p: AnalyzeData) -> GateResult<Value> {
        if p.data.is_empty() {
            return Err(GateError::execution("analyze_data needs at least one data point"));
        }
        let count = p.data.len();
        let sum: f64 = p.data.iter().sum();
        let max = p.data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = p.data.iter().copied().fold(f64::INFINITY, f64::min);

        Ok(json!({
            "count": count,
            "average": sum / count as f64,
            "max": max,
            "min": min,
        }))
    }

    fn read_file(&self, p: FilePath) -> GateResult<Value> {
        let content = std::fs::read_to_string(&p.filepath).map_err(|e| {
            GateError::execution(format!("failed to read '{}': {e}", p.filepath.display()))
        })?;
        Ok(json!({ "filepath": p.filepath, "content": content }))
    }

    fn list_directory(&self, p: DirPath) -> GateResult<Value> {
        let entries = std::fs::read_dir(&p.path).map_err(|e| {
            GateError::execution(format!("failed to list '{}': {e}", p.path.display()))
        })?;
        let mut names = entries
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GateError::execution(format!("failed to list '{}': {e}", p.path.display())))?;
        names.sort();
        Ok(json!({ "path": p.path, "entries": names }))
    }

    fn write_file(&self, p: WriteFile) -> GateResult<Value> {
        std::fs::write(&p.filepath, &p.content).map_err(|e| {
            GateError::execution(format!("failed to write '{}': {e}", p.filepath.display()))
        })?;
        Ok(json!({ "filepath": p.filepath, "bytes_written": p.content.len() }))
    }

    /// Non-zero exit codes are reported, not treated as failures.
    fn shell_command(&self, p: ShellCommand) -> GateResult<Value> {
        let output = run(Command::new(&self.shell).arg("-c").arg(&p.command), &self.shell)?;
        Ok(process_json(&output))
    }

    /// Unlike `shell_command`, a non-zero exit is an execution failure.
    fn execute_code(&self, p: ExecuteCode) -> GateResult<Value> {
        let interpreter = match p.language.as_deref() {
            None | Some("python") | Some("python3") => self.python.as_str(),
            Some("sh") | Some("shell") => self.shell.as_str(),
            Some(other) => {
                return Err(GateError::execution(format!("unsupported language '{other}'")));
            }
        };

        let output = run(Command::new(interpreter).arg("-c").arg(&p.code), interpreter)?;
        if !output.status.success() {
            return Err(GateError::execution(format!(
                "code exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(process_json(&output))
    }
}

fn run(command: &mut Command, program: &str) -> GateResult<Output> {
    command
        .output()
        .map_err(|e| GateError::execution(format!("failed to run '{program}': {e}")))
}

fn process_json(output: &Output) -> Value {
    json!({
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
        "returncode": output.status.code(),
    })
}

impl ActionExecutor for HostExecutor {
    fn execute(&self, name: &str, parameters: &Parameters) -> GateResult<Value> {
        debug!(action = %name, "host executor running action");
        match name {
            "analyze_data" => self.analyze_data(params(name, parameters)?),
            "read_file" => self.read_file(params(name, parameters)?),
            "list_directory" => self.list_directory(params(name, parameters)?),
            "write_file" => self.write_file(params(name, parameters)?),
            "shell_command" => self.shell_command(params(name, parameters)?),
            "execute_code" => self.execute_code(params(name, parameters)?),
            other => Err(GateError::execution(format!("unknown action '{other}'"))),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tollgate_contracts::{action::Action, error::GateError};
    use tollgate_core::traits::ActionExecutor;

    use super::HostExecutor;

    fn run(name: &str, params: serde_json::Value) -> Result<serde_json::Value, GateError> {
        let action = Action::from_json(name, params);
        HostExecutor::new().execute(&action.name, &action.parameters)
    }

    #[test]
    fn test_analyze_data() {
        let value = run("analyze_data", json!({ "data": [1, 2, 3, 4, 5, 10, 15, 20] })).unwrap();
        assert_eq!(value["count"], 8);
        assert_eq!(value["average"], 7.5);
        assert_eq!(value["max"], 20.0);
        assert_eq!(value["min"], 1.0);
    }

    #[test]
    fn test_analyze_data_rejects_bad_input() {
        assert!(matches!(
            run("analyze_data", json!({ "data": [] })),
            Err(GateError::ExecutionFailed { .. })
        ));
        assert!(matches!(
            run("analyze_data", json!({ "data": ["a"] })),
            Err(GateError::ExecutionFailed { .. })
        ));
        assert!(run("analyze_data", json!({})).is_err());
    }

    #[test]
    fn test_write_read_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");

        let written = run(
            "write_file",
            json!({ "filepath": path, "content": "written after approval" }),
        )
        .unwrap();
        assert_eq!(written["bytes_written"], 22);

        let read = run("read_file", json!({ "filepath": path })).unwrap();
        assert_eq!(read["content"], "written after approval");

        let listed = run("list_directory", json!({ "path": dir.path() })).unwrap();
        assert_eq!(listed["entries"], json!(["note.txt"]));
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run("read_file", json!({ "filepath": dir.path().join("absent") })).unwrap_err();
        assert!(matches!(err, GateError::ExecutionFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_command_reports_exit_code() {
        let ok = run("shell_command", json!({ "command": "echo hello" })).unwrap();
        assert_eq!(ok["stdout"], "hello\n");
        assert_eq!(ok["returncode"], 0);

        let failing = run("shell_command", json!({ "command": "echo oops >&2; exit 3" })).unwrap();
        assert_eq!(failing["returncode"], 3);
        assert_eq!(failing["stderr"], "oops\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_code_in_shell() {
        let ok = run("execute_code", json!({ "code": "echo from code", "language": "sh" })).unwrap();
        assert_eq!(ok["stdout"], "from code\n");

        let err = run("execute_code", json!({ "code": "exit 1", "language": "sh" })).unwrap_err();
        assert!(matches!(err, GateError::ExecutionFailed { .. }));
    }

    #[test]
    fn test_unsupported_language_and_unknown_action() {
        assert!(run("execute_code", json!({ "code": "x", "language": "cobol" })).is_err());
        match run("launch_rocket", json!({})) {
            Err(GateError::ExecutionFailed { reason }) => assert!(reason.contains("launch_rocket")),
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }
}
