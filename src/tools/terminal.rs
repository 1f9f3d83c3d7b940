//! Shell command execution tool.

use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tokio::process::Command;

use super::Tool;

const MAX_OUTPUT_BYTES: usize = 10_000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Commands matching this are refused outright.
fn dangerous_command() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\brm\s+-rf\b|\bmkfs").expect("valid regex"))
}

/// Run a shell command.
pub struct ExecuteCommand;

#[async_trait]
impl Tool for ExecuteCommand {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the workspace directory. Returns stdout and stderr, plus the exit code when it is non-zero."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 60)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'command' must be a string"))?;
        let timeout_secs = args["timeout_secs"].as_u64().unwrap_or(DEFAULT_TIMEOUT_SECS);

        if dangerous_command().is_match(command) {
            tracing::warn!("Refusing dangerous command: {}", command);
            anyhow::bail!("Dangerous command refused");
        }

        tracing::info!("Executing command: {}", command);

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(timeout_secs),
            Command::new(shell)
                .arg(shell_arg)
                .arg(command)
                .current_dir(workspace)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Command timed out after {} seconds", timeout_secs))?
        .map_err(|e| anyhow::anyhow!("Failed to execute command: {}", e))?;

        let mut result = String::from_utf8_lossy(&output.stdout).into_owned();
        result.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            if !result.is_empty() && !result.ends_with('\n') {
                result.push('\n');
            }
            result.push_str(&format!("[exit code: {}]", exit_code));
        }

        if result.len() > MAX_OUTPUT_BYTES {
            let mut cut = MAX_OUTPUT_BYTES;
            while !result.is_char_boundary(cut) {
                cut -= 1;
            }
            result.truncate(cut);
            result.push_str("\n... [output truncated]");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangerous_patterns_match() {
        assert!(dangerous_command().is_match("rm -rf /"));
        assert!(dangerous_command().is_match("sudo mkfs.ext4 /dev/sda1"));
        assert!(!dangerous_command().is_match("rm notes.txt"));
        assert!(!dangerous_command().is_match("ls -la"));
    }

    #[tokio::test]
    async fn dangerous_command_is_refused() {
        let err = ExecuteCommand
            .execute(json!({"command": "rm -rf /tmp/whatever"}), Path::new("."))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Dangerous command refused");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir");

        let ok = ExecuteCommand
            .execute(json!({"command": "echo hello"}), dir.path())
            .await
            .expect("run");
        assert_eq!(ok, "hello\n");

        let failed = ExecuteCommand
            .execute(json!({"command": "echo oops >&2; exit 3"}), dir.path())
            .await
            .expect("run");
        assert_eq!(failed, "oops\n[exit code: 3]");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_workspace_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker.txt"), "").expect("seed");
        let out = ExecuteCommand
            .execute(json!({"command": "ls"}), dir.path())
            .await
            .expect("run");
        assert!(out.contains("marker.txt"));
    }
}
