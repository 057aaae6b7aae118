//! Shell command tool with a timeout, an output cap and secret env vars
//! stripped from the child.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use super::{function_schema, Tool, ToolArgs, ToolPreInvokeResponse};
use crate::constants::{
    COMMAND_DEFAULT_TIMEOUT_SECS, COMMAND_MAX_OUTPUT_SIZE, COMMAND_STRIPPED_ENV_VARS,
};
use crate::participant::ChatRequest;

pub const NAME: &str = "run_command";

/// Runs `sh -c <command>` in the project root.
pub struct RunCommandTool {
    project_root: PathBuf,
    confirm: bool,
}

impl RunCommandTool {
    pub fn new(project_root: PathBuf, confirm: bool) -> Self {
        Self {
            project_root,
            confirm,
        }
    }
}

#[derive(Deserialize)]
struct RunCommandInput {
    command: String,
    timeout: Option<u64>,
}

/// Truncate `output` to at most `COMMAND_MAX_OUTPUT_SIZE` bytes, appending a
/// notice when truncation occurs.
fn cap_output(output: &str) -> String {
    if output.len() <= COMMAND_MAX_OUTPUT_SIZE {
        return output.to_string();
    }
    let mut end = COMMAND_MAX_OUTPUT_SIZE;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... output truncated at {} bytes",
        &output[..end],
        COMMAND_MAX_OUTPUT_SIZE
    )
}

#[async_trait::async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "Run command"
    }

    fn tags(&self) -> &[&str] {
        &["shell", "mutating"]
    }

    fn description(&self) -> &str {
        "Execute a shell command in the project root and return its exit code and output."
    }

    fn schema(&self) -> Value {
        function_schema(
            NAME,
            self.description(),
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Shell command to execute"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds (default 30)"
                    }
                },
                "required": ["command"]
            }),
        )
    }

    fn pre_invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Option<ToolPreInvokeResponse> {
        let command = args.get("command").and_then(Value::as_str).unwrap_or("?");
        if self.confirm {
            Some(ToolPreInvokeResponse::confirm(
                self.title(),
                format!("Run `{command}` in the project root?"),
            ))
        } else {
            Some(ToolPreInvokeResponse::message(format!("Running `{command}`")))
        }
    }

    async fn invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Result<ToolArgs> {
        let input: RunCommandInput = serde_json::from_value(Value::Object(args.clone()))?;
        let timeout_secs = input.timeout.unwrap_or(COMMAND_DEFAULT_TIMEOUT_SECS);

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(&input.command);
        cmd.current_dir(&self.project_root);
        for var in COMMAND_STRIPPED_ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        let child = cmd.spawn()?;
        let output =
            match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
                .await
            {
                Ok(output) => output?,
                Err(_) => anyhow::bail!("Command timed out after {}s", timeout_secs),
            };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = ToolArgs::new();
        result.insert("exit_code".into(), json!(output.status.code().unwrap_or(-1)));
        result.insert("stdout".into(), Value::String(cap_output(stdout.trim_end())));
        result.insert("stderr".into(), Value::String(cap_output(stderr.trim_end())));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_output_respects_char_boundaries() {
        let long = "é".repeat(COMMAND_MAX_OUTPUT_SIZE);
        let capped = cap_output(&long);
        assert!(capped.contains("output truncated"));
        assert!(capped.len() < long.len());
    }

    #[test]
    fn test_cap_output_leaves_short_output() {
        assert_eq!(cap_output("ok"), "ok");
    }
}
