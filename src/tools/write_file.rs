//! Write-file tool: writes content to a file, creating parent directories as
//! needed. When confirmation is required, the prompt carries a diff of the
//! pending change.

use anyhow::Result;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

use super::{function_schema, paths, str_arg, Tool, ToolArgs, ToolPreInvokeResponse};
use crate::diff;
use crate::participant::ChatRequest;

pub const NAME: &str = "write_file";

pub struct WriteFileTool {
    project_root: PathBuf,
    confirm: bool,
}

impl WriteFileTool {
    pub fn new(project_root: PathBuf, confirm: bool) -> Self {
        Self {
            project_root,
            confirm,
        }
    }

    /// Diff of the pending write against what is on disk now.
    fn preview(&self, path: &str, new_content: &str) -> String {
        match paths::resolve_existing(&self.project_root, path)
            .and_then(|p| Ok(fs::read_to_string(p)?))
        {
            Ok(old_content) => diff::unified_diff(&old_content, new_content, path),
            Err(_) => diff::new_file_preview(new_content, path),
        }
    }
}

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "Write file"
    }

    fn tags(&self) -> &[&str] {
        &["filesystem", "mutating"]
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates parent directories as needed. Path is relative to the project root."
    }

    fn schema(&self) -> Value {
        function_schema(
            NAME,
            self.description(),
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to project root"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write to the file"
                    }
                },
                "required": ["path", "content"]
            }),
        )
    }

    fn pre_invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Option<ToolPreInvokeResponse> {
        let path = args.get("path").and_then(Value::as_str).unwrap_or("?");
        if !self.confirm {
            return Some(ToolPreInvokeResponse::message(format!("Writing `{path}`")));
        }
        let content = args.get("content").and_then(Value::as_str).unwrap_or("");
        Some(ToolPreInvokeResponse::confirm(
            self.title(),
            format!(
                "Apply this change to `{path}`?\n\n```diff\n{}```",
                self.preview(path, content)
            ),
        ))
    }

    async fn invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Result<ToolArgs> {
        let relative = str_arg(args, "path")?;
        let content = str_arg(args, "content")?;
        let path = paths::resolve_for_write(&self.project_root, relative)?;

        fs::write(&path, content)?;

        let mut result = ToolArgs::new();
        result.insert("bytes_written".into(), json!(content.len()));
        Ok(result)
    }
}
