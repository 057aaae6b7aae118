use anyhow::Result;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::{function_schema, paths, str_arg, Tool, ToolArgs, ToolPreInvokeResponse};
use crate::constants::{BINARY_DETECTION_BYTES, READ_FILE_MAX_SIZE};
use crate::participant::ChatRequest;

pub const NAME: &str = "read_file";

pub struct ReadFileTool {
    /// Project root directory. Paths are resolved relative to this.
    project_root: PathBuf,
    confirm: bool,
}

impl ReadFileTool {
    pub fn new(project_root: PathBuf, confirm: bool) -> Self {
        Self {
            project_root,
            confirm,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "Read file"
    }

    fn tags(&self) -> &[&str] {
        &["filesystem", "read-only"]
    }

    fn description(&self) -> &str {
        "Read the contents of a UTF-8 text file. Path is relative to the project root."
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
                    }
                },
                "required": ["path"]
            }),
        )
    }

    fn pre_invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Option<ToolPreInvokeResponse> {
        let path = args.get("path").and_then(Value::as_str).unwrap_or("?");
        if self.confirm {
            Some(ToolPreInvokeResponse::confirm(
                self.title(),
                format!("Allow reading `{path}`?"),
            ))
        } else {
            Some(ToolPreInvokeResponse::message(format!("Reading `{path}`")))
        }
    }

    async fn invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Result<ToolArgs> {
        let path = paths::resolve_existing(&self.project_root, str_arg(args, "path")?)?;

        let metadata = std::fs::metadata(&path)?;
        if metadata.len() > READ_FILE_MAX_SIZE {
            anyhow::bail!(
                "File too large: {} bytes (max {})",
                metadata.len(),
                READ_FILE_MAX_SIZE
            );
        }

        let content = std::fs::read(&path)?;
        let check_len = content.len().min(BINARY_DETECTION_BYTES);
        if content[..check_len].contains(&0) {
            anyhow::bail!("Binary file detected. Cannot display binary content.");
        }

        let text = String::from_utf8(content)
            .map_err(|_| anyhow::anyhow!("File is not valid UTF-8"))?;

        let mut result = ToolArgs::new();
        result.insert("content".into(), Value::String(text));
        Ok(result)
    }
}
