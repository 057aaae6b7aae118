use anyhow::Result;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::{function_schema, str_arg, Tool, ToolArgs, ToolPreInvokeResponse};
use crate::constants::LIST_FILES_MAX_RESULTS;
use crate::participant::ChatRequest;

pub const NAME: &str = "list_files";

pub struct ListFilesTool {
    project_root: PathBuf,
    confirm: bool,
}

impl ListFilesTool {
    pub fn new(project_root: PathBuf, confirm: bool) -> Self {
        Self {
            project_root,
            confirm,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "List files"
    }

    fn tags(&self) -> &[&str] {
        &["filesystem", "read-only"]
    }

    fn description(&self) -> &str {
        "List files matching a glob pattern relative to the project root."
    }

    fn schema(&self) -> Value {
        function_schema(
            NAME,
            self.description(),
            json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Glob pattern (e.g. 'src/**/*.rs')"
                    }
                },
                "required": ["pattern"]
            }),
        )
    }

    fn pre_invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Option<ToolPreInvokeResponse> {
        let pattern = args.get("pattern").and_then(Value::as_str).unwrap_or("?");
        if self.confirm {
            Some(ToolPreInvokeResponse::confirm(
                self.title(),
                format!("Allow listing files matching `{pattern}`?"),
            ))
        } else {
            Some(ToolPreInvokeResponse::message(format!("Listing `{pattern}`")))
        }
    }

    async fn invoke(&self, _request: &ChatRequest, args: &ToolArgs) -> Result<ToolArgs> {
        let pattern = str_arg(args, "pattern")?;
        let full_pattern = self.project_root.join(pattern);
        let root_canonical = self.project_root.canonicalize()?;

        let mut files: Vec<Value> = Vec::new();
        let mut truncated = false;
        for entry in glob::glob(&full_pattern.to_string_lossy())? {
            if files.len() >= LIST_FILES_MAX_RESULTS {
                truncated = true;
                break;
            }
            let entry = entry?;
            // Skip broken symlinks and anything outside the project root
            match entry.canonicalize() {
                Ok(canonical) if canonical.starts_with(&root_canonical) => {}
                _ => continue,
            }
            let relative = entry.strip_prefix(&self.project_root).unwrap_or(&entry);
            files.push(Value::String(relative.display().to_string()));
        }

        let mut result = ToolArgs::new();
        result.insert("files".into(), Value::Array(files));
        result.insert("truncated".into(), Value::Bool(truncated));
        Ok(result)
    }
}
