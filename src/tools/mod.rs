//! Tool abstraction and the read-only registry the orchestrator resolves
//! model-requested calls against.

pub mod list_files;
mod paths;
pub mod read_file;
pub mod run_command;
pub mod write_file;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::error::HostError;
use crate::participant::ChatRequest;
use crate::permissions::{Permission, PermissionPolicy};

use list_files::ListFilesTool;
use read_file::ReadFileTool;
use run_command::RunCommandTool;
use write_file::WriteFileTool;

/// Decoded tool arguments, and the shape of a tool's result.
pub type ToolArgs = Map<String, Value>;

/// What a tool wants done before it runs.
///
/// `message` is streamed as-is and does not gate execution. When
/// `confirmation_message` is set the call waits for an explicit yes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPreInvokeResponse {
    pub message: Option<String>,
    pub confirmation_title: Option<String>,
    pub confirmation_message: Option<String>,
}

impl ToolPreInvokeResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn confirm(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            confirmation_title: Some(title.into()),
            confirmation_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A callable capability exposed to the model.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable title.
    fn title(&self) -> &str;

    fn tags(&self) -> &[&str] {
        &[]
    }

    fn description(&self) -> &str;

    /// Model-consumable schema, passed through to the backend untouched.
    fn schema(&self) -> Value;

    /// Gate run before every invocation.
    fn pre_invoke(&self, _request: &ChatRequest, _args: &ToolArgs) -> Option<ToolPreInvokeResponse> {
        None
    }

    /// Executes the tool. The returned map is merged over the arguments and
    /// handed back to the model.
    async fn invoke(&self, request: &ChatRequest, args: &ToolArgs) -> Result<ToolArgs>;
}

/// Builds an OpenAI-style function schema.
pub fn function_schema(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        }
    })
}

/// A participant's tool set. Names are unique; lookups are by name.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

/// Shared empty registry for participants without tools.
pub static EMPTY_REGISTRY: ToolRegistry = ToolRegistry::new();

impl ToolRegistry {
    pub const fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registers a tool, rejecting a name that is already taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), HostError> {
        if self.find_by_name(tool.name()).is_some() {
            return Err(HostError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn list(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Schemas for every tool, in registration order.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Creates a registry with the built-in workspace tools.
    ///
    /// Tools the policy denies are left out; tools it marks `ask` require a
    /// confirmation before each call.
    pub fn with_builtins(project_root: PathBuf, policy: &PermissionPolicy) -> Self {
        let mut registry = Self::new();
        for name in BUILTIN_TOOLS {
            let confirm = match policy.check(name) {
                Permission::Deny => continue,
                Permission::Ask => true,
                Permission::Allow => false,
            };
            let root = project_root.clone();
            let tool: Arc<dyn Tool> = match name {
                read_file::NAME => Arc::new(ReadFileTool::new(root, confirm)),
                list_files::NAME => Arc::new(ListFilesTool::new(root, confirm)),
                write_file::NAME => Arc::new(WriteFileTool::new(root, confirm)),
                _ => Arc::new(RunCommandTool::new(root, confirm)),
            };
            // Built-in names are distinct, so this cannot collide.
            let _ = registry.register(tool);
        }
        registry
    }
}

/// Names of the built-in tools, in registration order.
pub const BUILTIN_TOOLS: [&str; 4] = [
    read_file::NAME,
    list_files::NAME,
    write_file::NAME,
    run_command::NAME,
];

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a required string argument.
pub(crate) fn str_arg<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing string argument '{}'", key))
}
