//! Chat participants: the agents a host routes chat requests to.

use std::fmt;
use std::sync::Arc;

use crate::error::TurnError;
use crate::host::Host;
use crate::orchestrator::{ToolCallOrchestrator, TurnOutcome};
use crate::response::ChatResponse;
use crate::stream::StreamChunk;
use crate::tools::{ToolRegistry, EMPTY_REGISTRY};

/// One user message addressed to a participant.
#[derive(Clone)]
pub struct ChatRequest {
    pub host: Arc<dyn Host>,
    /// Slash command name without the slash, or empty.
    pub command: String,
    pub prompt: String,
}

impl ChatRequest {
    pub fn new(host: Arc<dyn Host>, prompt: impl Into<String>) -> Self {
        Self {
            host,
            command: String::new(),
            prompt: prompt.into(),
        }
    }

    pub fn with_command(
        host: Arc<dyn Host>,
        command: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            host,
            command: command.into(),
            prompt: prompt.into(),
        }
    }

    /// Splits a leading `/command` off raw chat input.
    ///
    /// Only commands in `commands` are recognized; anything else, including
    /// an unknown `/word`, stays part of the prompt.
    pub fn parse(host: Arc<dyn Host>, input: &str, commands: &[ChatCommand]) -> Self {
        let trimmed = input.trim();
        if let Some(rest) = trimmed.strip_prefix('/') {
            let (name, prompt) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            if commands.iter().any(|c| c.name == name) {
                return Self::with_command(host, name, prompt.trim());
            }
        }
        Self::new(host, trimmed)
    }
}

impl fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatRequest")
            .field("command", &self.command)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// A slash command a participant understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommand {
    pub name: String,
    pub description: String,
}

impl ChatCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// An agent that answers chat requests, optionally with tools.
#[async_trait::async_trait]
pub trait ChatParticipant: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn commands(&self) -> Vec<ChatCommand> {
        Vec::new()
    }

    /// Tools offered to the model on this participant's turns.
    fn tools(&self) -> &ToolRegistry {
        &EMPTY_REGISTRY
    }

    async fn handle_chat_request(
        &self,
        request: &ChatRequest,
        response: &dyn ChatResponse,
    ) -> Result<TurnOutcome, TurnError> {
        self.handle_chat_request_with_tools(request, response).await
    }

    /// Runs the tool-call loop with the host's model over [`Self::tools`].
    async fn handle_chat_request_with_tools(
        &self,
        request: &ChatRequest,
        response: &dyn ChatResponse,
    ) -> Result<TurnOutcome, TurnError> {
        let host = &request.host;
        ToolCallOrchestrator::new(request, response, self.tools(), host.model())
            .with_config(host.orchestrator_config())
            .run()
            .await
    }
}

/// General-purpose participant over a fixed tool set.
pub struct ToolAssistant {
    tools: Arc<ToolRegistry>,
}

impl ToolAssistant {
    pub const ID: &'static str = "assistant";
    const TOOLS_COMMAND: &'static str = "tools";

    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    fn describe_tools(&self) -> String {
        if self.tools.is_empty() {
            return "No tools are available.".to_string();
        }
        let mut out = String::from("Available tools:\n\n");
        for tool in self.tools.list() {
            out.push_str(&format!(
                "- **{}** (`{}`): {}\n",
                tool.title(),
                tool.name(),
                tool.description()
            ));
        }
        out
    }
}

#[async_trait::async_trait]
impl ChatParticipant for ToolAssistant {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Assistant"
    }

    fn description(&self) -> &str {
        "Answers questions and works in the project with the available tools"
    }

    fn commands(&self) -> Vec<ChatCommand> {
        vec![ChatCommand::new(
            Self::TOOLS_COMMAND,
            "List the tools the assistant can use",
        )]
    }

    fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    async fn handle_chat_request(
        &self,
        request: &ChatRequest,
        response: &dyn ChatResponse,
    ) -> Result<TurnOutcome, TurnError> {
        if request.command == Self::TOOLS_COMMAND {
            response.emit(StreamChunk::markdown(self.describe_tools()), true);
            response.finish();
            return Ok(TurnOutcome::Completed);
        }
        self.handle_chat_request_with_tools(request, response).await
    }
}
