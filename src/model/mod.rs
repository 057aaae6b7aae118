//! Model backend boundary.
//!
//! The orchestrator only needs one capability from a language model: turn a
//! history plus optional tool schemas into an assistant reply. [`AiModel`] is
//! that capability; [`openai::OpenAiCompatModel`] implements it over HTTP.

pub mod openai;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Message, ToolCall};

/// One assistant reply: free text, tool-call requests, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }

    /// Text content, if any non-empty text came back.
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

/// A language model that can be asked for a completion.
///
/// Implementations must be safe to share across concurrent turns.
#[async_trait::async_trait]
pub trait AiModel: Send + Sync {
    /// Requests a completion for `messages`. When `tools` is `Some`, the model
    /// may answer with tool calls instead of (or alongside) text.
    async fn completions(&self, messages: &[Message], tools: Option<&[Value]>) -> Result<AssistantReply>;
}
