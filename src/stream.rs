//! Wire types for incremental chat output and inbound user input.
//!
//! [`StreamChunk`] is the closed set of content kinds an orchestrator may
//! emit. [`ResponseEvent`] wraps chunks (and the terminal "finished" signal)
//! for delivery to a transport, and [`InboundMessage`] is what a transport
//! hands back when the user acts on a chunk, e.g. a confirmation button.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag of a [`StreamChunk`], as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamChunkKind {
    LlmRaw,
    Markdown,
    Html,
    Button,
    Anchor,
    Progress,
    Confirmation,
}

impl fmt::Display for StreamChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            StreamChunkKind::LlmRaw => "llm-raw",
            StreamChunkKind::Markdown => "markdown",
            StreamChunkKind::Html => "html",
            StreamChunkKind::Button => "button",
            StreamChunkKind::Anchor => "anchor",
            StreamChunkKind::Progress => "progress",
            StreamChunkKind::Confirmation => "confirmation",
        };
        f.write_str(tag)
    }
}

/// One unit of incremental output.
///
/// Serialized adjacently tagged: `{"type": "markdown", "content": "..."}`.
/// Each variant carries only the fields its renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "kebab-case")]
pub enum StreamChunk {
    /// Raw model output, passed through untouched.
    LlmRaw(Value),
    Markdown(String),
    Html(String),
    Button {
        title: String,
        #[serde(rename = "commandId")]
        command_id: String,
        #[serde(default)]
        args: BTreeMap<String, String>,
    },
    Anchor {
        uri: String,
        title: String,
    },
    Progress {
        title: String,
    },
    /// A yes/no prompt. The renderer sends back `confirm_args` or
    /// `cancel_args` verbatim as a `chat-user-input` message.
    Confirmation {
        title: String,
        message: String,
        #[serde(rename = "confirmArgs")]
        confirm_args: ConfirmationArgs,
        #[serde(rename = "cancelArgs")]
        cancel_args: ConfirmationArgs,
    },
}

impl StreamChunk {
    pub fn markdown(text: impl Into<String>) -> Self {
        StreamChunk::Markdown(text.into())
    }

    pub fn kind(&self) -> StreamChunkKind {
        match self {
            StreamChunk::LlmRaw(_) => StreamChunkKind::LlmRaw,
            StreamChunk::Markdown(_) => StreamChunkKind::Markdown,
            StreamChunk::Html(_) => StreamChunkKind::Html,
            StreamChunk::Button { .. } => StreamChunkKind::Button,
            StreamChunk::Anchor { .. } => StreamChunkKind::Anchor,
            StreamChunk::Progress { .. } => StreamChunkKind::Progress,
            StreamChunk::Confirmation { .. } => StreamChunkKind::Confirmation,
        }
    }
}

/// A user decision correlated to the prompt that asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    pub callback_id: String,
    pub data: Value,
}

/// Payload attached to each button of a confirmation prompt.
///
/// `id` is the response message the prompt belongs to; `data` is what gets
/// delivered to that response's user-input listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationArgs {
    pub id: String,
    pub data: UserInput,
}

impl ConfirmationArgs {
    /// Builds the payload for one side of a confirmation prompt.
    pub fn new(message_id: &str, callback_id: &str, confirmed: bool) -> Self {
        Self {
            id: message_id.to_string(),
            data: UserInput {
                callback_id: callback_id.to_string(),
                data: serde_json::to_value(ConfirmationDecision { confirmed })
                    .unwrap_or(Value::Null),
            },
        }
    }

    /// Converts the payload into the inbound message a transport would send
    /// when the user clicks the matching button.
    pub fn into_inbound(self) -> InboundMessage {
        InboundMessage {
            id: self.id,
            kind: RequestDataType::ChatUserInput,
            data: serde_json::to_value(self.data).unwrap_or(Value::Null),
        }
    }
}

/// Decision body of a confirmation answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationDecision {
    pub confirmed: bool,
}

impl ConfirmationDecision {
    /// Reads a decision from a delivered payload.
    ///
    /// Anything other than `{"confirmed": true}` counts as a refusal.
    pub fn from_payload(payload: &Value) -> Self {
        serde_json::from_value(payload.clone()).unwrap_or(Self { confirmed: false })
    }
}

/// Type tag of an inbound transport message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestDataType {
    ChatRequest,
    ChatUserInput,
}

/// A message received from the transport: `{"id", "type", "data"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RequestDataType,
    pub data: Value,
}

/// What a response sink forwards to its transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ResponseEvent {
    Chunk {
        message_id: String,
        chunk: StreamChunk,
        #[serde(default)]
        is_final: bool,
    },
    Finished {
        message_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markdown_wire_shape() {
        let value = serde_json::to_value(StreamChunk::markdown("hi")).unwrap();
        assert_eq!(value, json!({"type": "markdown", "content": "hi"}));
    }

    #[test]
    fn test_kind_display_matches_wire_tag() {
        let chunk = StreamChunk::Progress {
            title: "Thinking".into(),
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["type"], json!(chunk.kind().to_string()));
        assert_eq!(StreamChunkKind::LlmRaw.to_string(), "llm-raw");
    }

    #[test]
    fn test_confirmation_args_shape() {
        let args = ConfirmationArgs::new("msg-1", "call_7", true);
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(
            value,
            json!({"id": "msg-1", "data": {"callback_id": "call_7", "data": {"confirmed": true}}})
        );
    }

    #[test]
    fn test_button_uses_camel_case_command_id() {
        let chunk = StreamChunk::Button {
            title: "Open".into(),
            command_id: "notebook:open".into(),
            args: BTreeMap::from([("path".to_string(), "a.ipynb".to_string())]),
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["content"]["commandId"], json!("notebook:open"));
        assert_eq!(value["content"]["args"]["path"], json!("a.ipynb"));
    }

    #[test]
    fn test_decision_defaults_to_refusal() {
        assert!(ConfirmationDecision::from_payload(&json!({"confirmed": true})).confirmed);
        assert!(!ConfirmationDecision::from_payload(&json!({"confirmed": false})).confirmed);
        assert!(!ConfirmationDecision::from_payload(&json!({"ok": 1})).confirmed);
        assert!(!ConfirmationDecision::from_payload(&json!("yes")).confirmed);
    }

    #[test]
    fn test_inbound_from_confirmation_args() {
        let inbound = ConfirmationArgs::new("msg-1", "call_7", false).into_inbound();
        let value = serde_json::to_value(&inbound).unwrap();
        assert_eq!(value["type"], json!("chat-user-input"));
        assert_eq!(value["data"]["callback_id"], json!("call_7"));
        assert_eq!(value["data"]["data"]["confirmed"], json!(false));
    }

    #[test]
    fn test_response_event_tags() {
        let event = ResponseEvent::Finished {
            message_id: "m".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "finished", "message_id": "m"}));
    }
}
