//! Error types for chat turns and the in-process host.

use std::time::Duration;

use thiserror::Error;

/// A condition that ends a chat turn early.
///
/// The orchestrator always calls `finish()` on the response before returning
/// one of these, so the consumer is never left with an open message.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("model requested unknown tool '{name}'")]
    UnknownTool { name: String },

    #[error("arguments for tool '{name}' are not a JSON object: {reason}")]
    MalformedArguments { name: String, reason: String },

    #[error("model backend failed: {0:#}")]
    Model(#[source] anyhow::Error),

    #[error("turn exceeded {limit} model rounds")]
    IterationLimit { limit: usize },

    #[error("no confirmation for tool call '{callback_id}' within {timeout:?}")]
    ConfirmationTimedOut {
        callback_id: String,
        timeout: Duration,
    },

    #[error("confirmation listener for '{callback_id}' closed without a decision")]
    ConfirmationAbandoned { callback_id: String },

    #[error("turn was already run")]
    AlreadyRun,

    #[error("failed to serialize tool result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Registration and routing failures in [`crate::host::LocalHost`].
#[derive(Debug, Error)]
pub enum HostError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("chat participant '{0}' is already registered")]
    DuplicateParticipant(String),

    #[error("no chat participant with id '{0}'")]
    UnknownParticipant(String),

    #[error("no in-flight response with id '{0}'")]
    UnknownResponse(String),

    #[error("inbound message '{id}' has an invalid payload: {reason}")]
    MalformedInbound { id: String, reason: String },

    #[error(transparent)]
    Turn(#[from] TurnError),
}
