//! The tool-call loop that drives one chat turn.
//!
//! Each round sends the full history and every tool schema to the model.
//! Requested calls go into a FIFO queue; exactly one call is taken off the
//! head, optionally confirmed by the user, executed, and folded back into the
//! history before the model is asked again. The turn ends when a round leaves
//! the queue empty, when the user declines a confirmation, or on a fatal
//! error. `finish()` is called on the response exactly once in every case.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::confirm::PendingUserInput;
use crate::constants::{DEFAULT_MAX_ITERATIONS, PRE_INVOKE_MARK};
use crate::error::TurnError;
use crate::message::{Message, ToolCall};
use crate::model::{AiModel, AssistantReply};
use crate::participant::ChatRequest;
use crate::response::ChatResponse;
use crate::stream::{ConfirmationArgs, ConfirmationDecision, StreamChunk};
use crate::tools::{Tool, ToolArgs, ToolRegistry};

/// Limits applied to one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Model rounds allowed before the turn fails with
    /// [`TurnError::IterationLimit`]. `None` removes the cap.
    pub max_iterations: Option<usize>,
    /// How long a confirmation may stay unanswered. `None` waits forever.
    pub confirmation_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            confirmation_timeout: None,
        }
    }
}

/// Where the turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingModel,
    NoToolCalls,
    HasToolCalls,
    AwaitingConfirmation,
    Executing,
    FoldingResult,
    Finished,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingModel => "awaiting-model",
            TurnState::NoToolCalls => "no-tool-calls",
            TurnState::HasToolCalls => "has-tool-calls",
            TurnState::AwaitingConfirmation => "awaiting-confirmation",
            TurnState::Executing => "executing",
            TurnState::FoldingResult => "folding-result",
            TurnState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// How a turn ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model stopped requesting tools.
    Completed,
    /// The user declined a confirmation. Nothing after it ran.
    Cancelled,
}

/// A queued call plus the text the model sent alongside it, if this call is
/// the first of its round.
#[derive(Debug)]
struct QueuedCall {
    call: ToolCall,
    preamble: Option<String>,
}

enum CallOutcome {
    Folded,
    Declined,
}

/// Drives one chat turn against a model and a tool registry.
pub struct ToolCallOrchestrator<'a> {
    request: &'a ChatRequest,
    response: &'a dyn ChatResponse,
    tools: &'a ToolRegistry,
    model: Arc<dyn AiModel>,
    config: OrchestratorConfig,
    history: Vec<Message>,
    pending: VecDeque<QueuedCall>,
    state: TurnState,
    iterations: usize,
}

impl<'a> ToolCallOrchestrator<'a> {
    pub fn new(
        request: &'a ChatRequest,
        response: &'a dyn ChatResponse,
        tools: &'a ToolRegistry,
        model: Arc<dyn AiModel>,
    ) -> Self {
        Self {
            request,
            response,
            tools,
            model,
            config: OrchestratorConfig::default(),
            history: Vec::new(),
            pending: VecDeque::new(),
            state: TurnState::Idle,
            iterations: 0,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Conversation so far, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Calls requested but not yet processed, in execution order.
    pub fn pending(&self) -> impl Iterator<Item = &ToolCall> + '_ {
        self.pending.iter().map(|q| &q.call)
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Number of model rounds made so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Runs the turn to completion.
    ///
    /// The response is finished before this returns, whatever the result.
    /// A turn runs once; a second call returns [`TurnError::AlreadyRun`]
    /// without touching the response.
    pub async fn run(&mut self) -> Result<TurnOutcome, TurnError> {
        if self.state != TurnState::Idle {
            return Err(TurnError::AlreadyRun);
        }

        info!(
            message_id = %self.response.message_id(),
            command = %self.request.command,
            tool_count = self.tools.len(),
            "starting chat turn"
        );
        self.history.push(Message::user(self.request.prompt.clone()));

        let result = if self.tools.is_empty() {
            self.respond_without_tools().await
        } else {
            self.drive().await
        };

        match &result {
            Ok(outcome) => info!(
                message_id = %self.response.message_id(),
                ?outcome,
                rounds = self.iterations,
                "chat turn finished"
            ),
            Err(e) => warn!(
                message_id = %self.response.message_id(),
                error = %e,
                rounds = self.iterations,
                "chat turn failed"
            ),
        }

        self.finish();
        result
    }

    /// Single completion without schemas; the content is the whole answer.
    async fn respond_without_tools(&mut self) -> Result<TurnOutcome, TurnError> {
        let reply = self.request_completion(None).await?;
        if !reply.tool_calls.is_empty() {
            warn!(
                count = reply.tool_calls.len(),
                "model requested tools but none are registered; ignoring"
            );
        }
        self.state = TurnState::NoToolCalls;
        if let Some(text) = reply.content_text() {
            self.history.push(Message::assistant(text));
            self.response.emit(StreamChunk::markdown(text), false);
        }
        Ok(TurnOutcome::Completed)
    }

    async fn drive(&mut self) -> Result<TurnOutcome, TurnError> {
        let schemas = self.tools.schemas();
        loop {
            let reply = self.request_completion(Some(schemas.as_slice())).await?;
            self.absorb_reply(reply);

            let Some(next) = self.pending.pop_front() else {
                return Ok(TurnOutcome::Completed);
            };
            match self.process_call(next).await? {
                CallOutcome::Folded => continue,
                CallOutcome::Declined => return Ok(TurnOutcome::Cancelled),
            }
        }
    }

    async fn request_completion(
        &mut self,
        schemas: Option<&[Value]>,
    ) -> Result<AssistantReply, TurnError> {
        if let Some(limit) = self.config.max_iterations {
            if self.iterations >= limit {
                return Err(TurnError::IterationLimit { limit });
            }
        }
        self.iterations += 1;
        self.state = TurnState::AwaitingModel;
        debug!(
            round = self.iterations,
            history_len = self.history.len(),
            pending = self.pending.len(),
            "requesting completion"
        );

        self.model
            .completions(&self.history, schemas)
            .await
            .map_err(TurnError::Model)
    }

    /// Queues any requested calls and streams the reply's text.
    fn absorb_reply(&mut self, reply: AssistantReply) {
        let text = reply.content_text().map(str::to_string);

        if reply.tool_calls.is_empty() {
            self.state = TurnState::NoToolCalls;
            if let Some(text) = text {
                self.response.emit(StreamChunk::markdown(text.as_str()), false);
                self.history.push(Message::assistant(text));
            }
            return;
        }

        self.state = TurnState::HasToolCalls;
        debug!(
            count = reply.tool_calls.len(),
            names = ?reply.tool_calls.iter().map(ToolCall::name).collect::<Vec<_>>(),
            "model requested tool calls"
        );
        if let Some(ref text) = text {
            self.response.emit(StreamChunk::markdown(text.as_str()), false);
        }

        let mut preamble = text;
        for call in reply.tool_calls {
            self.pending.push_back(QueuedCall {
                call,
                preamble: preamble.take(),
            });
        }
    }

    async fn process_call(&mut self, queued: QueuedCall) -> Result<CallOutcome, TurnError> {
        let QueuedCall { call, preamble } = queued;
        let args = decode_arguments(&call)?;
        let tool = self
            .tools
            .find_by_name(call.name())
            .cloned()
            .ok_or_else(|| TurnError::UnknownTool {
                name: call.name().to_string(),
            })?;

        if !self.gate(tool.as_ref(), &call, &args).await? {
            info!(tool = %call.name(), call_id = %call.id, "tool call declined by user");
            return Ok(CallOutcome::Declined);
        }

        self.state = TurnState::Executing;
        debug!(tool = %call.name(), call_id = %call.id, "invoking tool");
        let result = match tool.invoke(self.request, &args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name(), call_id = %call.id, error = %e, "tool failed");
                let mut failure = ToolArgs::new();
                failure.insert("error".to_string(), Value::String(format!("{e:#}")));
                failure
            }
        };

        self.state = TurnState::FoldingResult;
        let mut merged = args;
        merged.extend(result);
        let content = serde_json::to_string(&merged)?;
        let call_id = call.id.clone();
        self.history
            .push(Message::assistant_tool_calls(preamble, vec![call]));
        self.history.push(Message::tool_result(call_id, content));
        Ok(CallOutcome::Folded)
    }

    /// Streams the tool's pre-invoke message and, if it asks for one, waits
    /// for a confirmation. Returns `false` when the user declines.
    async fn gate(
        &mut self,
        tool: &dyn Tool,
        call: &ToolCall,
        args: &ToolArgs,
    ) -> Result<bool, TurnError> {
        let Some(pre) = tool.pre_invoke(self.request, args) else {
            return Ok(true);
        };

        if let Some(message) = pre.message {
            self.response.emit(
                StreamChunk::markdown(format!("{PRE_INVOKE_MARK} {message}...")),
                false,
            );
        }

        let Some(message) = pre.confirmation_message else {
            return Ok(true);
        };

        self.state = TurnState::AwaitingConfirmation;
        let message_id = self.response.message_id();
        let pending = PendingUserInput::register(self.response, call.id.clone());
        self.response.emit(
            StreamChunk::Confirmation {
                title: pre
                    .confirmation_title
                    .unwrap_or_else(|| tool.title().to_string()),
                message,
                confirm_args: ConfirmationArgs::new(message_id, &call.id, true),
                cancel_args: ConfirmationArgs::new(message_id, &call.id, false),
            },
            false,
        );
        debug!(tool = %call.name(), call_id = %call.id, "waiting for confirmation");

        let payload = pending.wait(self.config.confirmation_timeout).await?;
        Ok(ConfirmationDecision::from_payload(&payload).confirmed)
    }

    fn finish(&mut self) {
        self.state = TurnState::Finished;
        self.response.finish();
    }
}

/// Parses a call's raw argument string. An empty string means no arguments.
fn decode_arguments(call: &ToolCall) -> Result<ToolArgs, TurnError> {
    let raw = call.arguments().trim();
    if raw.is_empty() {
        return Ok(ToolArgs::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TurnError::MalformedArguments {
            name: call.name().to_string(),
            reason: format!("expected an object, got `{other}`"),
        }),
        Err(e) => Err(TurnError::MalformedArguments {
            name: call.name().to_string(),
            reason: e.to_string(),
        }),
    }
}
