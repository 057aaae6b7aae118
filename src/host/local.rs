//! In-process host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::{Extension, Host, InlineCompletionContextProvider};
use crate::error::HostError;
use crate::model::AiModel;
use crate::orchestrator::{OrchestratorConfig, TurnOutcome};
use crate::participant::{ChatParticipant, ChatRequest};
use crate::response::ChatResponse;
use crate::stream::{InboundMessage, RequestDataType, UserInput};
use crate::tools::{Tool, ToolRegistry};

/// A host living in the same process as its transport.
///
/// Besides the registries it keeps a router of in-flight responses, so a
/// `chat-user-input` message arriving from the transport reaches the turn
/// that is waiting for it.
pub struct LocalHost {
    model: Arc<dyn AiModel>,
    config: OrchestratorConfig,
    participants: RwLock<Vec<Arc<dyn ChatParticipant>>>,
    tools: RwLock<Arc<ToolRegistry>>,
    providers: RwLock<Vec<Arc<dyn InlineCompletionContextProvider>>>,
    extensions: RwLock<Vec<String>>,
    responses: Mutex<HashMap<String, Arc<dyn ChatResponse>>>,
}

impl LocalHost {
    pub fn new(model: Arc<dyn AiModel>) -> Self {
        Self {
            model,
            config: OrchestratorConfig::default(),
            participants: RwLock::new(Vec::new()),
            tools: RwLock::new(Arc::new(ToolRegistry::new())),
            providers: RwLock::new(Vec::new()),
            extensions: RwLock::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_orchestrator_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn participant(&self, id: &str) -> Option<Arc<dyn ChatParticipant>> {
        self.participants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    pub fn participants(&self) -> Vec<Arc<dyn ChatParticipant>> {
        self.participants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the tools registered so far. Later registrations do not
    /// affect a snapshot already handed out.
    pub fn tool_registry(&self) -> Arc<ToolRegistry> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn inline_completion_context_providers(&self) -> Vec<Arc<dyn InlineCompletionContextProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ids of the extensions activated on this host, in activation order.
    pub fn extensions(&self) -> Vec<String> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn activate_extension(&self, extension: &dyn Extension) -> Result<(), HostError> {
        info!(id = %extension.id(), name = %extension.name(), "activating extension");
        extension.activate(self)?;
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(extension.id().to_string());
        Ok(())
    }

    /// Makes `response` reachable by [`Self::dispatch_inbound`].
    pub fn begin_response(&self, response: Arc<dyn ChatResponse>) {
        let id = response.message_id().to_string();
        debug!(message_id = %id, "routing user input");
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, response);
    }

    /// Stops routing to a response. Returns `false` if it was not routed.
    pub fn end_response(&self, message_id: &str) -> bool {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(message_id)
            .is_some()
    }

    pub fn active_responses(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Routes a message from the transport.
    ///
    /// `chat-user-input` payloads are delivered to the in-flight response
    /// whose message id matches. Chat requests are started through
    /// [`Self::handle_chat_request`] instead and are rejected here.
    pub fn dispatch_inbound(&self, message: InboundMessage) -> Result<(), HostError> {
        if message.kind != RequestDataType::ChatUserInput {
            return Err(HostError::MalformedInbound {
                id: message.id,
                reason: "only chat-user-input messages can be routed".to_string(),
            });
        }

        let input: UserInput =
            serde_json::from_value(message.data).map_err(|e| HostError::MalformedInbound {
                id: message.id.clone(),
                reason: e.to_string(),
            })?;

        // Clone out of the lock; listeners may call back into the host.
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&message.id)
            .cloned()
            .ok_or_else(|| HostError::UnknownResponse(message.id.clone()))?;

        debug!(message_id = %message.id, callback_id = %input.callback_id, "delivering user input");
        response.deliver_user_input(&input);
        Ok(())
    }

    /// Runs one chat turn on the participant `participant_id`.
    ///
    /// `input` may start with one of the participant's `/commands`. The
    /// response is routable for the duration of the turn.
    pub async fn handle_chat_request(
        self: &Arc<Self>,
        participant_id: &str,
        input: &str,
        response: Arc<dyn ChatResponse>,
    ) -> Result<TurnOutcome, HostError> {
        let participant = self
            .participant(participant_id)
            .ok_or_else(|| HostError::UnknownParticipant(participant_id.to_string()))?;

        let host: Arc<dyn Host> = self.clone();
        let request = ChatRequest::parse(host, input, &participant.commands());

        let _route = Route::open(self, Arc::clone(&response));
        let outcome = participant
            .handle_chat_request(&request, response.as_ref())
            .await?;
        Ok(outcome)
    }

    /// Asks every inline completion provider for context, in registration
    /// order, then finishes the response.
    ///
    /// A failing provider is logged and skipped.
    pub async fn collect_completion_context(
        self: &Arc<Self>,
        prompt: &str,
        response: &dyn ChatResponse,
    ) {
        let host: Arc<dyn Host> = self.clone();
        let request = ChatRequest::new(host, prompt);
        for provider in self.inline_completion_context_providers() {
            if let Err(e) = provider
                .handle_completion_context_request(&request, response)
                .await
            {
                warn!(provider = %provider.id(), error = %e, "completion context provider failed");
            }
        }
        response.finish();
    }
}

/// Keeps a response routed until dropped.
struct Route<'a> {
    host: &'a LocalHost,
    message_id: String,
}

impl<'a> Route<'a> {
    fn open(host: &'a LocalHost, response: Arc<dyn ChatResponse>) -> Self {
        let message_id = response.message_id().to_string();
        host.begin_response(response);
        Self { host, message_id }
    }
}

impl Drop for Route<'_> {
    fn drop(&mut self) {
        self.host.end_response(&self.message_id);
    }
}

impl Host for LocalHost {
    fn register_chat_participant(
        &self,
        participant: Arc<dyn ChatParticipant>,
    ) -> Result<(), HostError> {
        let mut participants = self
            .participants
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if participants.iter().any(|p| p.id() == participant.id()) {
            return Err(HostError::DuplicateParticipant(participant.id().to_string()));
        }
        info!(id = %participant.id(), "registered chat participant");
        participants.push(participant);
        Ok(())
    }

    fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), HostError> {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**tools).clone();
        let name = tool.name().to_string();
        next.register(tool)?;
        *tools = Arc::new(next);
        debug!(tool = %name, "registered tool");
        Ok(())
    }

    fn register_inline_completion_context_provider(
        &self,
        provider: Arc<dyn InlineCompletionContextProvider>,
    ) -> Result<(), HostError> {
        debug!(id = %provider.id(), "registered inline completion context provider");
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(provider);
        Ok(())
    }

    fn model(&self) -> Arc<dyn AiModel> {
        Arc::clone(&self.model)
    }

    fn orchestrator_config(&self) -> OrchestratorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssistantReply;
    use crate::message::Message;
    use crate::response::ChannelResponse;
    use crate::stream::{ConfirmationArgs, StreamChunk};
    use serde_json::{json, Value};

    struct NoModel;

    #[async_trait::async_trait]
    impl AiModel for NoModel {
        async fn completions(
            &self,
            _messages: &[Message],
            _tools: Option<&[Value]>,
        ) -> anyhow::Result<AssistantReply> {
            Ok(AssistantReply::text("unused"))
        }
    }

    struct Echo;

    #[async_trait::async_trait]
    impl ChatParticipant for Echo {
        fn id(&self) -> &str {
            "echo"
        }
        fn name(&self) -> &str {
            "Echo"
        }
        fn description(&self) -> &str {
            "Repeats the prompt"
        }
        async fn handle_chat_request(
            &self,
            request: &ChatRequest,
            response: &dyn ChatResponse,
        ) -> Result<TurnOutcome, crate::error::TurnError> {
            response.emit(StreamChunk::markdown(request.prompt.clone()), true);
            response.finish();
            Ok(TurnOutcome::Completed)
        }
    }

    struct Staticky;

    #[async_trait::async_trait]
    impl InlineCompletionContextProvider for Staticky {
        fn id(&self) -> &str {
            "static"
        }
        async fn handle_completion_context_request(
            &self,
            request: &ChatRequest,
            response: &dyn ChatResponse,
        ) -> anyhow::Result<()> {
            response.emit(StreamChunk::markdown(format!("ctx for {}", request.prompt)), false);
            Ok(())
        }
    }

    struct Bundle;

    impl Extension for Bundle {
        fn id(&self) -> &str {
            "bundle"
        }
        fn name(&self) -> &str {
            "Bundle"
        }
        fn activate(&self, host: &dyn Host) -> Result<(), HostError> {
            host.register_chat_participant(Arc::new(Echo))?;
            host.register_inline_completion_context_provider(Arc::new(Staticky))
        }
    }

    fn host() -> Arc<LocalHost> {
        Arc::new(LocalHost::new(Arc::new(NoModel)))
    }

    #[test]
    fn test_duplicate_participant_rejected() {
        let host = host();
        host.register_chat_participant(Arc::new(Echo)).unwrap();
        let err = host.register_chat_participant(Arc::new(Echo)).unwrap_err();
        assert!(matches!(err, HostError::DuplicateParticipant(ref id) if id == "echo"));
        assert_eq!(host.participants().len(), 1);
    }

    #[test]
    fn test_extension_activation_registers_its_parts() {
        let host = host();
        host.activate_extension(&Bundle).unwrap();

        assert!(host.participant("echo").is_some());
        assert_eq!(host.inline_completion_context_providers().len(), 1);
        assert_eq!(host.extensions(), vec!["bundle".to_string()]);
    }

    #[test]
    fn test_dispatch_routes_to_matching_response() {
        let host = host();
        let (response, _rx) = ChannelResponse::channel();
        let response = Arc::new(response);
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            response.add_user_input_listener(Arc::new(move |input: &UserInput| {
                seen.lock().unwrap().push(input.clone());
            }));
        }
        host.begin_response(response.clone());

        let inbound = ConfirmationArgs::new(response.message_id(), "call_9", true).into_inbound();
        host.dispatch_inbound(inbound).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].callback_id, "call_9");
        assert_eq!(seen[0].data, json!({"confirmed": true}));
    }

    #[test]
    fn test_dispatch_errors() {
        let host = host();

        let unknown = ConfirmationArgs::new("nope", "call_1", true).into_inbound();
        assert!(matches!(
            host.dispatch_inbound(unknown),
            Err(HostError::UnknownResponse(ref id)) if id == "nope"
        ));

        let (response, _rx) = ChannelResponse::channel();
        let id = response.message_id().to_string();
        host.begin_response(Arc::new(response));
        let malformed = InboundMessage {
            id: id.clone(),
            kind: RequestDataType::ChatUserInput,
            data: json!({"no_callback": true}),
        };
        assert!(matches!(
            host.dispatch_inbound(malformed),
            Err(HostError::MalformedInbound { .. })
        ));

        let request = InboundMessage {
            id,
            kind: RequestDataType::ChatRequest,
            data: json!({"prompt": "hi"}),
        };
        assert!(matches!(
            host.dispatch_inbound(request),
            Err(HostError::MalformedInbound { .. })
        ));
    }

    #[tokio::test]
    async fn test_handle_chat_request_routes_only_during_turn() {
        let host = host();
        host.register_chat_participant(Arc::new(Echo)).unwrap();
        let (response, mut rx) = ChannelResponse::channel();
        let response: Arc<dyn ChatResponse> = Arc::new(response);

        let outcome = host
            .handle_chat_request("echo", "hello", Arc::clone(&response))
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(host.active_responses(), 0);
        match rx.recv().await.unwrap() {
            crate::stream::ResponseEvent::Chunk { chunk, .. } => {
                assert_eq!(chunk, StreamChunk::markdown("hello"))
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_participant() {
        let host = host();
        let (response, _rx) = ChannelResponse::channel();
        let err = host
            .handle_chat_request("missing", "hi", Arc::new(response))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::UnknownParticipant(ref id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_completion_context_runs_providers_then_finishes() {
        let host = host();
        host.register_inline_completion_context_provider(Arc::new(Staticky))
            .unwrap();
        let (response, mut rx) = ChannelResponse::channel();

        host.collect_completion_context("fn main", &response).await;

        assert!(response.is_finished());
        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            crate::stream::ResponseEvent::Chunk { chunk: StreamChunk::Markdown(ref s), .. } if s == "ctx for fn main"
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            crate::stream::ResponseEvent::Finished { .. }
        ));
    }
}
