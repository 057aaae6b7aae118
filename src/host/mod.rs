//! The host boundary: what participants, tools and extensions can ask of the
//! application embedding them.

mod local;

pub use local::LocalHost;

use std::sync::Arc;

use crate::error::HostError;
use crate::model::AiModel;
use crate::orchestrator::OrchestratorConfig;
use crate::participant::{ChatParticipant, ChatRequest};
use crate::response::ChatResponse;
use crate::tools::Tool;

/// Registration surface and shared services of a host application.
pub trait Host: Send + Sync {
    fn register_chat_participant(
        &self,
        participant: Arc<dyn ChatParticipant>,
    ) -> Result<(), HostError>;

    fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), HostError>;

    fn register_inline_completion_context_provider(
        &self,
        provider: Arc<dyn InlineCompletionContextProvider>,
    ) -> Result<(), HostError>;

    /// The model every participant's turns run against.
    fn model(&self) -> Arc<dyn AiModel>;

    fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
    }
}

/// Supplies extra context for inline code completions.
#[async_trait::async_trait]
pub trait InlineCompletionContextProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Streams context for `request` into `response`. Does not finish it.
    async fn handle_completion_context_request(
        &self,
        request: &ChatRequest,
        response: &dyn ChatResponse,
    ) -> anyhow::Result<()>;
}

/// A bundle of participants, tools and providers installed into a host.
pub trait Extension: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn activate(&self, host: &dyn Host) -> Result<(), HostError>;
}
