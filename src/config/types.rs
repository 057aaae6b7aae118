//! Struct definitions for parley configuration.
//!
//! Every field is optional so a partial project file can be layered over the
//! global one; accessors in `resolve.rs` supply the defaults.

use crate::permissions::PermissionConfig;
use serde::{Deserialize, Serialize};

/// Root configuration, deserialized from `config.toml` / `parley.toml`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Model backend settings.
    #[serde(default)]
    pub model: ModelConfig,
    /// Tool-call loop settings.
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    /// Permission settings for tool execution.
    #[serde(default)]
    pub permissions: PermissionConfig,
}

/// Connection details for the OpenAI-compatible backend.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ModelConfig {
    /// Endpoint including the version path, e.g. `https://api.openai.com/v1`.
    pub base_url: Option<String>,
    /// API key. Environment variables take precedence.
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub name: Option<String>,
    /// HTTP timeout for one completion request.
    pub timeout_secs: Option<u64>,
}

/// `[orchestrator]` section.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OrchestratorSection {
    /// Maximum model rounds per chat turn. 0 means no limit.
    pub max_iterations: Option<usize>,
    /// How long to wait for a confirmation answer. Unset waits forever.
    pub confirmation_timeout_secs: Option<u64>,
}
