//! Environment variable substitution, API key resolution and defaulting
//! accessors.

use std::time::Duration;

use super::types::{Config, ModelConfig};
use crate::constants::{
    API_KEY_ENV_VARS, DEFAULT_BASE_URL, DEFAULT_MAX_ITERATIONS, DEFAULT_MODEL,
    DEFAULT_MODEL_TIMEOUT_SECS,
};
use crate::orchestrator::OrchestratorConfig;

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        for field in [
            &mut self.model.base_url,
            &mut self.model.api_key,
            &mut self.model.name,
        ] {
            if let Some(value) = field {
                *value = Self::resolve_str(value);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    pub(super) fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Resolve the API key: env vars first, then the config value.
    /// Empty values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        for var in API_KEY_ENV_VARS {
            if let Ok(val) = std::env::var(var) {
                if !val.is_empty() {
                    return Some(val);
                }
            }
        }

        self.model.api_key.clone().filter(|k| !k.is_empty())
    }

    /// Maximum model rounds per chat turn, `None` when set to zero.
    pub fn max_iterations(&self) -> Option<usize> {
        Some(
            self.orchestrator
                .max_iterations
                .unwrap_or(DEFAULT_MAX_ITERATIONS),
        )
        .filter(|&n| n > 0)
    }

    /// Confirmation timeout, `None` when unset or zero.
    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.orchestrator
            .confirmation_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Settings handed to each tool-call loop.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_iterations: self.max_iterations(),
            confirmation_timeout: self.confirmation_timeout(),
        }
    }
}

impl ModelConfig {
    pub fn model_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS))
    }
}
