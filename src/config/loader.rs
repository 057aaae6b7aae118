//! File loading and merging for parley configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{Config, ModelConfig, OrchestratorSection};
use crate::constants::{DEFAULT_BASE_URL, DEFAULT_MODEL, PROJECT_CONFIG_FILENAME};
use crate::permissions::PermissionConfig;

impl Config {
    /// Loads the global config from `~/.config/parley/config.toml`.
    ///
    /// If no config file exists, writes one with defaults (including an
    /// `{env:VAR}` placeholder for the API key) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = Self::default_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Contents written on first run.
    pub(super) fn default_toml() -> String {
        format!(
            r#"[model]
base_url = "{DEFAULT_BASE_URL}"
name = "{DEFAULT_MODEL}"
api_key = "{{env:OPENAI_API_KEY}}"

[orchestrator]
# Model rounds per turn before giving up; 0 means no limit
max_iterations = {max_iterations}

[permissions.tools]
read_file = "allow"
list_files = "allow"
write_file = "ask"
run_command = "ask"
"#,
            max_iterations = crate::constants::DEFAULT_MAX_ITERATIONS,
        )
    }

    /// Look for parley.toml in `start`, then walk up to the git root.
    pub(super) fn load_project(start: &Path) -> Result<Option<Config>> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config at {:?}", candidate))?;
                return Ok(Some(config));
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut tools = global.permissions.tools;
        tools.extend(project.permissions.tools);

        Config {
            model: ModelConfig {
                base_url: project.model.base_url.or(global.model.base_url),
                api_key: project.model.api_key.or(global.model.api_key),
                name: project.model.name.or(global.model.name),
                timeout_secs: project.model.timeout_secs.or(global.model.timeout_secs),
            },
            orchestrator: OrchestratorSection {
                max_iterations: project
                    .orchestrator
                    .max_iterations
                    .or(global.orchestrator.max_iterations),
                confirmation_timeout_secs: project
                    .orchestrator
                    .confirmation_timeout_secs
                    .or(global.orchestrator.confirmation_timeout_secs),
            },
            permissions: PermissionConfig { tools },
        }
    }
}
