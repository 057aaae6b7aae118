//! Centralized constants for parley.
//!
//! Defaults, file names and tool limits live here so they can be changed in
//! one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "parley";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "parley.toml";

// --- Model backend ---

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Default HTTP timeout for a single completion request.
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Environment variables checked for an API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["PARLEY_API_KEY", "OPENAI_API_KEY"];

// --- Orchestrator ---

/// Upper bound on model rounds in one chat turn. Configuring 0 removes it.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Prefix streamed before a tool's informational pre-invoke message.
pub const PRE_INVOKE_MARK: &str = "&#x2713;";

// --- Logging ---

/// Environment variable holding the tracing filter.
pub const LOG_ENV_VAR: &str = "PARLEY_LOG";

/// Filter used when [`LOG_ENV_VAR`] is unset.
pub const DEFAULT_LOG_FILTER: &str = "parley=warn";

// --- Tool limits ---

/// Maximum file size (bytes) the read_file tool will read.
pub const READ_FILE_MAX_SIZE: u64 = 100 * 1024;

/// Byte threshold for binary file detection (check first N bytes for null).
pub const BINARY_DETECTION_BYTES: usize = 8192;

/// Maximum number of results the list_files tool returns.
pub const LIST_FILES_MAX_RESULTS: usize = 1000;

/// Default timeout for run_command.
pub const COMMAND_DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Output cap for run_command, in bytes.
pub const COMMAND_MAX_OUTPUT_SIZE: usize = 30 * 1024;

/// Environment variables removed before run_command spawns a shell.
pub const COMMAND_STRIPPED_ENV_VARS: &[&str] = &[
    "PARLEY_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "OPENROUTER_API_KEY",
];
