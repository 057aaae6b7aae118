//! Entry point for parley, a tool-calling chat agent for the terminal.
//!
//! This binary loads environment variables, installs the log subscriber,
//! parses CLI arguments via [`parley::cli`], and dispatches the chosen
//! subcommand.

use anyhow::Result;
use parley::cli;
use parley::constants::{DEFAULT_LOG_FILTER, LOG_ENV_VAR};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = cli::parse();
    cli::run(cli).await
}

/// Logs go to stderr so stdout stays clean for rendered or JSON output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
