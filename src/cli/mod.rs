//! Command-line interface definition and dispatch for parley.
//!
//! Uses [`clap`] for argument parsing with derive macros. `ask` runs one chat
//! turn through an in-process [`LocalHost`], answering confirmation prompts
//! from stdin.

use crate::config::Config;
use crate::host::{Host, LocalHost};
use crate::model::openai::OpenAiCompatModel;
use crate::output::{JsonRenderer, Renderer, TerminalRenderer};
use crate::participant::ToolAssistant;
use crate::permissions::{Permission, PermissionPolicy};
use crate::response::ChannelResponse;
use crate::stream::{ResponseEvent, StreamChunk};
use crate::tools::{ToolRegistry, BUILTIN_TOOLS};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Top-level CLI structure for parley.
#[derive(Parser)]
#[command(name = "parley", about = "A tool-calling chat agent for your project")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the parley CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Ask the assistant something; it may use tools to answer
    Ask {
        /// The question to ask
        prompt: Vec<String>,
        /// Print response events as JSON lines
        #[arg(long)]
        json: bool,
        /// Approve every tool confirmation without asking
        #[arg(short, long)]
        yes: bool,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
        /// OpenAI-compatible endpoint (overrides config)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// List built-in tools and their permissions
    Tools,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective config
    Show,
    /// Print the global config file path
    Path,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            prompt,
            json,
            yes,
            model,
            base_url,
        } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: parley ask \"your question here\"");
            }

            let mut config = Config::load()?;
            if model.is_some() {
                config.model.name = model;
            }
            if base_url.is_some() {
                config.model.base_url = base_url;
            }

            let mut renderer: Box<dyn Renderer> = if json {
                Box::new(JsonRenderer::stdout())
            } else {
                println!(
                    "{} [model: {}]",
                    crate::constants::APP_NAME.bold().cyan(),
                    config.model.model_name().yellow(),
                );
                println!();
                println!("{} {}", ">".green().bold(), prompt);
                println!();
                Box::new(TerminalRenderer::new())
            };

            let host = build_host(&config)?;
            ask(&host, &prompt, renderer.as_mut(), move || async move {
                yes || ask_yes_no().await
            })
            .await
        }
        Commands::Tools => {
            let config = Config::load()?;
            list_tools(&config)
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => {
                    let config = Config::load()?;
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    println!("{}", toml::to_string_pretty(&redacted(config))?);
                }
                ConfigAction::Path => {
                    println!("{}", Config::config_path()?.display());
                }
            }
            Ok(())
        }
    }
}

/// Wires the model backend, built-in tools and the default participant into
/// a host.
fn build_host(config: &Config) -> Result<Arc<LocalHost>> {
    let model = OpenAiCompatModel::from_config(&config.model, config.resolve_api_key())?;
    let host = Arc::new(
        LocalHost::new(Arc::new(model)).with_orchestrator_config(config.orchestrator_config()),
    );

    let project_root = std::env::current_dir()?;
    let policy = PermissionPolicy::new(config.permissions.clone());
    for tool in ToolRegistry::with_builtins(project_root, &policy).list() {
        host.register_tool(Arc::clone(tool))?;
    }
    host.register_chat_participant(Arc::new(ToolAssistant::new(host.tool_registry())))?;
    Ok(host)
}

/// Runs one turn, rendering events and answering prompts as they arrive.
///
/// `answer` is called once per confirmation prompt and resolves to the
/// user's decision.
async fn ask<F, Fut>(
    host: &Arc<LocalHost>,
    prompt: &str,
    renderer: &mut dyn Renderer,
    answer: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let (response, rx) = ChannelResponse::channel();
    let response = Arc::new(response);

    let turn = host.handle_chat_request(ToolAssistant::ID, prompt, response.clone());
    let pump = pump_events(host, rx, renderer, answer);
    let (result, ()) = tokio::join!(turn, pump);

    match result {
        Ok(outcome) => {
            renderer.render_outcome(outcome);
            Ok(())
        }
        Err(e) => {
            renderer.render_error(&format!("{e:#}"));
            Err(e.into())
        }
    }
}

/// Forwards events to the renderer until the turn finishes. Confirmation
/// prompts are answered and routed back through the host.
///
/// The turn can end while a prompt is still open, for example when the
/// confirmation times out. The pending answer is then abandoned.
async fn pump_events<F, Fut>(
    host: &LocalHost,
    mut rx: UnboundedReceiver<ResponseEvent>,
    renderer: &mut dyn Renderer,
    mut answer: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    while let Some(event) = rx.recv().await {
        renderer.render_event(&event);
        match event {
            ResponseEvent::Chunk {
                chunk:
                    StreamChunk::Confirmation {
                        confirm_args,
                        cancel_args,
                        ..
                    },
                ..
            } => {
                let decision = answer();
                tokio::pin!(decision);
                let confirmed = loop {
                    tokio::select! {
                        confirmed = &mut decision => break confirmed,
                        next = rx.recv() => match next {
                            Some(event) => {
                                renderer.render_event(&event);
                                if matches!(event, ResponseEvent::Finished { .. }) {
                                    debug!("turn ended while a confirmation was open");
                                    return;
                                }
                            }
                            None => return,
                        },
                    }
                };
                let reply = if confirmed { confirm_args } else { cancel_args };
                if let Err(e) = host.dispatch_inbound(reply.into_inbound()) {
                    warn!(error = %e, "failed to deliver confirmation");
                }
            }
            ResponseEvent::Finished { .. } => break,
            ResponseEvent::Chunk { .. } => {}
        }
    }
}

/// Reads a y/N answer from stdin without blocking the runtime.
/// Read failures count as "no".
async fn ask_yes_no() -> bool {
    eprint!("{} ", "Allow? [y/N]".yellow().bold());
    std::io::stderr().flush().ok();

    // A detached thread rather than spawn_blocking: an abandoned read must
    // not hold up runtime shutdown.
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = tx.send(std::io::stdin().read_line(&mut line).map(|_| line));
    });

    match rx.await {
        Ok(Ok(line)) => is_yes(&line),
        Ok(Err(e)) => {
            warn!(error = %e, "failed to read confirmation answer");
            false
        }
        Err(_) => {
            warn!("confirmation reader exited without an answer");
            false
        }
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Prints every built-in tool with its effective permission.
fn list_tools(config: &Config) -> Result<()> {
    let project_root = std::env::current_dir().context("Failed to read current directory")?;
    let policy = PermissionPolicy::new(config.permissions.clone());
    let registry = ToolRegistry::with_builtins(project_root, &policy);

    for name in BUILTIN_TOOLS {
        let permission = match policy.check(name) {
            Permission::Allow => "allow".green(),
            Permission::Ask => "ask".yellow(),
            Permission::Deny => "deny".red(),
        };
        let description = registry
            .find_by_name(name)
            .map(|t| t.description().to_string())
            .unwrap_or_else(|| "(disabled)".to_string());
        println!("{:<12} {:<6} {}", name.bold(), permission, description.dimmed());
    }
    Ok(())
}

/// Hides the API key before printing the config.
fn redacted(mut config: Config) -> Config {
    if config.model.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        config.model.api_key = Some("********".to_string());
    }
    config
}
