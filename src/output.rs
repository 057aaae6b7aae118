//! Output rendering for parley.
//!
//! Defines the [`Renderer`] trait that decouples a turn's response events from
//! the display. [`TerminalRenderer`] prints chunks for a human;
//! [`JsonRenderer`] writes one JSON object per line for other programs.

use colored::Colorize;
use serde_json::json;
use std::io::{self, Write};

use crate::orchestrator::TurnOutcome;
use crate::stream::{ResponseEvent, StreamChunk};

/// Trait for rendering a turn's output.
pub trait Renderer {
    /// Render one event as it arrives.
    fn render_event(&mut self, event: &ResponseEvent);

    /// Called once the turn has ended without error.
    fn render_outcome(&mut self, outcome: TurnOutcome);

    /// Called when the turn failed.
    fn render_error(&mut self, err: &str);
}

/// Renders chunks to stdout with terminal colors.
#[derive(Default)]
pub struct TerminalRenderer {
    chunk_count: usize,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks rendered so far.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Formats one chunk for the terminal. Returns `None` for chunks with
    /// nothing to show.
    pub fn format_chunk(chunk: &StreamChunk) -> Option<String> {
        let text = match chunk {
            StreamChunk::Markdown(text) => text.clone(),
            StreamChunk::Html(html) => html.dimmed().to_string(),
            StreamChunk::LlmRaw(value) => value.to_string().dimmed().to_string(),
            StreamChunk::Button { title, .. } => format!("[{}]", title.bold()),
            StreamChunk::Anchor { uri, title } => format!("{} <{}>", title, uri.underline()),
            StreamChunk::Progress { title } => format!("{} {}", "…".dimmed(), title.dimmed()),
            StreamChunk::Confirmation { title, message, .. } => {
                format!("{}\n{}", title.yellow().bold(), message)
            }
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render_event(&mut self, event: &ResponseEvent) {
        let ResponseEvent::Chunk { chunk, .. } = event else {
            return;
        };
        self.chunk_count += 1;
        if let Some(text) = Self::format_chunk(chunk) {
            println!("{}", text);
            // Flush so output shows up before a confirmation prompt
            io::stdout().flush().ok();
        }
    }

    fn render_outcome(&mut self, outcome: TurnOutcome) {
        println!();
        let label = match outcome {
            TurnOutcome::Completed => "[done]".dimmed(),
            TurnOutcome::Cancelled => "[cancelled]".yellow(),
        };
        println!("{}", label);
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}

/// Writes every event as a JSON line, followed by an outcome or error line.
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl JsonRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, value: &impl serde::Serialize) {
        match serde_json::to_string(value) {
            Ok(line) => {
                let _ = writeln!(self.out, "{}", line);
                let _ = self.out.flush();
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize output line"),
        }
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render_event(&mut self, event: &ResponseEvent) {
        self.write_line(event);
    }

    fn render_outcome(&mut self, outcome: TurnOutcome) {
        let outcome = match outcome {
            TurnOutcome::Completed => "completed",
            TurnOutcome::Cancelled => "cancelled",
        };
        self.write_line(&json!({"event": "outcome", "outcome": outcome}));
    }

    fn render_error(&mut self, err: &str) {
        self.write_line(&json!({"event": "error", "message": err}));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ConfirmationArgs;
    use serde_json::Value;

    #[test]
    fn test_format_markdown_verbatim() {
        assert_eq!(
            TerminalRenderer::format_chunk(&StreamChunk::markdown("**hi**")),
            Some("**hi**".to_string())
        );
        assert_eq!(TerminalRenderer::format_chunk(&StreamChunk::markdown("")), None);
    }

    #[test]
    fn test_format_confirmation_shows_title_and_message() {
        colored::control::set_override(false);
        let chunk = StreamChunk::Confirmation {
            title: "Write file".into(),
            message: "Apply?".into(),
            confirm_args: ConfirmationArgs::new("m", "c", true),
            cancel_args: ConfirmationArgs::new("m", "c", false),
        };
        assert_eq!(
            TerminalRenderer::format_chunk(&chunk),
            Some("Write file\nApply?".to_string())
        );
    }

    #[test]
    fn test_json_renderer_writes_lines() {
        let mut renderer = JsonRenderer::new(Vec::new());
        renderer.render_event(&ResponseEvent::Chunk {
            message_id: "m1".into(),
            chunk: StreamChunk::markdown("hello"),
            is_final: false,
        });
        renderer.render_event(&ResponseEvent::Finished {
            message_id: "m1".into(),
        });
        renderer.render_outcome(TurnOutcome::Cancelled);

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "chunk");
        assert_eq!(lines[0]["chunk"], json!({"type": "markdown", "content": "hello"}));
        assert_eq!(lines[1]["event"], "finished");
        assert_eq!(lines[2], json!({"event": "outcome", "outcome": "cancelled"}));
    }

    #[test]
    fn test_terminal_renderer_counts_chunks_only() {
        let mut renderer = TerminalRenderer::new();
        renderer.render_event(&ResponseEvent::Chunk {
            message_id: "m".into(),
            chunk: StreamChunk::Progress { title: "working".into() },
            is_final: false,
        });
        renderer.render_event(&ResponseEvent::Finished {
            message_id: "m".into(),
        });
        assert_eq!(renderer.chunk_count(), 1);
    }
}
