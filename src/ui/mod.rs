//! Terminal presentation of agent activity.
//!
//! Rendering is driven entirely by [`AgentEvent`]s and never feeds back into
//! the agent loop.

mod spinner;

use std::io::Write;
use std::path::Path;

use crossterm::style::Stylize;

pub use spinner::Spinner;

use crate::core::agent::AgentEvent;

const SPINNER_LABEL: &str = "Waiting for model";

/// Startup banner naming the workspace.
#[must_use]
pub fn banner(work_dir: &Path) -> String {
    format!(
        "Agentloop -- cwd: {}\nType \"exit\" or \"quit\" to leave.\n",
        work_dir.display()
    )
}

/// `[tool] name(summary)`, or `[tool] name` without a summary.
#[must_use]
pub fn tool_line(name: &str, summary: &str) -> String {
    if summary.is_empty() {
        format!("[tool] {name}")
    } else {
        format!("[tool] {name}({summary})")
    }
}

/// Indented result preview under a tool line.
#[must_use]
pub fn sub_line(text: &str) -> String {
    format!("  -> {text}")
}

/// Renders agent events to stdout.
pub struct ConsoleView<W: Write = std::io::Stdout> {
    out: W,
    spinner: Spinner,
    styled: bool,
    text_open: bool,
}

impl ConsoleView {
    /// A view on stdout; spinner and colors only when stdout is a terminal.
    #[must_use]
    pub fn stdout() -> Self {
        let spinner = Spinner::new(SPINNER_LABEL);
        let styled = std::io::IsTerminal::is_terminal(&std::io::stdout());
        Self::with_writer(std::io::stdout(), spinner, styled)
    }
}

impl<W: Write> ConsoleView<W> {
    /// A view writing to `out`.
    pub const fn with_writer(out: W, spinner: Spinner, styled: bool) -> Self {
        Self {
            out,
            spinner,
            styled,
            text_open: false,
        }
    }

    /// Render one event.
    pub fn handle(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::RequestStarted => self.spinner.start(),
            AgentEvent::Text(text) => {
                self.spinner.stop();
                let _ = write!(self.out, "{text}");
                let _ = self.out.flush();
                self.text_open = true;
            }
            AgentEvent::ResponseFinished => {
                self.spinner.stop();
                self.close_text();
            }
            AgentEvent::ToolStarted { name, summary } => {
                self.close_text();
                let line = tool_line(&name, &summary);
                if self.styled {
                    let _ = writeln!(self.out, "{}", line.dark_cyan());
                } else {
                    let _ = writeln!(self.out, "{line}");
                }
            }
            AgentEvent::ToolFinished {
                preview, is_error, ..
            } => {
                let line = sub_line(&preview);
                if self.styled && is_error {
                    let _ = writeln!(self.out, "{}", line.red());
                } else {
                    let _ = writeln!(self.out, "{line}");
                }
            }
        }
    }

    /// Print an error for the current turn.
    pub fn error(&mut self, message: &str) {
        self.spinner.stop();
        self.close_text();
        let _ = writeln!(self.out, "Error: {message}");
    }

    /// Consume the view and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn close_text(&mut self) {
        if self.text_open {
            let _ = writeln!(self.out);
            self.text_open = false;
        }
    }
}
