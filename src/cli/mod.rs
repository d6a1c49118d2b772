//! Command-line parsing and line input.

use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Agentloop - a coding agent that works inside the current directory.
///
/// Reads one request per line. Type `exit`, `quit` or `q` to leave.
#[derive(Debug, Parser)]
#[command(name = "agentloop")]
#[command(version)]
pub struct Cli {}

/// What to do with one line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Leave the session.
    Exit,
    /// Nothing to send.
    Skip,
    /// Send the line to the agent.
    Prompt(String),
}

/// Whether `input` asks to end the session.
#[must_use]
pub fn is_exit_command(input: &str) -> bool {
    let trimmed = input.trim();
    ["exit", "quit", "q"]
        .iter()
        .any(|word| trimmed.eq_ignore_ascii_case(word))
}

/// Classify one line of input.
#[must_use]
pub fn classify(line: &str) -> LineAction {
    if line.trim().is_empty() {
        LineAction::Skip
    } else if is_exit_command(line) {
        LineAction::Exit
    } else {
        LineAction::Prompt(line.to_string())
    }
}

/// Line-oriented prompt reader.
pub struct LineReader<R> {
    lines: Lines<R>,
}

impl LineReader<BufReader<Stdin>> {
    /// Read from standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Read from any buffered source.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Read and classify one line. End of input counts as [`LineAction::Exit`].
    ///
    /// # Errors
    ///
    /// Returns error if reading fails.
    pub async fn next_action(&mut self) -> std::io::Result<LineAction> {
        Ok(match self.lines.next_line().await? {
            Some(line) => classify(&line),
            None => LineAction::Exit,
        })
    }
}
