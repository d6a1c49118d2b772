//! Tool registry and dispatch.
//!
//! The set of tools is closed: [`ToolKind`] names every tool the model may
//! call and [`ToolInvocation`] carries its decoded arguments. Every failure
//! below the router becomes text for the model rather than an error for the
//! driver.

mod args;
mod fs;
mod shell;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;

pub use args::{BashArgs, EditTextArgs, LooseInt, ReadFileArgs, TodoArg, TodoWriteArgs, WriteFileArgs};

use super::session::Session;
use super::types::Tool;
use crate::core::sandbox::{Sandbox, SandboxError, is_dangerous_command};
use crate::core::text::{MAX_TOOL_RESULT_CHARS, PREVIEW_CHARS, clamp};
use crate::core::todo::{MAX_TODO_ITEMS, TodoDraft, TodoError};

/// Errors produced while running a tool. Their text is returned to the model.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Error parsing arguments: {0}")]
    Arguments(String),

    #[error("unknown tool: {0}")]
    Unknown(String),

    /// A required field is missing or a value is out of range.
    #[error("{0}")]
    Invalid(String),

    #[error("blocked dangerous command")]
    Blocked,

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Todo(#[from] TodoError),
}

impl ToolError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Every tool the model can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Bash,
    ReadFile,
    WriteFile,
    EditText,
    TodoWrite,
}

impl ToolKind {
    /// All tools, in the order they are advertised.
    pub const ALL: [Self; 5] = [
        Self::Bash,
        Self::ReadFile,
        Self::WriteFile,
        Self::EditText,
        Self::TodoWrite,
    ];

    /// Wire name of the tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::EditText => "edit_text",
            Self::TodoWrite => "TodoWrite",
        }
    }

    /// Look a tool up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Function declaration advertised to the model.
    #[must_use]
    pub fn definition(self) -> Tool {
        let (description, parameters) = match self {
            Self::Bash => (
                "Execute a shell command inside the project workspace. Use for scaffolding, formatting, running scripts, etc.",
                json!({
                    "type": "object",
                    "properties": {
                        "command": {"type": "string", "description": "Shell command to run"},
                        "timeout_ms": {"type": "integer", "minimum": 1000, "maximum": 120_000}
                    },
                    "required": ["command"],
                    "additionalProperties": false
                }),
            ),
            Self::ReadFile => (
                "Read a UTF-8 text file. Optionally slice by line range or clamp length.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string"},
                        "start_line": {"type": "integer", "minimum": 1},
                        "end_line": {"type": "integer", "minimum": -1},
                        "max_chars": {"type": "integer", "minimum": 1, "maximum": 200_000}
                    },
                    "required": ["path"],
                    "additionalProperties": false
                }),
            ),
            Self::WriteFile => (
                "Create or overwrite/append a UTF-8 text file. Use overwrite unless explicitly asked to append.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string"},
                        "content": {"type": "string"},
                        "mode": {"type": "string", "enum": ["overwrite", "append"], "default": "overwrite"}
                    },
                    "required": ["path", "content"],
                    "additionalProperties": false
                }),
            ),
            Self::EditText => (
                "Small, precise text edits. Choose one action: replace | insert | delete_range.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string"},
                        "action": {"type": "string", "enum": ["replace", "insert", "delete_range"]},
                        "find": {"type": "string"},
                        "replace": {"type": "string"},
                        "insert_after": {"type": "integer", "minimum": -1},
                        "new_text": {"type": "string"},
                        "range": {
                            "type": "array",
                            "items": {"type": "integer"},
                            "minItems": 2,
                            "maxItems": 2
                        }
                    },
                    "required": ["path", "action"],
                    "additionalProperties": false
                }),
            ),
            Self::TodoWrite => (
                "Update the shared todo list (pending | in_progress | completed).",
                json!({
                    "type": "object",
                    "properties": {
                        "items": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "id": {"type": "string"},
                                    "content": {"type": "string"},
                                    "activeForm": {"type": "string"},
                                    "status": {"type": "string", "enum": ["pending", "in_progress", "completed"]}
                                },
                                "required": ["content", "activeForm", "status"],
                                "additionalProperties": false
                            },
                            "maxItems": MAX_TODO_ITEMS
                        }
                    },
                    "required": ["items"],
                    "additionalProperties": false
                }),
            ),
        };

        Tool {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// A tool call with its arguments decoded.
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    Bash(BashArgs),
    ReadFile(ReadFileArgs),
    WriteFile(WriteFileArgs),
    EditText(EditTextArgs),
    TodoWrite(TodoWriteArgs),
}

impl ToolInvocation {
    /// Decode the JSON-encoded `arguments` of a call to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Arguments`] when the payload is not a JSON object
    /// or does not fit the tool, and [`ToolError::Unknown`] for unknown names.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let value: serde_json::Value =
            serde_json::from_str(arguments).map_err(|e| ToolError::Arguments(e.to_string()))?;
        if !value.is_object() {
            return Err(ToolError::Arguments("expected a JSON object".to_string()));
        }

        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::Unknown(name.to_string()))?;
        Ok(match kind {
            ToolKind::Bash => Self::Bash(decode(value)?),
            ToolKind::ReadFile => Self::ReadFile(decode(value)?),
            ToolKind::WriteFile => Self::WriteFile(decode(value)?),
            ToolKind::EditText => Self::EditText(decode(value)?),
            ToolKind::TodoWrite => Self::TodoWrite(decode(value)?),
        })
    }

    /// Which tool this invocation targets.
    #[must_use]
    pub const fn kind(&self) -> ToolKind {
        match self {
            Self::Bash(_) => ToolKind::Bash,
            Self::ReadFile(_) => ToolKind::ReadFile,
            Self::WriteFile(_) => ToolKind::WriteFile,
            Self::EditText(_) => ToolKind::EditText,
            Self::TodoWrite(_) => ToolKind::TodoWrite,
        }
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(value).map_err(|e| ToolError::Arguments(e.to_string()))
}

/// Result of one dispatched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text for the tool-role message, clamped to the configured cap.
    pub content: String,
    /// Shorter excerpt for the terminal.
    pub preview: String,
    /// Whether the tool failed.
    pub is_error: bool,
}

/// Routes tool calls to their implementations.
#[derive(Debug, Clone)]
pub struct ToolRouter {
    sandbox: Sandbox,
    session: Arc<Session>,
    max_result_chars: usize,
}

impl ToolRouter {
    /// Create a router confined to `sandbox`, sharing `session` with the driver.
    #[must_use]
    pub const fn new(sandbox: Sandbox, session: Arc<Session>, max_result_chars: usize) -> Self {
        Self {
            sandbox,
            session,
            max_result_chars,
        }
    }

    /// The workspace sandbox.
    #[must_use]
    pub const fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Declarations for every tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<Tool> {
        ToolKind::ALL.into_iter().map(ToolKind::definition).collect()
    }

    /// Decode and run one call.
    ///
    /// Never fails: argument, policy, sandbox and I/O errors are rendered into
    /// the outcome text and flagged with `is_error`.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> ToolOutcome {
        let result = match ToolInvocation::parse(name, arguments) {
            Ok(invocation) => self.execute(invocation).await,
            Err(e) => Err(e),
        };

        let (text, is_error) = match result {
            Ok(text) => (text, false),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool failed");
                (e.to_string(), true)
            }
        };

        ToolOutcome {
            content: clamp(&text, self.max_result_chars),
            preview: clamp(&text, PREVIEW_CHARS),
            is_error,
        }
    }

    /// Run a decoded invocation.
    ///
    /// # Errors
    ///
    /// Returns the tool's failure; see [`ToolError`].
    pub async fn execute(&self, invocation: ToolInvocation) -> Result<String, ToolError> {
        tracing::info!(tool = invocation.kind().name(), "executing tool");

        match invocation {
            ToolInvocation::Bash(args) => self.execute_bash(args).await,
            ToolInvocation::ReadFile(args) => fs::read_file(&self.sandbox, args).await,
            ToolInvocation::WriteFile(args) => fs::write_file(&self.sandbox, args).await,
            ToolInvocation::EditText(args) => fs::edit_text(&self.sandbox, args).await,
            ToolInvocation::TodoWrite(args) => self.execute_todo_write(args),
        }
    }

    async fn execute_bash(&self, args: BashArgs) -> Result<String, ToolError> {
        let command = args.command.as_deref().map(str::trim).unwrap_or_default();
        if command.is_empty() {
            return Err(ToolError::invalid("missing bash.command"));
        }
        if is_dangerous_command(command) {
            tracing::warn!(command = %command, "blocked dangerous command");
            return Err(ToolError::Blocked);
        }

        let timeout = shell::timeout_from(args.timeout_ms);
        let output = shell::run(self.sandbox.root(), command, timeout).await?;
        Ok(clamp(&output, MAX_TOOL_RESULT_CHARS))
    }

    fn execute_todo_write(&self, args: TodoWriteArgs) -> Result<String, ToolError> {
        let items = args
            .items
            .ok_or_else(|| ToolError::invalid("missing items parameter"))?;

        let drafts = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| TodoDraft {
                id: non_blank(item.id).unwrap_or_else(|| (i + 1).to_string()),
                content: item.content.unwrap_or_default(),
                active_form: item.active_form.unwrap_or_default(),
                status: non_blank(item.status).unwrap_or_else(|| "pending".to_string()),
            })
            .collect();

        let board = self.session.board();
        let view = board.update(drafts)?;
        self.session.reset_idle_rounds();

        let stats = board.stats();
        let summary = if stats.total == 0 {
            "No todos have been created.".to_string()
        } else {
            format!(
                "Status updated: {} completed, {} in progress.",
                stats.completed, stats.in_progress
            )
        };

        Ok(format!("{view}\n\n{summary}"))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Short one-line description of a call for the terminal.
#[must_use]
pub fn format_tool_invocation(name: &str, arguments: &str) -> String {
    const MAX_LEN: usize = 60;

    let input: serde_json::Value = serde_json::from_str(arguments).unwrap_or_default();
    let field = |key: &str| {
        input
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    let raw = match ToolKind::from_name(name) {
        Some(ToolKind::Bash) => field("command"),
        Some(ToolKind::ReadFile | ToolKind::WriteFile | ToolKind::EditText) => field("path"),
        Some(ToolKind::TodoWrite) => "updating todos".to_string(),
        None => input
            .as_object()
            .and_then(|obj| obj.values().find_map(|v| v.as_str()))
            .unwrap_or("")
            .to_string(),
    };

    if raw.chars().count() > MAX_LEN {
        let head: String = raw.chars().take(MAX_LEN - 3).collect();
        format!("{head}...")
    } else {
        raw
    }
}
