//! Shared todo board with validated, all-or-nothing updates.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crossterm::style::{Color, Stylize};
use parking_lot::Mutex;

/// Maximum number of items a board may hold.
pub const MAX_TODO_ITEMS: usize = 20;

const PENDING_COLOR: Color = Color::Rgb {
    r: 176,
    g: 176,
    b: 176,
};
const PROGRESS_COLOR: Color = Color::Rgb {
    r: 120,
    g: 200,
    b: 255,
};
const COMPLETED_COLOR: Color = Color::Rgb {
    r: 34,
    g: 139,
    b: 34,
};

/// Lifecycle state of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    /// Wire token for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(TodoError::InvalidStatus(s.to_string())),
        }
    }
}

/// A proposed item, as received from the model, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDraft {
    pub id: String,
    pub content: String,
    pub active_form: String,
    pub status: String,
}

/// A validated todo item stored on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub active_form: String,
    pub status: TodoStatus,
}

/// Reasons a proposed list is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("todo list is limited to {MAX_TODO_ITEMS} items")]
    TooMany,

    #[error("duplicate todo id: {0}")]
    DuplicateId(String),

    #[error("todo content cannot be empty")]
    EmptyContent,

    #[error("todo activeForm cannot be empty")]
    EmptyActiveForm,

    #[error("status must be one of: pending, in_progress, completed (got {0:?})")]
    InvalidStatus(String),

    #[error("only one task can be in_progress at a time")]
    MultipleInProgress,
}

/// Item counts for the current board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

/// The shared task board.
///
/// Every operation takes the same lock. Updates validate the whole proposal
/// before touching the stored list.
#[derive(Debug, Default)]
pub struct TaskBoard {
    items: Mutex<Vec<TodoItem>>,
}

impl TaskBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board with `drafts` if they form a valid list.
    ///
    /// On success returns the rendered board; on failure the stored list is
    /// left exactly as it was.
    pub fn update(&self, drafts: Vec<TodoDraft>) -> Result<String, TodoError> {
        let validated = validate(drafts)?;

        let mut items = self.items.lock();
        *items = validated;
        Ok(render_items(&items))
    }

    /// Render the board for display.
    #[must_use]
    pub fn render(&self) -> String {
        render_items(&self.items.lock())
    }

    /// Count items by status.
    #[must_use]
    pub fn stats(&self) -> TodoStats {
        let items = self.items.lock();
        TodoStats {
            total: items.len(),
            completed: items
                .iter()
                .filter(|item| item.status == TodoStatus::Completed)
                .count(),
            in_progress: items
                .iter()
                .filter(|item| item.status == TodoStatus::InProgress)
                .count(),
        }
    }

    /// Snapshot of the stored items.
    #[must_use]
    pub fn items(&self) -> Vec<TodoItem> {
        self.items.lock().clone()
    }
}

fn validate(drafts: Vec<TodoDraft>) -> Result<Vec<TodoItem>, TodoError> {
    if drafts.len() > MAX_TODO_ITEMS {
        return Err(TodoError::TooMany);
    }

    let mut seen = HashSet::new();
    let mut in_progress = 0;
    let mut items = Vec::with_capacity(drafts.len());

    for draft in drafts {
        if !seen.insert(draft.id.clone()) {
            return Err(TodoError::DuplicateId(draft.id));
        }
        if draft.content.trim().is_empty() {
            return Err(TodoError::EmptyContent);
        }
        if draft.active_form.trim().is_empty() {
            return Err(TodoError::EmptyActiveForm);
        }

        let status: TodoStatus = draft.status.parse()?;
        if status == TodoStatus::InProgress {
            in_progress += 1;
        }

        items.push(TodoItem {
            id: draft.id,
            content: draft.content,
            active_form: draft.active_form,
            status,
        });
    }

    if in_progress > 1 {
        return Err(TodoError::MultipleInProgress);
    }

    Ok(items)
}

fn render_items(items: &[TodoItem]) -> String {
    if items.is_empty() {
        return "☐ No todos yet".with(PENDING_COLOR).to_string();
    }

    items
        .iter()
        .map(|item| match item.status {
            TodoStatus::Completed => format!("☒ {}", item.content)
                .with(COMPLETED_COLOR)
                .crossed_out()
                .to_string(),
            TodoStatus::InProgress => format!("☐ {}", item.content)
                .with(PROGRESS_COLOR)
                .to_string(),
            TodoStatus::Pending => format!("☐ {}", item.content)
                .with(PENDING_COLOR)
                .to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
