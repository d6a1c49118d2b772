//! File tools: `read_file`, `write_file` and `edit_text`.
//!
//! Paths go through the sandbox first. Line-oriented operations split on
//! `\n` only and join back with `\n`.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::ToolError;
use super::args::{EditTextArgs, ReadFileArgs, WriteFileArgs};
use crate::core::sandbox::Sandbox;
use crate::core::text::{MAX_TOOL_RESULT_CHARS, clamp};

const MAX_READ_CHARS: i64 = 200_000;

fn resolve(sandbox: &Sandbox, path: Option<&str>) -> Result<PathBuf, ToolError> {
    Ok(sandbox.resolve(path.unwrap_or_default())?)
}

fn io_error(sandbox: &Sandbox, path: &Path) -> impl FnOnce(std::io::Error) -> ToolError {
    let path = sandbox.relative(path);
    move |source| ToolError::File { path, source }
}

fn to_index(value: i64) -> usize {
    usize::try_from(value).unwrap_or(if value < 0 { 0 } else { usize::MAX })
}

/// Read a file, optionally sliced to a line range and capped in length.
pub async fn read_file(sandbox: &Sandbox, args: ReadFileArgs) -> Result<String, ToolError> {
    let path = resolve(sandbox, args.path.as_deref())?;
    tracing::info!(path = %path.display(), "reading file");

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(io_error(sandbox, &path))?;
    let lines: Vec<&str> = text.split('\n').collect();
    let total = lines.len();

    let start = args
        .start_line
        .map_or(0, |line| to_index(line.max(1) - 1).min(total));
    let end = match args.end_line {
        Some(line) if line >= 0 => to_index(line).clamp(start, total),
        _ => total,
    };

    let max_chars = args
        .max_chars
        .map_or(MAX_TOOL_RESULT_CHARS, |n| to_index(n.clamp(1, MAX_READ_CHARS)));

    Ok(clamp(&lines[start..end].join("\n"), max_chars))
}

/// Create, overwrite or append to a file.
pub async fn write_file(sandbox: &Sandbox, args: WriteFileArgs) -> Result<String, ToolError> {
    let path = resolve(sandbox, args.path.as_deref())?;
    let content = args
        .content
        .ok_or_else(|| ToolError::invalid("missing write_file.content"))?;
    let append = args
        .mode
        .is_some_and(|mode| mode.trim().eq_ignore_ascii_case("append"));

    tracing::info!(path = %path.display(), append, "writing file");

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error(sandbox, parent))?;
    }

    if append {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_error(sandbox, &path))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(io_error(sandbox, &path))?;
        file.flush().await.map_err(io_error(sandbox, &path))?;
    } else {
        tokio::fs::write(&path, &content)
            .await
            .map_err(io_error(sandbox, &path))?;
    }

    Ok(format!(
        "wrote {} bytes to {}",
        content.len(),
        sandbox.relative(&path)
    ))
}

/// A resolved `edit_text` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Replace { find: String, replace: String },
    Insert { after: i64, text: String },
    DeleteRange { start: usize, end: usize },
}

impl Edit {
    fn from_args(args: &EditTextArgs) -> Result<Self, ToolError> {
        let action = args
            .action
            .as_deref()
            .map(|a| a.trim().to_lowercase())
            .unwrap_or_default();

        match action.as_str() {
            "replace" => {
                let find = args.find.clone().unwrap_or_default();
                if find.is_empty() {
                    return Err(ToolError::invalid("edit_text.replace missing find"));
                }
                Ok(Self::Replace {
                    find,
                    replace: args.replace.clone().unwrap_or_default(),
                })
            }
            "insert" => Ok(Self::Insert {
                after: args.insert_after.unwrap_or(-1),
                text: args.new_text.clone().unwrap_or_default(),
            }),
            "delete_range" => match args.range.as_deref() {
                Some(&[start, end]) if start.0 >= 0 && end.0 >= start.0 => Ok(Self::DeleteRange {
                    start: to_index(start.0),
                    end: to_index(end.0),
                }),
                _ => Err(ToolError::invalid("edit_text.delete_range invalid range")),
            },
            "" => Err(ToolError::invalid("missing edit_text.action")),
            other => Err(ToolError::invalid(format!(
                "unsupported edit_text.action: {other}"
            ))),
        }
    }

    /// Apply to `text`, returning the new text and a summary.
    fn apply(&self, text: &str) -> (String, String) {
        match self {
            Self::Replace { find, replace } => {
                let updated = text.replace(find.as_str(), replace);
                let summary = format!("replace done ({} bytes)", updated.len());
                (updated, summary)
            }
            Self::Insert { after, text: new_text } => {
                let mut lines: Vec<&str> = text.split('\n').collect();
                // -1 inserts before the first line; past the end appends.
                let at = if *after < 0 {
                    0
                } else {
                    to_index(*after).min(lines.len() - 1) + 1
                };
                lines.insert(at, new_text);
                (lines.join("\n"), format!("inserted after line {after}"))
            }
            Self::DeleteRange { start, end } => {
                let mut lines: Vec<&str> = text.split('\n').collect();
                let end = (*end).min(lines.len());
                let start = (*start).min(end);
                lines.drain(start..end);
                (lines.join("\n"), format!("deleted lines [{start}, {end})"))
            }
        }
    }
}

/// Apply a small structured edit to an existing file.
pub async fn edit_text(sandbox: &Sandbox, args: EditTextArgs) -> Result<String, ToolError> {
    let path = resolve(sandbox, args.path.as_deref())?;
    let edit = Edit::from_args(&args)?;
    tracing::info!(path = %path.display(), edit = ?edit, "editing file");

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(io_error(sandbox, &path))?;
    let (updated, summary) = edit.apply(&text);
    tokio::fs::write(&path, updated)
        .await
        .map_err(io_error(sandbox, &path))?;

    Ok(summary)
}
