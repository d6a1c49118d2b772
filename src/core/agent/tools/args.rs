//! Typed tool arguments.
//!
//! Models do not always respect integer types, so integer fields accept JSON
//! integers, floats (truncated toward zero) and numeric strings. Blank
//! strings count as absent. Anything else is rejected.

use serde::{Deserialize, Deserializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseNumber {
    #[allow(clippy::cast_possible_truncation)]
    fn into_int<E: de::Error>(self) -> Result<Option<i64>, E> {
        match self {
            Self::Int(n) => Ok(Some(n)),
            Self::Float(f) if f.is_finite() => Ok(Some(f.trunc() as i64)),
            Self::Float(f) => Err(E::custom(format!("expected an integer, got {f}"))),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse()
                    .map(Some)
                    .map_err(|_| E::custom(format!("expected an integer, got {s:?}")))
            }
        }
    }
}

/// An integer that tolerates float and string encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LooseInt(pub i64);

impl<'de> Deserialize<'de> for LooseInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        LooseNumber::deserialize(deserializer)?
            .into_int()?
            .map(Self)
            .ok_or_else(|| de::Error::custom("expected an integer, got an empty string"))
    }
}

fn opt_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<LooseNumber>::deserialize(deserializer)? {
        Some(number) => number.into_int(),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(
        Option::<LooseScalar>::deserialize(deserializer)?.map(|value| match value {
            LooseScalar::Text(s) => s,
            LooseScalar::Int(n) => n.to_string(),
            LooseScalar::Float(f) => f.to_string(),
            LooseScalar::Bool(b) => b.to_string(),
        }),
    )
}

/// Arguments for `bash`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BashArgs {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default, deserialize_with = "opt_int")]
    pub timeout_ms: Option<i64>,
}

/// Arguments for `read_file`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadFileArgs {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "opt_int")]
    pub start_line: Option<i64>,
    #[serde(default, deserialize_with = "opt_int")]
    pub end_line: Option<i64>,
    #[serde(default, deserialize_with = "opt_int")]
    pub max_chars: Option<i64>,
}

/// Arguments for `write_file`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteFileArgs {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Arguments for `edit_text`, before the action is resolved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditTextArgs {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub find: Option<String>,
    #[serde(default)]
    pub replace: Option<String>,
    #[serde(default, deserialize_with = "opt_int")]
    pub insert_after: Option<i64>,
    #[serde(default)]
    pub new_text: Option<String>,
    #[serde(default)]
    pub range: Option<Vec<LooseInt>>,
}

/// One proposed board entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoArg {
    #[serde(default, deserialize_with = "opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "activeForm", alias = "active_form")]
    pub active_form: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Arguments for `TodoWrite`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoWriteArgs {
    #[serde(default)]
    pub items: Option<Vec<TodoArg>>,
}
