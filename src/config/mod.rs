//! Configuration management.
//!
//! Settings are layered: built-in defaults, then the optional TOML file in
//! the config directory, then environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::agent::DEFAULT_MAX_TOKENS;
use crate::core::agent::providers::DEFAULT_BASE_URL;

const APP_DIR: &str = "agentloop";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY required")]
    MissingApiKey,

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not determine working directory: {0}")]
    WorkDir(#[source] std::io::Error),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bearer credential for the model endpoint.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions service.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Maximum tokens per model reply.
    pub max_tokens: u32,

    /// Cap on tool-result text; falls back to `max_tokens`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_result_chars: Option<usize>,

    /// Request server-sent events instead of a single JSON reply.
    ///
    /// Off unless enabled: streamed replies carry text only, so a streamed
    /// turn can never call tools.
    pub stream: bool,

    /// Enable debug logging.
    pub debug: bool,

    /// HTTP timeout for model calls, in seconds.
    pub request_timeout_secs: u64,

    /// Workspace root; always the working directory at startup.
    #[serde(skip)]
    pub work_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_result_chars: None,
            stream: false,
            debug: false,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            work_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration for this process.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or malformed, or if
    /// no API key is configured.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        let mut config = Self::from_file(&path)?;
        config.work_dir = std::env::current_dir().map_err(ConfigError::WorkDir)?;
        config.apply_env(|key| std::env::var(key).ok()).validate()
    }

    /// Build configuration from defaults and a key lookup, without a file.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found.
    pub fn from_lookup<F>(lookup: F, work_dir: impl Into<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            work_dir: work_dir.into(),
            ..Self::default()
        };
        config.apply_env(lookup).validate()
    }

    /// Read the TOML file at `path`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(toml::from_str(&contents)?)
    }

    /// Overlay environment-style settings. Blank and invalid values are ignored.
    #[must_use]
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(key) = get("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.model = model;
        }
        if let Some(tokens) = get("OPENAI_MAX_TOKENS").and_then(|v| parse_positive(&v)) {
            self.max_tokens = tokens;
        }
        if let Some(chars) = get("AGENT_MAX_RESULT_CHARS").and_then(|v| parse_positive(&v)) {
            self.max_result_chars = Some(chars);
        }
        if let Some(secs) = get("OPENAI_TIMEOUT_SECS").and_then(|v| parse_positive(&v)) {
            self.request_timeout_secs = secs;
        }
        if let Some(debug) = get("DEBUG").and_then(|v| parse_flag(&v)) {
            self.debug = debug;
        }
        if let Some(stream) = get("OPENAI_STREAM").and_then(|v| parse_flag(&v)) {
            self.stream = stream;
        }

        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(self),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    /// The configured API key, empty when unset.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    /// Cap applied to every tool result.
    #[must_use]
    pub fn result_limit(&self) -> usize {
        self.max_result_chars
            .unwrap_or_else(|| usize::try_from(self.max_tokens).unwrap_or(usize::MAX))
    }

    /// HTTP timeout for model calls.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the config directory path (`~/.config/agentloop/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            if !xdg_config_home.is_empty() {
                return Ok(PathBuf::from(xdg_config_home).join(APP_DIR));
            }
        }

        let base = directories::BaseDirs::new().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.config_dir().join(APP_DIR))
    }
}

fn parse_positive<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value.parse::<T>().ok().filter(|n| *n > T::default())
}

fn parse_flag(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
