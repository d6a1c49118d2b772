//! Agent error types.

/// Errors that end a query round early.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// API key not configured.
    #[error("API key not configured")]
    ApiKeyMissing,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the response stream failed part-way.
    #[error("error reading stream: {0}")]
    Stream(String),

    /// API returned an error response.
    #[error("api error: status {status} body {message}")]
    Api { status: u16, message: String },

    /// Failed to parse API response.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response carried no choices.
    #[error("no choices in response")]
    NoChoices,

    /// The tool loop did not settle within the round budget.
    #[error("agent max iterations reached ({0} rounds)")]
    MaxIterations(usize),
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
