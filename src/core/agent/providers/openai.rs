//! Chat-completions provider for `OpenAI` and compatible endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;

use crate::core::agent::error::{AgentError, Result};
use crate::core::agent::provider::{ChatProvider, ChatRequest, TextSink};
use crate::core::agent::stream::{decode_completion, decode_sse_stream};
use crate::core::agent::types::{AssistantTurn, Message, Tool};
use crate::core::text::{PREVIEW_CHARS, clamp};

/// Default base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Marker that makes a base URL be used verbatim.
const VERBATIM_MARKER: char = '#';

/// Build the chat-completions URL for a configured base.
///
/// A trailing `#` means "use as-is"; a trailing `/v1` or `/` gets the
/// remaining path segments; anything else gets the full `/v1/...` suffix.
#[must_use]
pub fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim();
    if let Some(verbatim) = base.strip_suffix(VERBATIM_MARKER) {
        verbatim.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else if base.ends_with('/') {
        format!("{base}chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

// Request body

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct FunctionTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a Tool,
}

fn convert_tools(tools: &[Tool]) -> Vec<FunctionTool<'_>> {
    tools
        .iter()
        .map(|function| FunctionTool {
            tool_type: "function",
            function,
        })
        .collect()
}

/// Provider speaking the chat-completions wire format.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    stream: bool,
}

impl OpenAiProvider {
    /// Create a provider.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be
    /// built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        stream: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::ApiKeyMissing);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key,
            endpoint: chat_endpoint(base_url),
            stream,
        })
    }

    /// The resolved chat-completions URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| AgentError::ApiKeyMissing)?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: ChatRequest, on_text: TextSink<'_>) -> Result<AssistantTurn> {
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            tools: convert_tools(&request.tools),
            max_tokens: request.max_tokens,
            stream: self.stream,
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload = serde_json::to_string_pretty(&body)?;
            tracing::debug!(url = %self.endpoint, stream = self.stream, %payload, "sending request");
        }

        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "response received");

        if self.stream {
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(AgentError::Api {
                    status: status.as_u16(),
                    message: clamp(&message, PREVIEW_CHARS),
                });
            }
            return decode_sse_stream(response.bytes_stream(), on_text).await;
        }

        let text = response.text().await?;
        tracing::debug!(body = %clamp(&text, PREVIEW_CHARS), "response body");

        let turn = decode_completion(status.as_u16(), &text)?;
        let content = turn.message.text();
        if !content.is_empty() {
            on_text(&content);
        }
        Ok(turn)
    }
}
