//! Model endpoint abstraction.

use async_trait::async_trait;

use super::error::Result;
use super::types::{AssistantTurn, Message, Tool};

/// Everything needed for one model call.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Full history, system prompt first.
    pub messages: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<Tool>,
}

/// Sink for assistant text as it becomes visible.
pub type TextSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Trait for chat-completions backends.
///
/// Implementations normalize their wire format into one [`AssistantTurn`]
/// and report every piece of assistant text through `on_text` exactly once.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Send a request and wait for the complete reply.
    async fn complete(&self, request: ChatRequest, on_text: TextSink<'_>) -> Result<AssistantTurn>;
}
