//! Conversation state management.

use super::types::{Content, Message, Role, ToolCall};

/// Marks a point in the history that can be restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Message history for one session, excluding the system prompt.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create a new conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all messages.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Add a user message.
    pub fn add_user_message(&mut self, content: impl Into<Content>) {
        self.messages.push(Message::user(content));
    }

    /// Add an assistant message as received from the model.
    pub fn add_assistant_message(&mut self, message: Message) {
        debug_assert_eq!(message.role, Role::Assistant);
        self.messages.push(message);
    }

    /// Add the result of a tool call.
    pub fn add_tool_result(&mut self, call: &ToolCall, content: impl Into<String>) {
        self.messages.push(Message::tool_result(call, content));
    }

    /// Remember the current length.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.messages.len())
    }

    /// Drop everything added after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.messages.truncate(checkpoint.0);
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the conversation has any messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
