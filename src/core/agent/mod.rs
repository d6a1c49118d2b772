//! Coding agent: the model/tool loop.

mod conversation;
mod error;
mod provider;
pub mod providers;
mod reminder;
mod session;
pub mod stream;
pub mod tools;
mod types;

use std::sync::Arc;

pub use conversation::{Checkpoint, Conversation};
pub use error::{AgentError, Result};
pub use provider::{ChatProvider, ChatRequest, TextSink};
pub use providers::{OpenAiProvider, chat_endpoint};
pub use reminder::{INITIAL_REMINDER, NAG_REMINDER, Reminders};
pub use session::{NAG_THRESHOLD, Session};
pub use tools::{ToolKind, ToolOutcome, ToolRouter, format_tool_invocation};
pub use types::{
    AgentEvent, AssistantTurn, Content, ContentBlock, FunctionCall, Message, Role, Tool, ToolCall,
};

/// Model rounds allowed per user turn.
pub const MAX_AGENT_ITERATIONS: usize = 20;

/// Default generation budget.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

const SYSTEM_PROMPT: &str = "You are a coding agent operating INSIDE the user's repository at {workdir}.
Follow this loop strictly: plan briefly → use TOOLS to act directly on files/shell → report concise results.
Rules:
- Prefer taking actions with tools (read/write/edit/bash) over long prose.
- Keep outputs terse. Use bullet lists / checklists when summarizing.
- Never invent file paths. Ask via reads or list directories first if unsure.
- For edits, apply the smallest change that satisfies the request.
- For bash, avoid destructive or privileged commands; stay inside the workspace.
- Use the TodoWrite tool to maintain multi-step plans when needed.
- After finishing, summarize what changed and how to run or test.";

/// System prompt naming the workspace root.
#[must_use]
pub fn system_prompt(workdir: &str) -> String {
    SYSTEM_PROMPT.replace("{workdir}", workdir)
}

/// Agent that drives a conversation through a model and local tools.
pub struct Agent {
    provider: Box<dyn ChatProvider>,
    tools: ToolRouter,
    session: Arc<Session>,
    model: String,
    max_tokens: u32,
    system: String,
}

impl Agent {
    /// Create an agent.
    ///
    /// `session` must be the same one the tool router was built with.
    pub fn new(
        provider: Box<dyn ChatProvider>,
        tools: ToolRouter,
        session: Arc<Session>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        let system = system_prompt(&tools.sandbox().root().display().to_string());
        Self {
            provider,
            tools,
            session,
            model: model.into(),
            max_tokens,
            system,
        }
    }

    /// Get the provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Run the model/tool loop until the model stops asking for tools.
    ///
    /// Assistant messages and tool results are appended to `conversation` as
    /// they happen. When a model call fails nothing is appended for that
    /// round, so the history ends just before the failed call.
    ///
    /// # Errors
    ///
    /// Returns error if a model call fails or the loop does not settle within
    /// [`MAX_AGENT_ITERATIONS`] rounds. Tool failures are not errors.
    pub async fn query<F>(&self, conversation: &mut Conversation, mut on_event: F) -> Result<()>
    where
        F: FnMut(AgentEvent) + Send,
    {
        for round in 1..=MAX_AGENT_ITERATIONS {
            let turn = self.request_turn(conversation, &mut on_event).await?;
            tracing::debug!(
                round,
                finish_reason = ?turn.finish_reason,
                tool_calls = turn.message.tool_calls.len(),
                "model turn"
            );

            let wants_tools = turn.wants_tools();
            let calls = turn.message.tool_calls.clone();
            conversation.add_assistant_message(turn.message);

            if !wants_tools {
                self.session.record_idle_round();
                return Ok(());
            }

            // Sequential on purpose: later calls may depend on earlier effects.
            for call in &calls {
                let name = call.function.name.as_str();
                on_event(AgentEvent::ToolStarted {
                    name: name.to_string(),
                    summary: format_tool_invocation(name, &call.function.arguments),
                });

                let outcome = self.tools.dispatch(name, &call.function.arguments).await;

                on_event(AgentEvent::ToolFinished {
                    name: name.to_string(),
                    preview: outcome.preview,
                    is_error: outcome.is_error,
                });
                conversation.add_tool_result(call, outcome.content);
            }
        }

        tracing::warn!(rounds = MAX_AGENT_ITERATIONS, "agent did not settle");
        Err(AgentError::MaxIterations(MAX_AGENT_ITERATIONS))
    }

    async fn request_turn<F>(
        &self,
        conversation: &Conversation,
        on_event: &mut F,
    ) -> Result<AssistantTurn>
    where
        F: FnMut(AgentEvent) + Send,
    {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.system.clone()));
        messages.extend_from_slice(conversation.messages());

        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
            tools: self.tools.definitions(),
        };

        on_event(AgentEvent::RequestStarted);
        let result = {
            let mut on_text = |text: &str| on_event(AgentEvent::Text(text.to_string()));
            self.provider.complete(request, &mut on_text).await
        };
        on_event(AgentEvent::ResponseFinished);

        result
    }
}
