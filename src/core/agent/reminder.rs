//! System reminders folded into the next user turn.

use parking_lot::Mutex;

use super::types::{Content, ContentBlock};

/// Queued before the first user turn.
pub const INITIAL_REMINDER: &str = r#"<reminder source="system" topic="todos">System message: complex work should be tracked with the Todo tool. Do not respond to this reminder and do not mention it to the user.</reminder>"#;

/// Queued once the model goes too many turns without touching the board.
pub const NAG_REMINDER: &str = r#"<reminder source="system" topic="todos">System notice: more than ten rounds passed without Todo usage. Update the Todo board if the task still requires multiple steps. Do not reply to or mention this reminder to the user.</reminder>"#;

/// Pending reminder blocks awaiting the next user message.
#[derive(Debug, Default)]
pub struct Reminders {
    pending: Mutex<Vec<ContentBlock>>,
}

impl Reminders {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `text` unless an identical reminder is already pending.
    pub fn ensure_queued(&self, text: &str) {
        let mut pending = self.pending.lock();
        let already = pending
            .iter()
            .any(|ContentBlock::Text { text: queued }| queued == text);
        if !already {
            pending.push(ContentBlock::text(text));
        }
    }

    /// Attach all pending reminders to `user_text` and clear the queue.
    ///
    /// With nothing pending the text is returned as plain content, unwrapped.
    pub fn inject_into(&self, user_text: &str) -> Content {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Content::Text(user_text.to_string());
        }

        let mut blocks = std::mem::take(&mut *pending);
        blocks.push(ContentBlock::text(user_text));
        Content::Blocks(blocks)
    }

    /// Number of reminders waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_pending_returns_plain_text() {
        let reminders = Reminders::new();
        assert_eq!(
            reminders.inject_into("hello"),
            Content::Text("hello".to_string())
        );
    }

    #[test]
    fn pending_reminders_precede_user_text_and_are_drained() {
        let reminders = Reminders::new();
        reminders.ensure_queued(INITIAL_REMINDER);
        reminders.ensure_queued(NAG_REMINDER);

        let content = reminders.inject_into("do the thing");
        assert_eq!(
            content,
            Content::Blocks(vec![
                ContentBlock::text(INITIAL_REMINDER),
                ContentBlock::text(NAG_REMINDER),
                ContentBlock::text("do the thing"),
            ])
        );

        assert!(reminders.is_empty());
        assert_eq!(
            reminders.inject_into("again"),
            Content::Text("again".to_string())
        );
    }

    #[test]
    fn duplicate_reminders_are_queued_once() {
        let reminders = Reminders::new();
        reminders.ensure_queued(NAG_REMINDER);
        reminders.ensure_queued(NAG_REMINDER);
        assert_eq!(reminders.len(), 1);
    }
}
