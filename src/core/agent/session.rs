//! Per-session shared state.

use parking_lot::Mutex;

use super::reminder::{INITIAL_REMINDER, NAG_REMINDER, Reminders};
use crate::core::todo::TaskBoard;

/// Completed turns without a board update before the nag reminder fires.
pub const NAG_THRESHOLD: u32 = 10;

/// State shared by the driver and the tool router for one process session.
#[derive(Debug, Default)]
pub struct Session {
    board: TaskBoard,
    reminders: Reminders,
    idle_rounds: Mutex<u32>,
}

impl Session {
    /// A fresh session with the initial todo reminder queued.
    #[must_use]
    pub fn new() -> Self {
        let session = Self::blank();
        session.reminders.ensure_queued(INITIAL_REMINDER);
        session
    }

    /// A session with an empty board and no pending reminders.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// The shared task board.
    #[must_use]
    pub const fn board(&self) -> &TaskBoard {
        &self.board
    }

    /// Reminders waiting for the next user turn.
    #[must_use]
    pub const fn reminders(&self) -> &Reminders {
        &self.reminders
    }

    /// Count a completed turn and queue the nag reminder past the threshold.
    pub fn record_idle_round(&self) {
        let mut rounds = self.idle_rounds.lock();
        *rounds += 1;
        if *rounds > NAG_THRESHOLD {
            self.reminders.ensure_queued(NAG_REMINDER);
        }
    }

    /// Reset the idle counter after a successful board update.
    pub fn reset_idle_rounds(&self) {
        *self.idle_rounds.lock() = 0;
    }

    /// Completed turns since the board last changed.
    #[must_use]
    pub fn idle_rounds(&self) -> u32 {
        *self.idle_rounds.lock()
    }
}
