//! Progress spinner shown while waiting on the model.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;

/// Animation frames; the last entry is shown once finished.
const FRAMES: [&str; 5] = ["-", "\\", "|", "/", " "];
const TICK: Duration = Duration::from_millis(80);

/// A one-line spinner on stdout. Inert when stdout is not a terminal.
pub struct Spinner {
    label: String,
    enabled: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl Spinner {
    /// Create a spinner that animates only on an interactive stdout.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_enabled(label, std::io::stdout().is_terminal())
    }

    /// Create a spinner with explicit enablement.
    #[must_use]
    pub fn with_enabled(label: impl Into<String>, enabled: bool) -> Self {
        Self {
            label: label.into(),
            enabled,
            bar: Mutex::new(None),
        }
    }

    /// Start animating. No-op if already running or disabled.
    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        let mut bar = self.bar.lock();
        if bar.is_some() {
            return;
        }

        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        spinner.set_style(style());
        spinner.set_message(self.label.clone());
        spinner.enable_steady_tick(TICK);
        *bar = Some(spinner);
    }

    /// Stop animating and clear the line.
    pub fn stop(&self) {
        if let Some(spinner) = self.bar.lock().take() {
            spinner.finish_and_clear();
        }
    }

    /// Whether the animation is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.bar.lock().is_some()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_strings(&FRAMES)
        .template("{msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
