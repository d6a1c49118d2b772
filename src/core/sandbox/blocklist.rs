//! Dangerous command blocklist.
//!
//! Classification is a case-insensitive substring match, not a shell parser.
//! It has known false negatives (`rm -r -f /`, `/sbin/poweroff`, commands
//! assembled through variables) and false positives (`echo halting`, any
//! path containing `shutdown`). Treat it as a tripwire, not a guarantee.

/// Substrings that mark a command as dangerous once lowercased.
const BLOCKED_PATTERNS: &[&str] = &["rm -rf /", "shutdown", "reboot", "sudo ", "halt"];

/// Check whether a shell command matches the blocklist.
#[must_use]
pub fn is_dangerous_command(command: &str) -> bool {
    let lowered = command.to_lowercase();
    BLOCKED_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}
