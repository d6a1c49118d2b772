//! Character-bounded text helpers.

/// Upper bound applied to every tool result before it reaches the model.
pub const MAX_TOOL_RESULT_CHARS: usize = 100_000;

/// Length of tool output previews echoed to the terminal.
pub const PREVIEW_CHARS: usize = 2000;

const MARKER_PREFIX: &str = "\n\n...<truncated ";
const MARKER_SUFFIX: &str = " chars>";

/// Clamp `text` to at most `limit` characters (not bytes).
///
/// Oversized input keeps its first `limit` characters and gains a
/// `...<truncated N chars>` marker. Output of a previous clamp with the same
/// limit is returned unchanged, so clamping is idempotent.
#[must_use]
pub fn clamp(text: &str, limit: usize) -> String {
    if limit == 0 {
        return String::new();
    }

    let total = text.chars().count();
    if total <= limit || is_clamped(text, limit) {
        return text.to_string();
    }

    let truncated: String = text.chars().take(limit).collect();
    format!("{truncated}{MARKER_PREFIX}{}{MARKER_SUFFIX}", total - limit)
}

/// Whether `text` is exactly `limit` characters followed by a truncation marker.
fn is_clamped(text: &str, limit: usize) -> bool {
    let Some(body_end) = text.rfind(MARKER_PREFIX) else {
        return false;
    };
    let Some(count) = text[body_end + MARKER_PREFIX.len()..].strip_suffix(MARKER_SUFFIX) else {
        return false;
    };

    !count.is_empty()
        && count.bytes().all(|b| b.is_ascii_digit())
        && text[..body_end].chars().count() == limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(clamp("hello", 5), "hello");
        assert_eq!(clamp("", 3), "");
    }

    #[test]
    fn long_text_keeps_prefix_and_marker() {
        let out = clamp("abcdefgh", 3);
        assert!(out.starts_with("abc"));
        assert_eq!(out, "abc\n\n...<truncated 5 chars>");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "héllo wörld";
        assert_eq!(clamp(text, 11), text);
        assert_eq!(clamp(text, 5), "héllo\n\n...<truncated 6 chars>");
    }

    #[test]
    fn zero_limit_is_empty() {
        assert_eq!(clamp("anything", 0), "");
    }

    #[test]
    fn clamping_is_idempotent() {
        let samples = [
            String::new(),
            "abc".to_string(),
            "a".repeat(50),
            "日本語のテキスト".to_string(),
        ];
        for sample in &samples {
            for limit in [1, 3, 10, 100] {
                let once = clamp(sample, limit);
                assert_eq!(clamp(&once, limit), once, "sample {sample:?} limit {limit}");
            }
        }
    }

    #[test]
    fn marker_lookalike_with_wrong_length_is_clamped_again() {
        let fake = format!("ab{MARKER_PREFIX}9{MARKER_SUFFIX}");
        let out = clamp(&fake, 4);
        assert!(out.starts_with("ab\n\n"));
        assert!(out.ends_with("chars>"));
        assert_ne!(out, fake);
    }
}
