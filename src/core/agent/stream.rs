//! Response decoding for chat-completions endpoints.
//!
//! A reply arrives either as one JSON document or as a server-sent-event
//! stream of partial deltas. Both are normalized into an [`AssistantTurn`].

use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::error::{AgentError, Result};
use super::provider::TextSink;
use super::types::{AssistantTurn, Message};
use crate::core::text::{PREVIEW_CHARS, clamp};

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Finish reason reported for every decoded stream.
pub const STREAM_FINISH_REASON: &str = "stop";

// Non-streaming response

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Message,
    #[serde(default)]
    finish_reason: Option<String>,
}

// Streaming chunks

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode a complete (non-streamed) response body.
///
/// Statuses of 400 and above become [`AgentError::Api`] with a clamped body
/// excerpt. Otherwise the first choice is taken verbatim.
pub fn decode_completion(status: u16, body: &str) -> Result<AssistantTurn> {
    if status >= 400 {
        return Err(AgentError::Api {
            status,
            message: clamp(body, PREVIEW_CHARS),
        });
    }

    let completion: Completion = serde_json::from_str(body)?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or(AgentError::NoChoices)?;

    Ok(AssistantTurn {
        message: choice.message,
        finish_reason: choice.finish_reason,
    })
}

/// Incremental decoder for SSE `data:` lines.
#[derive(Debug, Default)]
pub struct SseDecoder {
    text: String,
    finished: bool,
}

impl SseDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its newline).
    ///
    /// Returns `true` once the stream is over: either the done sentinel was
    /// seen or a chunk carried a non-empty finish reason. Malformed chunks
    /// are skipped.
    pub fn push_line(&mut self, line: &str, on_text: TextSink<'_>) -> bool {
        if self.finished {
            return true;
        }

        let line = line.trim_end_matches('\r');
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return false;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload.trim() == DONE_SENTINEL {
            self.finished = true;
            return true;
        }

        let chunk = match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(data = %payload, error = %e, "skipping malformed stream chunk");
                return false;
            }
        };

        let Some(choice) = chunk.choices.into_iter().next() else {
            return false;
        };

        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            on_text(&text);
            self.text.push_str(&text);
        }

        if choice.finish_reason.is_some_and(|r| !r.is_empty()) {
            self.finished = true;
        }

        self.finished
    }

    /// Whether the stream has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Build the single assistant message for the accumulated text.
    #[must_use]
    pub fn finish(self) -> AssistantTurn {
        AssistantTurn {
            message: Message::assistant(self.text),
            finish_reason: Some(STREAM_FINISH_REASON.to_string()),
        }
    }
}

/// Splits a byte stream into lines, tolerating chunk boundaries anywhere.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}

/// Decode an SSE body stream into one assistant turn.
///
/// Text deltas are forwarded to `on_text` as they arrive. A transport error
/// while reading aborts decoding.
pub async fn decode_sse_stream<S, B, E>(stream: S, on_text: TextSink<'_>) -> Result<AssistantTurn>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    futures::pin_mut!(stream);

    let mut splitter = LineSplitter::default();
    let mut decoder = SseDecoder::new();

    'read: while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AgentError::Stream(e.to_string()))?;
        for line in splitter.push(chunk.as_ref()) {
            tracing::trace!(line = %line, "sse line");
            if decoder.push_line(&line, on_text) {
                break 'read;
            }
        }
    }

    if !decoder.is_finished() {
        if let Some(rest) = splitter.finish() {
            decoder.push_line(&rest, on_text);
        }
    }

    Ok(decoder.finish())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    fn decode_lines(lines: &[&str]) -> (AssistantTurn, Vec<String>) {
        let mut seen = Vec::new();
        let mut decoder = SseDecoder::new();
        {
            let mut sink = |t: &str| seen.push(t.to_string());
            for line in lines {
                if decoder.push_line(line, &mut sink) {
                    break;
                }
            }
        }
        (decoder.finish(), seen)
    }

    #[test]
    fn accumulates_deltas_into_one_message() {
        let (turn, seen) = decode_lines(&[
            r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":" there"},"finish_reason":"stop"}]}"#,
            "data: [DONE]",
        ]);

        assert_eq!(turn.message.text(), "Hi there");
        assert_eq!(turn.finish_reason.as_deref(), Some("stop"));
        assert_eq!(seen, vec!["Hi", " there"]);
    }

    #[test]
    fn ignores_blank_and_non_data_lines() {
        let (turn, _) = decode_lines(&[
            "",
            ": keep-alive",
            "event: message",
            r#"data: {"choices":[{"delta":{"content":"ok"}}]}"#,
            "data: [DONE]",
        ]);
        assert_eq!(turn.message.text(), "ok");
    }

    #[test]
    fn malformed_chunks_are_skipped() {
        let (turn, _) = decode_lines(&[
            r#"data: {"choices":[{"delta":{"content":"a"}}]}"#,
            "data: {not json",
            r#"data: {"choices":[{"delta":{"content":"b"}}]}"#,
            "data: [DONE]",
        ]);
        assert_eq!(turn.message.text(), "ab");
    }

    #[test]
    fn finish_reason_ends_stream_and_is_normalized_to_stop() {
        let (turn, _) = decode_lines(&[
            r#"data: {"choices":[{"delta":{"content":"x"},"finish_reason":"length"}]}"#,
            r#"data: {"choices":[{"delta":{"content":"ignored"}}]}"#,
        ]);
        assert_eq!(turn.message.text(), "x");
        assert_eq!(turn.finish_reason.as_deref(), Some(STREAM_FINISH_REASON));
    }

    #[test]
    fn empty_finish_reason_does_not_end_stream() {
        let (turn, _) = decode_lines(&[
            r#"data: {"choices":[{"delta":{"content":"a"},"finish_reason":""}]}"#,
            r#"data: {"choices":[{"delta":{"content":"b"},"finish_reason":null}]}"#,
            "data: [DONE]",
        ]);
        assert_eq!(turn.message.text(), "ab");
    }

    #[tokio::test]
    async fn stream_split_across_arbitrary_chunks() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\r\n\r\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" th\u{e9}re\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n"
        );
        let chunks: Vec<std::result::Result<Vec<u8>, Infallible>> = body
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(c.to_vec()))
            .collect();

        let mut seen = String::new();
        let mut sink = |t: &str| seen.push_str(t);
        let turn = decode_sse_stream(futures::stream::iter(chunks), &mut sink)
            .await
            .unwrap();

        assert_eq!(turn.message.text(), "Hi th\u{e9}re");
        assert_eq!(seen, "Hi th\u{e9}re");
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_decoded() {
        let chunks: Vec<std::result::Result<&str, Infallible>> =
            vec![Ok(r#"data: {"choices":[{"delta":{"content":"tail"}}]}"#)];
        let mut sink = |_: &str| {};
        let turn = decode_sse_stream(futures::stream::iter(chunks), &mut sink)
            .await
            .unwrap();
        assert_eq!(turn.message.text(), "tail");
    }

    #[tokio::test]
    async fn transport_error_aborts_decoding() {
        let chunks: Vec<std::result::Result<&str, String>> = vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"),
            Err("connection reset".to_string()),
        ];
        let mut sink = |_: &str| {};
        let err = decode_sse_stream(futures::stream::iter(chunks), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Stream(msg) if msg.contains("connection reset")));
    }

    #[test]
    fn completion_takes_first_choice_verbatim() {
        let body = r#"{
            "id": "cmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": null,
                  "tool_calls": [{"id": "c1", "type": "function",
                    "function": {"name": "bash", "arguments": "{}"}}]},
                 "finish_reason": "tool_calls"},
                {"index": 1, "message": {"role": "assistant", "content": "other"},
                 "finish_reason": "stop"}
            ]
        }"#;
        let turn = decode_completion(200, body).unwrap();
        assert_eq!(turn.finish_reason.as_deref(), Some("tool_calls"));
        assert!(turn.wants_tools());
    }

    #[test]
    fn completion_error_status_carries_clamped_body() {
        let body = "x".repeat(PREVIEW_CHARS + 10);
        let err = decode_completion(429, &body).unwrap_err();
        match err {
            AgentError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.starts_with(&"x".repeat(PREVIEW_CHARS)));
                assert!(message.ends_with("...<truncated 10 chars>"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn completion_without_choices_is_an_error() {
        let err = decode_completion(200, r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, AgentError::NoChoices));
    }

    #[test]
    fn completion_with_invalid_json_is_a_parse_error() {
        let err = decode_completion(200, "<html>").unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }
}
