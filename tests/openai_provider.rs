//! Provider tests against a local HTTP server with canned replies.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use agentloop::core::agent::{AgentError, ChatProvider, ChatRequest, Message, OpenAiProvider};

/// A raw request as seen by the server.
struct Captured {
    head: String,
    body: serde_json::Value,
}

/// Serve exactly one request with the given status line, content type and body.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let (head, body_start) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break (String::from_utf8_lossy(&buf[..pos]).into_owned(), pos + 4);
            }
        };

        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < body_start + length {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = serde_json::from_slice(&buf[body_start..body_start + length]).unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        let _ = tx.send(Captured {
            head,
            body: request_body,
        });
    });

    (format!("http://{addr}/v1"), rx)
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-test".to_string(),
        max_tokens: 256,
        messages: vec![Message::system("be brief"), Message::user("hi")],
        tools: Vec::new(),
    }
}

fn provider(base_url: &str, stream: bool) -> OpenAiProvider {
    OpenAiProvider::new("sk-local", base_url, stream, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn non_streaming_reply_is_decoded_and_echoed() {
    let reply = serde_json::json!({
        "choices": [{
            "message": {"role": "assistant", "content": "hello back"},
            "finish_reason": "stop"
        }]
    })
    .to_string();
    let (base, captured) = serve_once("200 OK", "application/json", reply).await;

    let mut seen = Vec::new();
    let mut sink = |t: &str| seen.push(t.to_string());
    let turn = provider(&base, false)
        .complete(request(), &mut sink)
        .await
        .unwrap();

    assert_eq!(turn.message.text(), "hello back");
    assert_eq!(turn.finish_reason.as_deref(), Some("stop"));
    assert_eq!(seen, vec!["hello back"]);

    let captured = captured.await.unwrap();
    assert!(captured.head.starts_with("POST /v1/chat/completions "));
    assert!(
        captured
            .head
            .lines()
            .any(|l| l.eq_ignore_ascii_case("authorization: Bearer sk-local"))
    );
    assert_eq!(captured.body["model"], "gpt-test");
    assert_eq!(captured.body["max_tokens"], 256);
    assert_eq!(captured.body["stream"], false);
    assert_eq!(captured.body["messages"][0]["role"], "system");
    assert!(captured.body.get("tools").is_none());
}

#[tokio::test]
async fn error_status_becomes_api_error() {
    let (base, _captured) = serve_once(
        "401 Unauthorized",
        "application/json",
        r#"{"error":{"message":"bad key"}}"#.to_string(),
    )
    .await;

    let mut sink = |_: &str| {};
    let err = provider(&base, false)
        .complete(request(), &mut sink)
        .await
        .unwrap_err();

    match err {
        AgentError::Api { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("bad key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn streaming_reply_forwards_deltas() {
    let events = concat!(
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\r\n\r\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
    );
    let (base, captured) = serve_once("200 OK", "text/event-stream", events.to_string()).await;

    let mut seen = Vec::new();
    let mut sink = |t: &str| seen.push(t.to_string());
    let turn = provider(&base, true)
        .complete(request(), &mut sink)
        .await
        .unwrap();

    assert_eq!(turn.message.text(), "Hello");
    assert_eq!(turn.finish_reason.as_deref(), Some("stop"));
    assert!(!turn.wants_tools());
    assert_eq!(seen, vec!["Hel", "lo"]);
    assert_eq!(captured.await.unwrap().body["stream"], true);
}

#[tokio::test]
async fn streaming_error_status_is_reported_before_decoding() {
    let (base, _captured) = serve_once(
        "500 Internal Server Error",
        "text/plain",
        "upstream exploded".to_string(),
    )
    .await;

    let mut sink = |_: &str| {};
    let err = provider(&base, true)
        .complete(request(), &mut sink)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "api error: status 500 body upstream exploded");
}
