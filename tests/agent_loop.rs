//! End-to-end tests of the agent loop against a scripted model.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use agentloop::core::Sandbox;
use agentloop::core::agent::{
    Agent, AgentError, AgentEvent, AssistantTurn, ChatProvider, ChatRequest, Content,
    Conversation, FunctionCall, MAX_AGENT_ITERATIONS, Message, NAG_REMINDER, Result, Role,
    Session, TextSink, ToolCall, ToolRouter,
};

/// Replies according to a script keyed by call number and records requests.
struct ScriptedProvider {
    script: Box<dyn Fn(usize) -> Result<AssistantTurn> + Send + Sync>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest, on_text: TextSink<'_>) -> Result<AssistantTurn> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request);
            requests.len() - 1
        };
        let turn = (self.script)(call)?;
        let text = turn.message.text();
        if !text.is_empty() {
            on_text(&text);
        }
        Ok(turn)
    }
}

fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    raw_tool_call(id, name, &arguments.to_string())
}

fn raw_tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        kind: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

fn tool_turn(calls: Vec<ToolCall>) -> AssistantTurn {
    AssistantTurn {
        message: Message {
            role: Role::Assistant,
            content: None,
            tool_calls: calls,
            tool_call_id: None,
            name: None,
        },
        finish_reason: Some("tool_calls".to_string()),
    }
}

fn stop_turn(text: &str) -> AssistantTurn {
    AssistantTurn {
        message: Message::assistant(text),
        finish_reason: Some("stop".to_string()),
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    root: std::path::PathBuf,
    agent: Agent,
    session: Arc<Session>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

fn harness<F>(script: F) -> Harness
where
    F: Fn(usize) -> Result<AssistantTurn> + Send + Sync + 'static,
{
    let dir = tempfile::tempdir().unwrap();
    let sandbox = Sandbox::new(dir.path());
    let root = sandbox.root().to_path_buf();
    let session = Arc::new(Session::blank());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let provider = ScriptedProvider {
        script: Box::new(script),
        requests: requests.clone(),
    };
    let tools = ToolRouter::new(sandbox, session.clone(), 100_000);
    let agent = Agent::new(Box::new(provider), tools, session.clone(), "test-model", 1024);

    Harness {
        _dir: dir,
        root,
        agent,
        session,
        requests,
    }
}

#[tokio::test]
async fn three_round_transcript_runs_tools_in_order() {
    let h = harness(|call| {
        Ok(match call {
            0 => tool_turn(vec![tool_call(
                "call_1",
                "write_file",
                serde_json::json!({"path": "notes.txt", "content": "hello"}),
            )]),
            1 => tool_turn(vec![tool_call(
                "call_2",
                "read_file",
                serde_json::json!({"path": "notes.txt"}),
            )]),
            _ => stop_turn("Done."),
        })
    });

    let mut conversation = Conversation::new();
    conversation.add_user_message("write a note");

    let mut events = Vec::new();
    h.agent
        .query(&mut conversation, |event| events.push(event))
        .await
        .unwrap();

    // user + (assistant + tool) x2 + final assistant
    assert_eq!(conversation.len(), 6);
    let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::Assistant
        ]
    );

    let messages = conversation.messages();
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(messages[2].text(), "wrote 5 bytes to notes.txt");
    assert_eq!(messages[4].tool_call_id.as_deref(), Some("call_2"));
    assert_eq!(messages[4].name.as_deref(), Some("read_file"));
    assert_eq!(messages[4].text(), "hello");
    assert_eq!(messages[5].text(), "Done.");
    assert_eq!(
        std::fs::read_to_string(h.root.join("notes.txt")).unwrap(),
        "hello"
    );

    let started: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolStarted { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec!["write_file", "read_file"]);
    assert!(events.contains(&AgentEvent::Text("Done.".to_string())));

    let requests = h.requests.lock();
    assert_eq!(requests.len(), 3);
    for (i, request) in requests.iter().enumerate() {
        assert_eq!(request.model, "test-model");
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.tools.len(), 5);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(
            request.messages[0]
                .text()
                .contains(&h.root.display().to_string())
        );
        assert_eq!(request.messages.len(), 2 + 2 * i);
    }

    assert_eq!(h.session.idle_rounds(), 1);
    assert_eq!(h.agent.provider_name(), "scripted");
}

#[tokio::test]
async fn multiple_calls_in_one_round_run_sequentially() {
    let h = harness(|call| {
        Ok(match call {
            0 => tool_turn(vec![
                tool_call(
                    "a",
                    "write_file",
                    serde_json::json!({"path": "seq.txt", "content": "1"}),
                ),
                tool_call(
                    "b",
                    "write_file",
                    serde_json::json!({"path": "seq.txt", "content": "2", "mode": "append"}),
                ),
                tool_call("c", "read_file", serde_json::json!({"path": "seq.txt"})),
            ]),
            _ => stop_turn(""),
        })
    });

    let mut conversation = Conversation::new();
    conversation.add_user_message("go");
    h.agent.query(&mut conversation, |_| {}).await.unwrap();

    let ids: Vec<Option<&str>> = conversation.messages()[2..5]
        .iter()
        .map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec![Some("a"), Some("b"), Some("c")]);
    assert_eq!(conversation.messages()[4].text(), "12");
}

#[tokio::test]
async fn tool_failures_are_fed_back_to_the_model() {
    let h = harness(|call| {
        Ok(match call {
            0 => tool_turn(vec![
                raw_tool_call("x", "read_file", "{oops"),
                raw_tool_call("y", "launch_rockets", "{}"),
                raw_tool_call("z", "read_file", r#"{"path": "../../etc/passwd"}"#),
                raw_tool_call("w", "bash", r#"{"command": "SHUTDOWN now"}"#),
            ]),
            _ => stop_turn("recovered"),
        })
    });

    let mut conversation = Conversation::new();
    conversation.add_user_message("try things");
    let mut errors = 0;
    h.agent
        .query(&mut conversation, |event| {
            if let AgentEvent::ToolFinished { is_error: true, .. } = event {
                errors += 1;
            }
        })
        .await
        .unwrap();

    let messages = conversation.messages();
    assert!(messages[2].text().starts_with("Error parsing arguments:"));
    assert_eq!(messages[3].text(), "unknown tool: launch_rockets");
    assert_eq!(messages[4].text(), "path escapes workspace");
    assert_eq!(messages[5].text(), "blocked dangerous command");
    assert_eq!(messages[6].text(), "recovered");
    assert_eq!(errors, 4);
}

#[tokio::test]
async fn transport_error_leaves_history_before_the_failed_call() {
    let h = harness(|call| match call {
        0 => Ok(tool_turn(vec![tool_call(
            "call_1",
            "read_file",
            serde_json::json!({"path": "missing.txt"}),
        )])),
        _ => Err(AgentError::Api {
            status: 503,
            message: "overloaded".to_string(),
        }),
    });

    let mut conversation = Conversation::new();
    conversation.add_user_message("hello");
    let checkpoint = conversation.checkpoint();

    let mut events = Vec::new();
    let err = h
        .agent
        .query(&mut conversation, |event| events.push(event))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Api { status: 503, .. }));
    assert_eq!(err.to_string(), "api error: status 503 body overloaded");
    assert_eq!(conversation.len(), 3);
    assert_eq!(events.last(), Some(&AgentEvent::ResponseFinished));
    assert_eq!(h.session.idle_rounds(), 0);

    conversation.rollback(checkpoint);
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation.messages()[0].text(), "hello");
}

#[tokio::test]
async fn endless_tool_calls_hit_the_iteration_cap() {
    let h = harness(|call| {
        Ok(tool_turn(vec![tool_call(
            &format!("call_{call}"),
            "read_file",
            serde_json::json!({"path": "nope.txt"}),
        )]))
    });

    let mut conversation = Conversation::new();
    conversation.add_user_message("loop forever");
    let err = h.agent.query(&mut conversation, |_| {}).await.unwrap_err();

    assert!(matches!(err, AgentError::MaxIterations(n) if n == MAX_AGENT_ITERATIONS));
    assert_eq!(h.requests.lock().len(), MAX_AGENT_ITERATIONS);
    assert_eq!(conversation.len(), 1 + 2 * MAX_AGENT_ITERATIONS);
}

#[tokio::test]
async fn tool_finish_without_calls_ends_the_turn() {
    let h = harness(|_| {
        Ok(AssistantTurn {
            message: Message::assistant("nothing to do"),
            finish_reason: Some("tool_calls".to_string()),
        })
    });

    let mut conversation = Conversation::new();
    conversation.add_user_message("hi");
    h.agent.query(&mut conversation, |_| {}).await.unwrap();

    assert_eq!(conversation.len(), 2);
    assert_eq!(h.requests.lock().len(), 1);
}

#[tokio::test]
async fn todo_updates_reset_the_nag_counter() {
    let h = harness(|call| {
        Ok(if call == 11 {
            tool_turn(vec![tool_call(
                "todo",
                "TodoWrite",
                serde_json::json!({"items": [
                    {"content": "Plan", "activeForm": "Planning", "status": "in_progress"}
                ]}),
            )])
        } else {
            stop_turn("ok")
        })
    });

    let mut conversation = Conversation::new();
    for turn in 0..11 {
        conversation.add_user_message(h.session.reminders().inject_into(&format!("turn {turn}")));
        h.agent.query(&mut conversation, |_| {}).await.unwrap();
    }

    assert_eq!(h.session.idle_rounds(), 11);
    assert_eq!(h.session.reminders().len(), 1);

    let content = h.session.reminders().inject_into("plan it");
    match &content {
        Content::Blocks(blocks) => {
            assert_eq!(blocks.len(), 2);
            assert_eq!(Content::Blocks(vec![blocks[0].clone()]).text(), NAG_REMINDER);
        }
        Content::Text(_) => panic!("expected the nag reminder"),
    }
    conversation.add_user_message(content);
    h.agent.query(&mut conversation, |_| {}).await.unwrap();

    // The board update reset the counter before the closing turn counted.
    assert_eq!(h.session.idle_rounds(), 1);
    assert_eq!(h.session.board().stats().in_progress, 1);
}
