use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use toolbridge_core::agent::{Agent, AgentBuilder, AgentState};
use toolbridge_core::context::ConversationContext;
use toolbridge_core::protocol::Event;
use toolbridge_core::runner::{run_turn, Conversation};
use toolbridge_core::{ClientError, TurnError};
use toolbridge_llm::chat::{ChatRole, MessageType};
use toolbridge_test_utils::{MockToolRegistry, ScriptedLLMProvider, ScriptedReply};

async fn agent_with(
    replies: Vec<ScriptedReply>,
    registry: MockToolRegistry,
) -> (Arc<Agent>, Arc<ScriptedLLMProvider>, Arc<MockToolRegistry>) {
    let llm = Arc::new(ScriptedLLMProvider::new(replies));
    let registry = Arc::new(registry);
    let agent = AgentBuilder::discover(registry.clone())
        .with_llm(llm.clone())
        .completion_timeout(Duration::from_millis(200))
        .build()
        .await
        .unwrap();
    (agent, llm, registry)
}

#[tokio::test]
async fn test_turn_without_tools_has_no_events() {
    let (agent, _, _) = agent_with(
        vec![ScriptedReply::text("Hello! How can I help?")],
        MockToolRegistry::reference(),
    )
    .await;
    let context = ConversationContext::new().shared();

    let mut handle = run_turn("Hi", agent, &context).unwrap();
    let events: Vec<Event> = handle.stream_events().unwrap().collect().await;
    assert!(events.is_empty());
    assert_eq!(handle.answer().await.unwrap(), "Hello! How can I help?");

    let context = context.lock().await;
    assert_eq!(context.messages().len(), 2);
    assert_eq!(context.messages()[0].role, ChatRole::User);
    assert_eq!(context.messages()[1].content, "Hello! How can I help?");
    assert_eq!(context.state(), AgentState::Idle);
}

#[tokio::test]
async fn test_single_tool_call_emits_started_then_finished() {
    let (agent, llm, registry) = agent_with(
        vec![
            ScriptedReply::call("add_data", json!({"message": "hello"})),
            ScriptedReply::text("Added."),
        ],
        MockToolRegistry::reference(),
    )
    .await;
    let context = ConversationContext::new().shared();

    let mut handle = run_turn("add hello", agent, &context).unwrap();
    let events: Vec<Event> = handle.stream_events().unwrap().collect().await;
    assert_eq!(handle.answer().await.unwrap(), "Added.");

    assert_eq!(events.len(), 2);
    match (&events[0], &events[1]) {
        (
            Event::ToolCallStarted {
                id: started,
                tool_name,
                arguments,
            },
            Event::ToolCallFinished {
                id: finished,
                output,
                succeeded,
                ..
            },
        ) => {
            assert_eq!(started, finished);
            assert_eq!(tool_name, "add_data");
            assert_eq!(arguments["message"], "hello");
            assert_eq!(output, "Data successfully added: hello");
            assert!(succeeded);
        }
        other => panic!("unexpected events {other:?}"),
    }

    assert_eq!(registry.invocations().len(), 1);
    let second_request = &llm.requests()[1];
    let tool_message = second_request.last().unwrap();
    assert_eq!(tool_message.role, ChatRole::Tool);
    match &tool_message.message_type {
        MessageType::ToolResult(results) => {
            assert_eq!(results[0].function.arguments, "Data successfully added: hello");
        }
        other => panic!("expected tool result, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_tool_calls_finish_before_answer() {
    let delay = Duration::from_millis(200);
    let (agent, _, registry) = agent_with(
        vec![
            ScriptedReply::calls(vec![
                ("add_data".to_string(), json!({"message": "a"})),
                ("add_data".to_string(), json!({"message": "b"})),
                ("read_data".to_string(), json!({})),
            ]),
            ScriptedReply::text("All done."),
        ],
        MockToolRegistry::reference().with_delay(delay),
    )
    .await;
    let context = ConversationContext::new().shared();

    let started_at = Instant::now();
    let mut handle = run_turn("do three things", agent, &context).unwrap();
    let events: Vec<Event> = handle.stream_events().unwrap().collect().await;
    let answer = handle.answer().await.unwrap();
    let elapsed = started_at.elapsed();

    assert_eq!(answer, "All done.");
    assert_eq!(registry.invocations().len(), 3);
    assert!(elapsed < delay * 3, "calls ran sequentially: {elapsed:?}");

    assert_eq!(events.len(), 6);
    let started: Vec<_> = events[..3]
        .iter()
        .map(|e| match e {
            Event::ToolCallStarted { id, .. } => id.clone(),
            other => panic!("expected started, got {other:?}"),
        })
        .collect();
    let mut finished: Vec<_> = events[3..]
        .iter()
        .map(|e| match e {
            Event::ToolCallFinished { id, .. } => id.clone(),
            other => panic!("expected finished, got {other:?}"),
        })
        .collect();
    finished.sort();
    let mut expected = started.clone();
    expected.sort();
    assert_eq!(finished, expected);

    let context = context.lock().await;
    match &context.messages()[2].message_type {
        MessageType::ToolResult(results) => {
            let outputs: Vec<_> = results.iter().map(|r| r.function.arguments.as_str()).collect();
            assert_eq!(
                outputs,
                vec![
                    "Data successfully added: a",
                    "Data successfully added: b",
                    "Hello, there! I'm reading data from the table."
                ]
            );
        }
        other => panic!("expected tool results, got {other:?}"),
    }
}

#[tokio::test]
async fn test_remote_failure_is_data() {
    let (agent, _, _) = agent_with(
        vec![
            ScriptedReply::call("read_data", json!({})),
            ScriptedReply::text("The table is unavailable."),
        ],
        MockToolRegistry::reference().with_remote_failure("read_data", "table locked"),
    )
    .await;
    let conversation = Conversation::with_context(agent, ConversationContext::new().shared());

    let mut handle = conversation.start("read").unwrap();
    let events: Vec<Event> = handle.stream_events().unwrap().collect().await;
    assert_eq!(handle.answer().await.unwrap(), "The table is unavailable.");
    assert!(matches!(
        &events[1],
        Event::ToolCallFinished { succeeded: false, output, .. } if output == "table locked"
    ));
    assert_eq!(conversation.history().await.len(), 4);
}

#[tokio::test]
async fn test_transport_failure_fails_turn_and_keeps_context() {
    let (agent, _, _) = agent_with(
        vec![
            ScriptedReply::text("first answer"),
            ScriptedReply::call("add_data", json!({"message": "x"})),
        ],
        MockToolRegistry::reference().with_transport_failure(
            "add_data",
            ClientError::Connection("connection reset".to_string()),
        ),
    )
    .await;
    let conversation = Conversation::new(agent);
    conversation.run("hello").await.unwrap();
    let before = conversation.history().await;

    let mut handle = conversation.start("add x").unwrap();
    let events: Vec<Event> = handle.stream_events().unwrap().collect().await;
    let result = handle.answer().await;

    assert!(matches!(
        result,
        Err(TurnError::Tool(ClientError::Connection(_)))
    ));
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        Event::ToolCallFinished { succeeded: false, .. }
    ));
    assert_eq!(conversation.history().await, before);
    assert_eq!(conversation.state().await, AgentState::Idle);
}

#[tokio::test]
async fn test_tool_timeout_fails_turn_and_keeps_context() {
    let (agent, _, registry) = agent_with(
        vec![ScriptedReply::calls(vec![
            ("read_data".to_string(), json!({})),
            ("add_data".to_string(), json!({"message": "y"})),
        ])],
        MockToolRegistry::reference().with_transport_failure(
            "read_data",
            ClientError::Timeout(Duration::from_secs(30)),
        ),
    )
    .await;
    let conversation = Conversation::new(agent);

    let mut handle = conversation.start("read, then add y").unwrap();
    let events: Vec<Event> = handle.stream_events().unwrap().collect().await;
    let result = handle.answer().await;

    assert!(matches!(
        result,
        Err(TurnError::Tool(ClientError::Timeout(timeout))) if timeout == Duration::from_secs(30)
    ));
    assert_eq!(events.len(), 4);
    let started = events
        .iter()
        .filter(|e| matches!(e, Event::ToolCallStarted { .. }))
        .count();
    assert_eq!(started, 2);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::ToolCallFinished { tool_name, succeeded: false, .. } if tool_name == "read_data"
    )));
    assert_eq!(registry.invocations().len(), 2);
    assert!(conversation.history().await.is_empty());
    assert_eq!(conversation.state().await, AgentState::Idle);
}

#[tokio::test]
async fn test_unknown_tool_is_fatal() {
    let (agent, _, registry) = agent_with(
        vec![ScriptedReply::call("drop_table", json!({}))],
        MockToolRegistry::reference(),
    )
    .await;
    let context = ConversationContext::new().shared();

    let mut handle = run_turn("drop it", agent, &context).unwrap();
    let events: Vec<Event> = handle.stream_events().unwrap().collect().await;
    let result = handle.answer().await;

    assert!(matches!(result, Err(TurnError::UnknownTool(name)) if name == "drop_table"));
    assert!(events.is_empty());
    assert!(registry.invocations().is_empty());
    assert!(context.lock().await.is_empty());
}

#[tokio::test]
async fn test_non_object_arguments_are_protocol_error() {
    let (agent, _, registry) = agent_with(
        vec![ScriptedReply::raw_call("add_data", r#"["row"]"#)],
        MockToolRegistry::reference(),
    )
    .await;
    let conversation = Conversation::new(agent);

    let result = conversation.run("add").await;
    assert!(matches!(result, Err(TurnError::Protocol(_))));
    assert!(registry.invocations().is_empty());
}

#[tokio::test]
async fn test_completion_errors_and_timeouts() {
    let (agent, _, _) = agent_with(
        vec![
            ScriptedReply::Fail("model not found".to_string()),
            ScriptedReply::Hang,
        ],
        MockToolRegistry::reference(),
    )
    .await;
    let conversation = Conversation::new(agent);

    let result = conversation.run("one").await;
    assert!(matches!(result, Err(TurnError::CompletionBackend(reason)) if reason.contains("model not found")));

    let result = conversation.run("two").await;
    assert!(matches!(
        result,
        Err(TurnError::CompletionTimeout(timeout)) if timeout == Duration::from_millis(200)
    ));
    assert!(conversation.history().await.is_empty());
}

#[tokio::test]
async fn test_max_iterations_exceeded() {
    let llm = Arc::new(ScriptedLLMProvider::repeating(ScriptedReply::call(
        "read_data",
        json!({}),
    )));
    let registry = Arc::new(MockToolRegistry::reference());
    let agent = AgentBuilder::discover(registry.clone())
        .with_llm(llm.clone())
        .max_iterations(3)
        .build()
        .await
        .unwrap();

    let result = Conversation::new(agent).run("loop").await;
    assert!(matches!(result, Err(TurnError::MaxIterations(3))));
    assert_eq!(llm.requests().len(), 3);
    assert_eq!(registry.invocations().len(), 3);
}

#[tokio::test]
async fn test_overlapping_turns_are_rejected() {
    let (agent, _, _) = agent_with(
        vec![
            ScriptedReply::call("read_data", json!({})),
            ScriptedReply::text("read it"),
            ScriptedReply::text("second"),
        ],
        MockToolRegistry::reference().with_delay(Duration::from_millis(100)),
    )
    .await;
    let context = ConversationContext::new().shared();

    let first = run_turn("one", agent.clone(), &context).unwrap();
    let second = run_turn("two", agent.clone(), &context);
    assert!(matches!(second, Err(TurnError::TurnInProgress)));

    assert_eq!(first.answer().await.unwrap(), "read it");
    let third = run_turn("three", agent, &context).unwrap();
    assert_eq!(third.answer().await.unwrap(), "second");
    assert_eq!(context.lock().await.turns(), 2);
}

#[tokio::test]
async fn test_event_stream_taken_once() {
    let (agent, _, _) = agent_with(vec![ScriptedReply::text("ok")], MockToolRegistry::reference())
        .await;
    let context = ConversationContext::new().shared();

    let mut handle = run_turn("hi", agent, &context).unwrap();
    assert!(handle.stream_events().is_some());
    assert!(handle.stream_events().is_none());
    assert_eq!(handle.answer().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_history_carries_into_next_turn() {
    let (agent, llm, _) = agent_with(
        vec![ScriptedReply::text("first"), ScriptedReply::text("second")],
        MockToolRegistry::reference(),
    )
    .await;
    let conversation = Conversation::new(agent);

    conversation.run("one").await.unwrap();
    conversation.run("two").await.unwrap();

    let requests = llm.requests();
    // system, user one, assistant first, user two
    assert_eq!(requests[1].len(), 4);
    assert_eq!(requests[1][2].content, "first");
    assert_eq!(conversation.history().await.len(), 4);
}
