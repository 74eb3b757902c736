use serde_json::json;
use std::sync::Arc;
use toolbridge_core::agent::AgentBuilder;
use toolbridge_core::runner::Conversation;
use toolbridge_shell::Shell;
use toolbridge_test_utils::{MockToolRegistry, ScriptedLLMProvider, ScriptedReply};

async fn shell(replies: Vec<ScriptedReply>, verbose: bool) -> (Shell, Arc<ScriptedLLMProvider>) {
    let llm = Arc::new(ScriptedLLMProvider::new(replies));
    let agent = AgentBuilder::discover(Arc::new(MockToolRegistry::reference()))
        .with_llm(llm.clone())
        .build()
        .await
        .unwrap();
    (Shell::new(Conversation::new(agent), verbose), llm)
}

async fn run(shell: &Shell, input: &str) -> (usize, String) {
    let mut output = Vec::new();
    let turns = shell.run(input.as_bytes(), &mut output).await.unwrap();
    (turns, String::from_utf8(output).unwrap())
}

#[tokio::test]
async fn test_exit_stops_without_a_turn() {
    let (shell, llm) = shell(vec![ScriptedReply::text("unused")], true).await;
    let (turns, output) = run(&shell, " Exit \nhello\n").await;

    assert_eq!(turns, 0);
    assert_eq!(output, "Enter your message: 👋 Exiting...\n");
    assert!(llm.requests().is_empty());
}

#[tokio::test]
async fn test_verbose_turn_prints_events_then_answer() {
    let (shell, _) = shell(
        vec![
            ScriptedReply::call("add_data", json!({"message": "row"})),
            ScriptedReply::text("Added it."),
        ],
        true,
    )
    .await;
    let (turns, output) = run(&shell, "add row\nexit\n").await;

    assert_eq!(turns, 1);
    assert_eq!(
        output,
        concat!(
            "Enter your message: User: add row\n",
            "🔧 Calling tool 'add_data' with kwargs {\"message\":\"row\"}\n",
            "✅ Tool 'add_data' returned: Data successfully added: row\n",
            "Agent: Added it.\n",
            "Enter your message: 👋 Exiting...\n",
        )
    );
}

#[tokio::test]
async fn test_quiet_mode_hides_events() {
    let (shell, _) = shell(
        vec![
            ScriptedReply::call("read_data", json!({})),
            ScriptedReply::text("It says hello."),
        ],
        false,
    )
    .await;
    let (_, output) = run(&shell, "read\n").await;

    assert!(!output.contains("🔧"));
    assert!(output.contains("Agent: It says hello.\n"));
}

#[tokio::test]
async fn test_failed_turn_is_reported_and_loop_continues() {
    let (shell, _) = shell(
        vec![
            ScriptedReply::Fail("model offline".to_string()),
            ScriptedReply::text("Back online."),
        ],
        true,
    )
    .await;
    let (turns, output) = run(&shell, "first\nsecond\n").await;

    assert_eq!(turns, 2);
    assert!(output.contains("Error: "));
    assert!(output.contains("model offline"));
    assert!(output.contains("Agent: Back online.\n"));
    assert_eq!(shell.conversation().history().await.len(), 2);
}

#[tokio::test]
async fn test_end_of_input_ends_loop() {
    let (shell, _) = shell(vec![ScriptedReply::text("Hi there.")], true).await;
    let (turns, output) = run(&shell, "hi").await;

    assert_eq!(turns, 1);
    assert!(output.ends_with("Agent: Hi there.\nEnter your message: \n"));
}
