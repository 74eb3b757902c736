use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use toolbridge_core::agent::{AgentBuildError, AgentBuilder, AgentConfig, AgentState};
use toolbridge_core::ClientError;
use toolbridge_test_utils::{MockLLMProvider, MockToolRegistry, ScriptedLLMProvider, ScriptedReply};

#[tokio::test]
async fn test_builder_discovers_tools() {
    let registry = Arc::new(MockToolRegistry::reference());
    let agent = AgentBuilder::discover(registry.clone())
        .with_llm(Arc::new(MockLLMProvider))
        .build()
        .await
        .unwrap();

    let names: Vec<_> = agent.tools().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["read_data", "add_data"]);
    assert_eq!(registry.discover_count(), 1);
    assert_eq!(agent.name(), "Agent");
    assert_eq!(
        agent.description(),
        "An agent that can work with Our Database software."
    );
}

#[tokio::test]
async fn test_builder_with_tools_skips_discovery() {
    let registry = Arc::new(MockToolRegistry::reference());
    let agent = AgentBuilder::new()
        .with_llm(Arc::new(MockLLMProvider))
        .with_registry(registry.clone())
        .with_tools(Vec::new())
        .name("Quiet")
        .max_iterations(3)
        .completion_timeout(Duration::from_secs(5))
        .build()
        .await
        .unwrap();

    assert!(agent.tools().is_empty());
    assert_eq!(registry.discover_count(), 0);
    assert_eq!(agent.config().max_iterations, 3);
    assert_eq!(agent.config().completion_timeout, Duration::from_secs(5));
}

#[tokio::test]
async fn test_unreachable_registry_fails_construction() {
    let registry = Arc::new(
        MockToolRegistry::reference()
            .with_discover_error(ClientError::Connection("connection refused".to_string())),
    );
    let result = AgentBuilder::discover(registry)
        .with_llm(Arc::new(MockLLMProvider))
        .build()
        .await;

    assert!(matches!(
        result,
        Err(AgentBuildError::Discovery(ClientError::Connection(_)))
    ));
}

#[tokio::test]
async fn test_builder_requires_llm_and_registry() {
    let result = AgentBuilder::discover(Arc::new(MockToolRegistry::reference()))
        .build()
        .await;
    assert!(matches!(result, Err(AgentBuildError::MissingLlm)));

    let result = AgentBuilder::new()
        .with_llm(Arc::new(MockLLMProvider))
        .build()
        .await;
    assert!(matches!(result, Err(AgentBuildError::MissingRegistry)));
}

#[tokio::test]
async fn test_execute_sends_system_prompt_and_tools() {
    let llm = Arc::new(ScriptedLLMProvider::new(vec![ScriptedReply::text("Hi!")]));
    let agent = AgentBuilder::discover(Arc::new(MockToolRegistry::reference()))
        .with_llm(llm.clone())
        .system_prompt("Be brief.")
        .build()
        .await
        .unwrap();

    let (tx, _rx) = tokio::sync::mpsc::channel(10);
    let mut state = AgentState::Idle;
    let outcome = agent.execute("Hello", &[], &mut state, tx).await.unwrap();

    assert_eq!(outcome.answer, "Hi!");
    assert_eq!(outcome.messages.len(), 2);
    assert!(outcome.tool_results.is_empty());
    assert_eq!(state, AgentState::Answering);

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0][0].content, "Be brief.");
    assert_eq!(requests[0][1].content, "Hello");
    assert_eq!(llm.offered_tools()[0], vec!["read_data", "add_data"]);
}

#[tokio::test]
async fn test_execute_collects_tool_results_in_request_order() {
    let llm = Arc::new(ScriptedLLMProvider::new(vec![
        ScriptedReply::calls(vec![
            ("add_data".to_string(), json!({"message": "first"})),
            ("read_data".to_string(), json!({})),
        ]),
        ScriptedReply::text("Done."),
    ]));
    let agent = AgentBuilder::discover(Arc::new(MockToolRegistry::reference()))
        .with_llm(llm.clone())
        .build()
        .await
        .unwrap();

    let (tx, _rx) = tokio::sync::mpsc::channel(10);
    let mut state = AgentState::Idle;
    let outcome = agent.execute("go", &[], &mut state, tx).await.unwrap();

    let outputs: Vec<_> = outcome
        .tool_results
        .iter()
        .map(|r| r.output.as_str())
        .collect();
    assert_eq!(
        outputs,
        vec![
            "Data successfully added: first",
            "Hello, there! I'm reading data from the table."
        ]
    );
    // user, assistant tool use, tool results, final answer
    assert_eq!(outcome.messages.len(), 4);
    assert_eq!(llm.requests()[1].len(), 1 + 3);
}

#[test]
fn test_default_config() {
    let config = AgentConfig::default();
    assert_eq!(config.completion_timeout, Duration::from_secs(120));
    assert_eq!(config.max_iterations, 10);
    assert!(config.system_prompt.contains("Tool Calling"));
}
