use super::base::Agent;
use super::state::AgentState;
use crate::error::{ClientError, TurnError};
use crate::protocol::Event;
use crate::tool::{ToolInvocationRequest, ToolInvocationResult};
use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use toolbridge_llm::chat::{ChatMessage, ChatResponse, ChatRole, MessageType, Tool};
use toolbridge_llm::{FunctionCall, ToolCall};
use uuid::Uuid;

/// Everything a successful turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    /// Messages to append to the history, starting with the user message.
    pub messages: Vec<ChatMessage>,
    /// Tool results in the order the model requested them.
    pub tool_results: Vec<ToolInvocationResult>,
}

impl Agent {
    /// Runs one turn against `history` without modifying it.
    ///
    /// The loop asks the model for a completion, runs any tool calls it
    /// requests, and repeats until the model answers in plain text. `state`
    /// follows the loop's progress; the caller resets it if the turn fails.
    pub async fn execute(
        &self,
        message: &str,
        history: &[ChatMessage],
        state: &mut AgentState,
        tx_event: mpsc::Sender<Event>,
    ) -> Result<TurnOutcome, TurnError> {
        let tools = self.tool_schemas();
        let system = ChatMessage::system()
            .content(self.config.system_prompt.clone())
            .build();
        let mut scratch = vec![ChatMessage::user().content(message).build()];
        let mut tool_results = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            transition(state, AgentState::Thinking);
            log::debug!(
                "Agent '{}' thinking, step {iteration}/{}",
                self.config.name,
                self.config.max_iterations
            );

            let mut messages = Vec::with_capacity(1 + history.len() + scratch.len());
            messages.push(system.clone());
            messages.extend_from_slice(history);
            messages.extend_from_slice(&scratch);

            let response = self.complete(&messages, &tools).await?;
            let text = response.text().unwrap_or_default();

            let calls = match response.tool_calls() {
                Some(calls) if !calls.is_empty() => calls,
                _ => {
                    transition(state, AgentState::Answering);
                    scratch.push(ChatMessage::assistant().content(text.clone()).build());
                    return Ok(TurnOutcome {
                        answer: text,
                        messages: scratch,
                        tool_results,
                    });
                }
            };

            transition(state, AgentState::ToolCallPending);
            let requests = self.prepare_requests(&calls)?;
            let results = self.dispatch(&requests, &tx_event).await?;
            transition(state, AgentState::ToolCallResolved);

            let uses: Vec<ToolCall> = calls
                .into_iter()
                .zip(&requests)
                .map(|(call, request)| ToolCall {
                    id: request.id.clone(),
                    ..call
                })
                .collect();
            let outputs: Vec<ToolCall> = uses
                .iter()
                .zip(&results)
                .map(|(call, result)| ToolCall {
                    id: call.id.clone(),
                    call_type: call.call_type.clone(),
                    function: FunctionCall {
                        name: call.function.name.clone(),
                        arguments: result.content(),
                    },
                })
                .collect();

            scratch.push(ChatMessage::assistant().content(text).tool_use(uses).build());
            scratch.push(ChatMessage {
                role: ChatRole::Tool,
                message_type: MessageType::ToolResult(outputs),
                content: String::new(),
            });
            tool_results.extend(results);
        }

        Err(TurnError::MaxIterations(self.config.max_iterations))
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
    ) -> Result<Box<dyn ChatResponse>, TurnError> {
        let tools = if tools.is_empty() { None } else { Some(tools) };
        let timeout = self.config.completion_timeout;
        match tokio::time::timeout(timeout, self.llm.chat_with_tools(messages, tools)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(TurnError::CompletionBackend(e.to_string())),
            Err(_) => Err(TurnError::CompletionTimeout(timeout)),
        }
    }

    /// Validates the model's tool calls before anything is sent to the host.
    fn prepare_requests(&self, calls: &[ToolCall]) -> Result<Vec<ToolInvocationRequest>, TurnError> {
        let mut requests: Vec<ToolInvocationRequest> = Vec::with_capacity(calls.len());
        for call in calls {
            let name = &call.function.name;
            if !self.has_tool(name) {
                return Err(TurnError::UnknownTool(name.clone()));
            }

            let id = if call.id.is_empty() || requests.iter().any(|r| r.id == call.id) {
                Uuid::new_v4().to_string()
            } else {
                call.id.clone()
            };

            requests.push(ToolInvocationRequest {
                id,
                tool_name: name.clone(),
                arguments: parse_arguments(name, &call.function.arguments)?,
            });
        }
        Ok(requests)
    }

    /// Invokes all calls concurrently. Results keep the request order.
    ///
    /// A call that never reached the host still gets a `ToolCallFinished`
    /// event, after which the first such failure fails the turn.
    async fn dispatch(
        &self,
        requests: &[ToolInvocationRequest],
        tx_event: &mpsc::Sender<Event>,
    ) -> Result<Vec<ToolInvocationResult>, TurnError> {
        for request in requests {
            log::info!("Calling tool '{}' ({})", request.tool_name, request.id);
            let _ = tx_event
                .send(Event::ToolCallStarted {
                    id: request.id.clone(),
                    tool_name: request.tool_name.clone(),
                    arguments: request.arguments.clone(),
                })
                .await;
        }

        let outcomes = join_all(requests.iter().map(|request| async move {
            let outcome = self.registry.invoke(request.clone()).await;
            let result = match &outcome {
                Ok(result) => result.clone(),
                Err(e) => {
                    log::warn!("Tool '{}' could not be invoked: {e}", request.tool_name);
                    ToolInvocationResult::failure(request, e.to_string())
                }
            };
            let _ = tx_event
                .send(Event::ToolCallFinished {
                    id: request.id.clone(),
                    tool_name: request.tool_name.clone(),
                    output: result.output.clone(),
                    succeeded: result.succeeded,
                })
                .await;
            outcome
        }))
        .await;

        outcomes
            .into_iter()
            .collect::<Result<Vec<_>, ClientError>>()
            .map_err(TurnError::Tool)
    }
}

fn transition(state: &mut AgentState, next: AgentState) {
    if !state.can_transition_to(next) {
        log::warn!("Unexpected agent state change {state:?} -> {next:?}");
    }
    log::debug!("Agent state {state:?} -> {next:?}");
    *state = next;
}

fn parse_arguments(tool: &str, raw: &str) -> Result<Map<String, Value>, TurnError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(TurnError::Protocol(format!(
            "arguments for tool '{tool}' must be a JSON object, got {other}"
        ))),
        Err(e) => Err(TurnError::Protocol(format!(
            "arguments for tool '{tool}' are not valid JSON: {e}"
        ))),
    }
}
