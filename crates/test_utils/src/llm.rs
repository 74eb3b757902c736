use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use toolbridge_llm::{
    chat::{ChatMessage, ChatProvider, ChatResponse, Tool},
    error::LLMError,
    FunctionCall, LLMProvider, ToolCall,
};

// Mock LLM Provider
pub struct MockLLMProvider;

#[async_trait]
impl ChatProvider for MockLLMProvider {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Ok(Box::new(MockChatResponse {
            text: Some("Mock response".to_string()),
            tool_calls: Vec::new(),
        }))
    }
}

impl LLMProvider for MockLLMProvider {}

/// One reply a [`ScriptedLLMProvider`] will give.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// A plain answer
    Text(String),
    /// Tool calls as `(name, raw JSON arguments)`, with optional text
    ToolCalls { text: String, calls: Vec<(String, String)> },
    /// The backend fails
    Fail(String),
    /// The backend never replies
    Hang,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }

    pub fn call(name: impl Into<String>, arguments: Value) -> Self {
        Self::calls(vec![(name.into(), arguments)])
    }

    pub fn calls(calls: Vec<(String, Value)>) -> Self {
        ScriptedReply::ToolCalls {
            text: String::new(),
            calls: calls
                .into_iter()
                .map(|(name, args)| (name, args.to_string()))
                .collect(),
        }
    }

    /// A call whose arguments are sent exactly as given, valid JSON or not.
    pub fn raw_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        ScriptedReply::ToolCalls {
            text: String::new(),
            calls: vec![(name.into(), arguments.into())],
        }
    }
}

/// Chat provider that replays a fixed script and records every request.
#[derive(Default)]
pub struct ScriptedLLMProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    repeat: Option<ScriptedReply>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    offered_tools: Mutex<Vec<Vec<String>>>,
    next_call_id: AtomicU64,
}

impl ScriptedLLMProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// Gives the same reply forever.
    pub fn repeating(reply: ScriptedReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::default()
        }
    }

    /// Message lists received so far, one per completion request.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    /// Tool names offered with each completion request.
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered_tools.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
    }
}

#[async_trait]
impl ChatProvider for ScriptedLLMProvider {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.offered_tools.lock().unwrap().push(
            tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.function.name.clone())
                .collect(),
        );

        let reply = self
            .next_reply()
            .ok_or_else(|| LLMError::Generic("script exhausted".to_string()))?;

        match reply {
            ScriptedReply::Text(text) => Ok(Box::new(MockChatResponse {
                text: Some(text),
                tool_calls: Vec::new(),
            })),
            ScriptedReply::ToolCalls { text, calls } => {
                let tool_calls = calls
                    .into_iter()
                    .map(|(name, arguments)| ToolCall {
                        id: format!("call_{}", self.next_call_id.fetch_add(1, Ordering::Relaxed)),
                        call_type: "function".to_string(),
                        function: FunctionCall { name, arguments },
                    })
                    .collect();
                Ok(Box::new(MockChatResponse {
                    text: Some(text).filter(|t| !t.is_empty()),
                    tool_calls,
                }))
            }
            ScriptedReply::Fail(reason) => Err(LLMError::ProviderError(reason)),
            ScriptedReply::Hang => {
                std::future::pending::<()>().await;
                Err(LLMError::Generic("unreachable".to_string()))
            }
        }
    }
}

impl LLMProvider for ScriptedLLMProvider {}

struct MockChatResponse {
    text: Option<String>,
    tool_calls: Vec<ToolCall>,
}

impl ChatResponse for MockChatResponse {
    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        if self.tool_calls.is_empty() {
            None
        } else {
            Some(self.tool_calls.clone())
        }
    }
}

impl std::fmt::Debug for MockChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockChatResponse")
    }
}

impl std::fmt::Display for MockChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text.as_deref().unwrap_or(""))
    }
}
