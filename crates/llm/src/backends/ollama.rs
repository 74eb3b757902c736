//! Ollama chat backend.
//!
//! Talks to `POST {base_url}/api/chat` with streaming disabled. Tool schemas
//! are sent in the function-calling format; Ollama returns tool arguments as
//! JSON objects and no call ids, so ids are assigned locally.

use crate::{
    builder::LLMBuilder,
    chat::{ChatMessage, ChatProvider, ChatResponse, ChatRole, MessageType, Tool},
    error::LLMError,
    utils, FunctionCall, LLMProvider, ToolCall,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, EnumString, Display, Clone)]
pub enum OllamaAPI {
    #[strum(serialize = "api/chat")]
    ChatCompletion,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
enum OllamaRole {
    System,
    User,
    Assistant,
    Tool,
}

impl From<&ChatRole> for OllamaRole {
    fn from(role: &ChatRole) -> Self {
        match role {
            ChatRole::System => OllamaRole::System,
            ChatRole::User => OllamaRole::User,
            ChatRole::Assistant => OllamaRole::Assistant,
            ChatRole::Tool => OllamaRole::Tool,
        }
    }
}

/// Client for an Ollama server.
#[derive(Debug)]
pub struct Ollama {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
    client: reqwest::Client,
    next_call_id: AtomicU64,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaChatMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponseBody {
    message: OllamaResponseMessage,
}

/// Reply from `api/chat`, with call ids already assigned.
#[derive(Debug)]
pub struct OllamaResponse {
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl ChatResponse for OllamaResponse {
    fn text(&self) -> Option<String> {
        if self.content.is_empty() {
            None
        } else {
            Some(self.content.clone())
        }
    }

    fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        if self.tool_calls.is_empty() {
            None
        } else {
            Some(self.tool_calls.clone())
        }
    }
}

impl std::fmt::Display for OllamaResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl Ollama {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, LLMError> {
        let mut builder = reqwest::Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(sec));
        }
        let client = builder.build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            temperature,
            timeout_seconds,
            client,
            next_call_id: AtomicU64::new(0),
        })
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<OllamaChatMessage> {
        let mut converted = Vec::with_capacity(messages.len());
        for msg in messages {
            let role = OllamaRole::from(&msg.role).to_string();
            match &msg.message_type {
                MessageType::Text => converted.push(OllamaChatMessage {
                    role,
                    content: msg.content.clone(),
                    tool_calls: None,
                    tool_name: None,
                }),
                MessageType::ToolUse(calls) => converted.push(OllamaChatMessage {
                    role,
                    content: msg.content.clone(),
                    tool_calls: Some(
                        calls
                            .iter()
                            .map(|call| OllamaToolCall {
                                function: OllamaFunctionCall {
                                    name: call.function.name.clone(),
                                    arguments: serde_json::from_str(&call.function.arguments)
                                        .unwrap_or(Value::Object(Default::default())),
                                },
                            })
                            .collect(),
                    ),
                    tool_name: None,
                }),
                // Ollama expects one tool message per result
                MessageType::ToolResult(results) => {
                    for result in results {
                        converted.push(OllamaChatMessage {
                            role: OllamaRole::Tool.to_string(),
                            content: result.function.arguments.clone(),
                            tool_calls: None,
                            tool_name: Some(result.function.name.clone()),
                        });
                    }
                }
            }
        }
        converted
    }

    fn into_response(&self, body: OllamaChatResponseBody) -> OllamaResponse {
        let tool_calls = body
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
                let arguments = match call.function.arguments {
                    Value::Null => "{}".to_string(),
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                ToolCall {
                    id: format!("call_{id}"),
                    call_type: "function".to_string(),
                    function: FunctionCall {
                        name: call.function.name,
                        arguments,
                    },
                }
            })
            .collect();

        OllamaResponse {
            content: body.message.content,
            tool_calls,
        }
    }
}

#[async_trait]
impl ChatProvider for Ollama {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        if self.base_url.is_empty() {
            return Err(LLMError::InvalidRequest("Missing base_url".to_string()));
        }

        let options = if self.max_tokens.is_some() || self.temperature.is_some() {
            Some(OllamaOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            })
        } else {
            None
        };

        let body = OllamaChatRequest {
            model: &self.model,
            messages: Self::convert_messages(messages),
            tools: tools.filter(|t| !t.is_empty()),
            stream: false,
            options,
        };

        let url = utils::create_model_url(&self.base_url, OllamaAPI::ChatCompletion);
        log::debug!("Ollama request to {url} with {} messages", body.messages.len());

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::ProviderError(format!(
                "Ollama returned {status}: {text}"
            )));
        }

        let parsed: OllamaChatResponseBody =
            serde_json::from_str(&text).map_err(|e| LLMError::ResponseFormatError {
                message: e.to_string(),
                raw_response: text.clone(),
            })?;

        Ok(Box::new(self.into_response(parsed)))
    }
}

impl LLMProvider for Ollama {}

impl LLMBuilder<Ollama> {
    pub fn build(self) -> Result<Arc<Ollama>, LLMError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let ollama = Ollama::new(
            base_url,
            self.api_key,
            self.model,
            self.max_tokens,
            self.temperature,
            self.timeout_seconds,
        )?;
        Ok(Arc::new(ollama))
    }
}
