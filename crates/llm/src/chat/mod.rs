use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::LLMError, ToolCall};

/// Role of a participant in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChatRole {
    /// System
    System,
    /// The user/human participant in the conversation
    User,
    /// The AI assistant participant in the conversation
    Assistant,
    /// Tool/function response
    Tool,
}

/// The type of a message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum MessageType {
    /// A text message
    #[default]
    Text,
    /// A tool use
    ToolUse(Vec<ToolCall>),
    /// Tool result, the output text is carried in `function.arguments`
    ToolResult(Vec<ToolCall>),
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of who sent this message (user or assistant)
    pub role: ChatRole,
    /// The type of the message
    pub message_type: MessageType,
    /// The text content of the message
    pub content: String,
}

/// Represents a function definition for a tool.
///
/// The `parameters` field stores the JSON Schema describing the function
/// arguments exactly as the tool host advertised it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionTool {
    /// Name of the function
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema describing the parameters
    pub parameters: Value,
}

/// Represents a tool that can be used in chat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tool {
    /// The type of tool (e.g. "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// The function definition if this is a function tool
    pub function: FunctionTool,
}

impl Tool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

pub trait ChatResponse: std::fmt::Debug + std::fmt::Display + Send + Sync {
    fn text(&self) -> Option<String>;
    fn tool_calls(&self) -> Option<Vec<ToolCall>>;
}

/// Trait for providers that support chat-style interactions.
#[async_trait]
pub trait ChatProvider: Sync + Send {
    /// Sends a chat request to the provider with a sequence of messages.
    ///
    /// # Arguments
    ///
    /// * `messages` - The conversation history as a slice of chat messages
    ///
    /// # Returns
    ///
    /// The provider's response text or an error
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        self.chat_with_tools(messages, None).await
    }

    /// Sends a chat request to the provider with a sequence of messages and tools.
    ///
    /// # Arguments
    ///
    /// * `messages` - The conversation history as a slice of chat messages
    /// * `tools` - Optional slice of tools to use in the chat
    ///
    /// # Returns
    ///
    /// The provider's response text or an error
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<Box<dyn ChatResponse>, LLMError>;
}

impl ChatMessage {
    /// Create a new builder for a user message
    pub fn user() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::User)
    }

    /// Create a new builder for an assistant message
    pub fn assistant() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::Assistant)
    }

    /// Create a new builder for a system message
    pub fn system() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::System)
    }
}

/// Builder for ChatMessage
#[derive(Debug)]
pub struct ChatMessageBuilder {
    role: ChatRole,
    message_type: MessageType,
    content: String,
}

impl ChatMessageBuilder {
    /// Create a new ChatMessageBuilder with specified role
    pub fn new(role: ChatRole) -> Self {
        Self {
            role,
            message_type: MessageType::default(),
            content: String::new(),
        }
    }

    /// Set the message content
    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }

    /// Set the message type as ToolUse
    pub fn tool_use(mut self, tools: Vec<ToolCall>) -> Self {
        self.message_type = MessageType::ToolUse(tools);
        self
    }

    /// Set the message type as ToolResult
    pub fn tool_result(mut self, tools: Vec<ToolCall>) -> Self {
        self.message_type = MessageType::ToolResult(tools);
        self
    }

    /// Build the ChatMessage
    pub fn build(self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            message_type: self.message_type,
            content: self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FunctionCall;
    use serde_json::json;

    #[test]
    fn test_chat_role_serialization() {
        let serialized = serde_json::to_string(&ChatRole::User).unwrap();
        assert_eq!(serialized, "\"User\"");

        let deserialized: ChatRole = serde_json::from_str("\"Tool\"").unwrap();
        assert_eq!(deserialized, ChatRole::Tool);
    }

    #[test]
    fn test_message_type_default() {
        assert_eq!(MessageType::default(), MessageType::Text);
    }

    #[test]
    fn test_chat_message_builder_user() {
        let message = ChatMessage::user().content("Hello, world!").build();

        assert_eq!(message.role, ChatRole::User);
        assert_eq!(message.content, "Hello, world!");
        assert_eq!(message.message_type, MessageType::Text);
    }

    #[test]
    fn test_chat_message_builder_system() {
        let message = ChatMessage::system().content("Be brief").build();
        assert_eq!(message.role, ChatRole::System);
        assert_eq!(message.content, "Be brief");
    }

    #[test]
    fn test_chat_message_builder_tool_use() {
        let tool_calls = vec![ToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "add_data".to_string(),
                arguments: "{\"message\": \"row 1\"}".to_string(),
            },
        }];

        let message = ChatMessage::assistant()
            .content("Adding a row")
            .tool_use(tool_calls.clone())
            .build();

        assert_eq!(message.role, ChatRole::Assistant);
        assert_eq!(message.message_type, MessageType::ToolUse(tool_calls));
    }

    #[test]
    fn test_chat_message_builder_tool_result() {
        let tool_results = vec![ToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "read_data".to_string(),
                arguments: "Hello, there!".to_string(),
            },
        }];

        let message = ChatMessageBuilder::new(ChatRole::Tool)
            .tool_result(tool_results.clone())
            .build();

        assert_eq!(message.role, ChatRole::Tool);
        assert_eq!(message.message_type, MessageType::ToolResult(tool_results));
    }

    #[test]
    fn test_tool_function_serialization() {
        let tool = Tool::function(
            "add_data",
            "Simulates adding data to a table.",
            json!({"type": "object", "properties": {"message": {"type": "string"}}}),
        );

        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "add_data");
        assert_eq!(
            value["function"]["parameters"]["properties"]["message"]["type"],
            "string"
        );
    }
}
