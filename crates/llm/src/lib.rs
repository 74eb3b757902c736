//! Text-completion capability used by the agent.
//!
//! The agent treats the language model as an opaque chat capability: it sends
//! the conversation plus the available tool schemas and receives either text
//! or a list of tool calls. [`chat::ChatProvider`] is that seam; the
//! [`backends`] module holds concrete providers.

use serde::{Deserialize, Serialize};

pub mod backends;
pub mod builder;
pub mod chat;
pub mod error;
pub(crate) mod utils;

pub use chat::{ChatMessage, ChatProvider, ChatResponse, ChatRole, MessageType, Tool};
pub use error::LLMError;

/// A chat capability usable by the agent.
pub trait LLMProvider: chat::ChatProvider {}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier used to pair the call with its result
    pub id: String,
    /// Always `"function"` for the providers we support
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function name and its JSON-encoded arguments
    pub function: FunctionCall,
}

/// Function name and JSON-encoded arguments of a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}
