use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Progress events emitted while a turn is running.
///
/// For every call the `ToolCallStarted` event precedes its `ToolCallFinished`
/// event, and every `ToolCallFinished` of a turn is sent before the turn's
/// answer is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A tool call is about to be sent to the host
    ToolCallStarted {
        id: String,
        tool_name: String,
        arguments: Map<String, Value>,
    },

    /// A tool call produced a result, possibly a failure
    ToolCallFinished {
        id: String,
        tool_name: String,
        output: String,
        succeeded: bool,
    },
}

impl Event {
    pub fn id(&self) -> &str {
        match self {
            Event::ToolCallStarted { id, .. } | Event::ToolCallFinished { id, .. } => id,
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            Event::ToolCallStarted { tool_name, .. }
            | Event::ToolCallFinished { tool_name, .. } => tool_name,
        }
    }
}
