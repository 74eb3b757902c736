use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use toolbridge_llm::chat::Tool;
mod runtime;
pub use runtime::ToolRuntime;

#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("Runtime Error {0}")]
    RuntimeError(#[from] Box<dyn std::error::Error + Sync + Send>),

    #[error("Serde Error {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub trait ToolT: Send + Sync + Debug + ToolRuntime {
    /// The name of the tool.
    fn name(&self) -> &'static str;
    /// A description explaining the tool’s purpose.
    fn description(&self) -> &'static str;
    /// Return a description of the expected arguments.
    fn args_schema(&self) -> Value;
    /// Run the tool with the given arguments (in JSON) and return the result (in JSON).
    fn run(&self, args: Value) -> Result<Value, ToolCallError> {
        self.execute(args)
    }
}

pub trait ToolInputT {
    fn io_schema() -> &'static str;
}

/// A tool as advertised by a tool host.
///
/// Descriptors come from discovery and are never edited on the agent side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

impl From<&dyn ToolT> for ToolDescriptor {
    fn from(tool: &dyn ToolT) -> Self {
        ToolDescriptor::new(tool.name(), tool.description(), tool.args_schema())
    }
}

impl From<&ToolDescriptor> for Tool {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Tool::function(
            descriptor.name.clone(),
            descriptor.description.clone(),
            descriptor.input_schema.clone(),
        )
    }
}

/// One tool call the model asked for, ready to send to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

/// Outcome of a single tool call.
///
/// `succeeded` is false both when the host reported a tool error and when the
/// call never reached the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub id: String,
    pub tool_name: String,
    pub output: String,
    pub succeeded: bool,
}

impl ToolInvocationResult {
    pub fn success(request: &ToolInvocationRequest, output: impl Into<String>) -> Self {
        Self {
            id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            output: output.into(),
            succeeded: true,
        }
    }

    pub fn failure(request: &ToolInvocationRequest, output: impl Into<String>) -> Self {
        Self {
            id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            output: output.into(),
            succeeded: false,
        }
    }

    /// Text handed back to the model for this call.
    pub fn content(&self) -> String {
        if self.succeeded {
            self.output.clone()
        } else {
            serde_json::json!({ "error": self.output }).to_string()
        }
    }
}
