use super::ToolCallError;
use std::fmt::Debug;

/// Synchronous body of a host-side tool.
pub trait ToolRuntime: Send + Sync + Debug {
    fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolCallError>;
}
