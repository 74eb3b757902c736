//! The two operations served by the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbridge_core::tool::{ToolCallError, ToolInputT, ToolRuntime, ToolT};
use toolbridge_derive::{tool, ToolInput};

pub const READ_DATA_REPLY: &str = "Hello, there! I'm reading data from the table.";

#[derive(Serialize, Deserialize, ToolInput, Debug)]
pub struct ReadDataArgs {}

#[tool(
    name = "read_data",
    description = "Simulates reading data from a table.",
    input = ReadDataArgs
)]
pub struct ReadData;

impl ToolRuntime for ReadData {
    fn execute(&self, _args: Value) -> Result<Value, ToolCallError> {
        Ok(Value::String(READ_DATA_REPLY.to_string()))
    }
}

#[derive(Serialize, Deserialize, ToolInput, Debug)]
pub struct AddDataArgs {
    #[input(description = "A message string representing the data to add.")]
    pub message: String,
}

#[tool(
    name = "add_data",
    description = "Simulates adding data to a table.",
    input = AddDataArgs
)]
pub struct AddData;

impl ToolRuntime for AddData {
    fn execute(&self, args: Value) -> Result<Value, ToolCallError> {
        let args: AddDataArgs = serde_json::from_value(args)?;
        Ok(Value::String(format!(
            "Data successfully added: {}",
            args.message
        )))
    }
}
