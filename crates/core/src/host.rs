//! Transport-independent request dispatcher for a tool host.
//!
//! [`ToolHost`] owns a fixed set of tools and answers the JSON-RPC methods of
//! the tool protocol. Transports feed it decoded messages and write back
//! whatever reply it produces. It keeps no state between calls, so one host
//! can be shared across any number of connections.

use crate::mcp::{
    methods, CallToolParams, CallToolResult, Implementation, InitializeResult, JsonRpcMessage,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tool::{ToolDescriptor, ToolT};
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct ToolHost {
    info: Implementation,
    instructions: Option<String>,
    tools: Vec<Box<dyn ToolT>>,
}

impl ToolHost {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Implementation::new(name, version),
            instructions: None,
            tools: Vec::new(),
        }
    }

    /// Registers a tool. Names must be unique; a later duplicate is ignored.
    pub fn with_tool(mut self, tool: Box<dyn ToolT>) -> Self {
        if self.tools.iter().any(|t| t.name() == tool.name()) {
            log::warn!("Tool '{}' is already registered, ignoring", tool.name());
            return self;
        }
        self.tools.push(tool);
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor::from(tool.as_ref()))
            .collect()
    }

    /// Runs a tool by name. Failures are reported inside the result.
    pub fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> CallToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            log::warn!("Call for unknown tool '{name}'");
            return CallToolResult::error(format!("Unknown tool: {name}"));
        };

        log::info!("Calling tool '{name}'");
        match tool.run(Value::Object(arguments)) {
            Ok(Value::String(text)) => CallToolResult::success(text),
            Ok(other) => CallToolResult::success(other.to_string()),
            Err(e) => {
                log::warn!("Tool '{name}' failed: {e}");
                CallToolResult::error(format!("Error executing tool {name}: {e}"))
            }
        }
    }

    /// Decodes one raw line or request body.
    ///
    /// Input that is not JSON yields a parse error reply. JSON that is not a
    /// valid message yields an invalid request reply, carrying the sender's
    /// id when one can be read.
    pub fn decode(raw: &[u8]) -> Result<JsonRpcMessage, JsonRpcResponse> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| {
            log::warn!("Discarding malformed message: {e}");
            JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"))
        })?;
        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
        serde_json::from_value(value).map_err(|e| {
            log::warn!("Discarding invalid message: {e}");
            JsonRpcResponse::error(id, INVALID_REQUEST, format!("Invalid request: {e}"))
        })
    }

    /// Handles one raw line or request body, including undecodable input.
    pub fn handle_raw(&self, raw: &str) -> Option<JsonRpcResponse> {
        match Self::decode(raw.as_bytes()) {
            Ok(message) => self.handle(message),
            Err(response) => Some(response),
        }
    }

    /// Dispatches a decoded message. Notifications and stray responses
    /// produce no reply.
    pub fn handle(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request)),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification);
                None
            }
            JsonRpcMessage::Response(response) => {
                log::debug!("Ignoring response with id {:?}", response.id);
                None
            }
        }
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        if notification.method == methods::INITIALIZED {
            log::info!("Client finished initialization");
        } else {
            log::debug!("Ignoring notification '{}'", notification.method);
        }
    }

    fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            jsonrpc,
            id,
            method,
            params,
        } = request;

        if jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::error(
                Some(id),
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version '{jsonrpc}'"),
            );
        }

        log::debug!("Handling '{method}' request {id}");
        let result = match method.as_str() {
            methods::INITIALIZE => Ok(self.initialize_result()),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => Ok(self.list_tools_result()),
            methods::TOOLS_CALL => self.tools_call(params),
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::error(Some(id), code, message),
        }
    }

    fn initialize_result(&self) -> Value {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": {} }),
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        };
        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    fn list_tools_result(&self) -> Value {
        let result = ListToolsResult {
            tools: self.descriptors(),
            next_cursor: None,
        };
        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    fn tools_call(&self, params: Option<Value>) -> Result<Value, (i64, String)> {
        let params: CallToolParams = params
            .ok_or_else(|| "missing params".to_string())
            .and_then(|p| serde_json::from_value(p).map_err(|e| e.to_string()))
            .map_err(|e| (INVALID_PARAMS, format!("Invalid params for tools/call: {e}")))?;

        let result = self.call_tool(&params.name, params.arguments);
        serde_json::to_value(result).map_err(|e| (INVALID_PARAMS, e.to_string()))
    }
}
