//! Wire format shared by the tool host and the registry client.
//!
//! Messages are JSON-RPC 2.0 envelopes carrying the tool-protocol methods
//! below. The same types are used for both the SSE and the stdio transport.

mod jsonrpc;
mod schema;

pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    RequestId, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
pub use schema::{
    CallToolParams, CallToolResult, Content, Implementation, InitializeParams, InitializeResult,
    ListToolsParams, ListToolsResult, PROTOCOL_VERSION,
};

/// Method names understood by the tool host.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}
