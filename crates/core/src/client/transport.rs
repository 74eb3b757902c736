use crate::error::ClientError;
use crate::mcp::JsonRpcResponse;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A bidirectional JSON-RPC channel to a tool host.
///
/// Implementations allocate request ids and match replies to requests, so
/// several requests may be in flight at once.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and waits at most `timeout` for its reply.
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, ClientError>;

    /// Sends a notification. No reply is expected.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError>;
}
