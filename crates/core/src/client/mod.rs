//! Agent-side access to a remote tool host.

mod pending;
mod sse;
mod stdio;
mod transport;

pub use sse::SseTransport;
pub use stdio::StdioTransport;
pub use transport::Transport;

use crate::error::ClientError;
use crate::mcp::{
    methods, CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JsonRpcResponse, ListToolsParams, ListToolsResult, PROTOCOL_VERSION,
};
use crate::tool::{ToolDescriptor, ToolInvocationRequest, ToolInvocationResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Discovers and invokes tools on a host.
///
/// Every call is a fresh round trip. Nothing is cached and nothing is
/// retried.
#[async_trait]
pub trait ToolRegistryClient: Send + Sync {
    /// Lists the tools the host currently offers.
    async fn discover(&self) -> Result<Vec<ToolDescriptor>, ClientError>;

    /// Runs one tool call. A failure reported by the host comes back as a
    /// result with `succeeded == false`, not as an error.
    async fn invoke(
        &self,
        request: ToolInvocationRequest,
    ) -> Result<ToolInvocationResult, ClientError>;
}

#[async_trait]
impl<T: ToolRegistryClient + ?Sized> ToolRegistryClient for Arc<T> {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        (**self).discover().await
    }

    async fn invoke(
        &self,
        request: ToolInvocationRequest,
    ) -> Result<ToolInvocationResult, ClientError> {
        (**self).invoke(request).await
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on any single round trip to the host.
    pub request_timeout: Duration,
    pub client_name: String,
    pub client_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            client_name: "toolbridge".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Tool registry client speaking the tool protocol over any [`Transport`].
pub struct McpClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    server: InitializeResult,
}

impl<T: Transport> McpClient<T> {
    /// Performs the handshake and returns a ready client.
    pub async fn connect(transport: T, config: ClientConfig) -> Result<Self, ClientError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation::new(&config.client_name, &config.client_version),
        };
        let response = transport
            .request(
                methods::INITIALIZE,
                Some(to_params(&params)?),
                config.request_timeout,
            )
            .await?;
        let server: InitializeResult = decode_result(methods::INITIALIZE, response)?;

        if server.protocol_version != PROTOCOL_VERSION {
            log::warn!(
                "Tool host speaks protocol {}, expected {PROTOCOL_VERSION}",
                server.protocol_version
            );
        }
        log::info!(
            "Connected to tool host {} {}",
            server.server_info.name,
            server.server_info.version
        );

        transport.notify(methods::INITIALIZED, None).await?;
        Ok(Self {
            transport,
            config,
            server,
        })
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server.server_info
    }

    pub fn instructions(&self) -> Option<&str> {
        self.server.instructions.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Round trip to check the host is alive.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let response = self
            .transport
            .request(methods::PING, None, self.config.request_timeout)
            .await?;
        response
            .into_result()
            .map(|_| ())
            .map_err(|e| ClientError::Protocol(format!("ping failed: {e}")))
    }
}

impl McpClient<SseTransport> {
    /// Connects over SSE, e.g. to `http://127.0.0.1:8000/sse`.
    pub async fn connect_sse(url: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let transport = SseTransport::connect(url, config.request_timeout).await?;
        Self::connect(transport, config).await
    }
}

impl McpClient<StdioTransport> {
    /// Spawns a host process and connects over its stdin/stdout.
    pub async fn connect_stdio(
        program: &str,
        args: &[String],
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let transport = StdioTransport::spawn(program, args)?;
        Self::connect(transport, config).await
    }
}

#[async_trait]
impl<T: Transport> ToolRegistryClient for McpClient<T> {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let mut tools = Vec::new();
        let mut cursor = None;
        loop {
            let params = to_params(&ListToolsParams { cursor })?;
            let response = self
                .transport
                .request(methods::TOOLS_LIST, Some(params), self.config.request_timeout)
                .await?;
            let page: ListToolsResult = decode_result(methods::TOOLS_LIST, response)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        log::debug!("Discovered {} tool(s)", tools.len());
        Ok(tools)
    }

    async fn invoke(
        &self,
        request: ToolInvocationRequest,
    ) -> Result<ToolInvocationResult, ClientError> {
        let params = to_params(&CallToolParams {
            name: request.tool_name.clone(),
            arguments: request.arguments.clone(),
        })?;
        let response = self
            .transport
            .request(methods::TOOLS_CALL, Some(params), self.config.request_timeout)
            .await?;

        let value = match response.into_result() {
            Ok(value) => value,
            Err(error) => return Ok(ToolInvocationResult::failure(&request, error.message)),
        };
        let result: CallToolResult = serde_json::from_value(value).map_err(|e| {
            ClientError::Protocol(format!("malformed tools/call result: {e}"))
        })?;

        if result.is_error {
            Ok(ToolInvocationResult::failure(&request, result.text()))
        } else {
            Ok(ToolInvocationResult::success(&request, result.text()))
        }
    }
}

fn to_params<P: Serialize>(params: &P) -> Result<Value, ClientError> {
    serde_json::to_value(params)
        .map_err(|e| ClientError::Protocol(format!("failed to encode params: {e}")))
}

fn decode_result<R: DeserializeOwned>(
    method: &str,
    response: JsonRpcResponse,
) -> Result<R, ClientError> {
    let value = response
        .into_result()
        .map_err(|e| ClientError::Protocol(format!("{method} failed: {e}")))?;
    serde_json::from_value(value)
        .map_err(|e| ClientError::Protocol(format!("malformed {method} result: {e}")))
}
