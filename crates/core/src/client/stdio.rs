//! One-shot transport: newline-delimited JSON-RPC over a byte pipe.
//!
//! Each request is written as one line and answered by exactly one line.
//! Usually the pipe is the stdin/stdout of a spawned tool host process.

use super::pending::PendingRequests;
use super::transport::Transport;
use crate::error::ClientError;
use crate::mcp::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct StdioTransport {
    writer: Mutex<BoxedWriter>,
    pending: Arc<PendingRequests>,
    reader: JoinHandle<()>,
    // Held so the child lives as long as the transport.
    _child: Option<Child>,
}

impl StdioTransport {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending = Arc::new(PendingRequests::new());
        let reader = tokio::spawn(Self::read_loop(reader, pending.clone()));
        Self {
            writer: Mutex::new(Box::new(writer)),
            pending,
            reader,
            _child: None,
        }
    }

    /// Starts `program` and talks to it over its stdin and stdout. The child
    /// is killed when the transport is dropped.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, ClientError> {
        log::info!("Starting tool host process '{program}'");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClientError::Connection(format!("failed to start '{program}': {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ClientError::Connection("tool host process has no stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ClientError::Connection("tool host process has no stdout".to_string())
        })?;

        let mut transport = Self::new(stdout, stdin);
        transport._child = Some(child);
        Ok(transport)
    }

    async fn read_loop<R>(reader: R, pending: Arc<PendingRequests>)
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<JsonRpcResponse>(&line) {
                        Ok(response) => pending.complete(response).await,
                        Err(e) => log::warn!("Undecodable line from tool host: {e}"),
                    }
                }
                Ok(None) => {
                    log::info!("Tool host closed its output");
                    break;
                }
                Err(e) => {
                    log::warn!("Failed reading from tool host: {e}");
                    break;
                }
            }
        }
        pending.fail_all().await;
    }

    async fn write_line<T: Serialize + Sync>(&self, message: &T) -> Result<(), ClientError> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| ClientError::Protocol(format!("failed to encode message: {e}")))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, ClientError> {
        let (id, rx) = self.pending.register().await?;
        let request = JsonRpcRequest::new(RequestId::Number(id), method, params);
        log::debug!("Sending '{method}' request {id}");

        if let Err(e) = self.write_line(&request).await {
            self.pending.cancel(id).await;
            return Err(e);
        }
        self.pending.wait(id, rx, timeout).await
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        self.write_line(&JsonRpcNotification::new(method, params))
            .await
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
