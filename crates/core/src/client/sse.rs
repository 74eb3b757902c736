//! Streamed-connection transport over Server-Sent Events.
//!
//! The client opens `GET <url>` and keeps the event stream open. The host's
//! first event names the endpoint that requests are POSTed to; replies come
//! back on the stream as `message` events.

use super::pending::PendingRequests;
use super::transport::Transport;
use crate::error::ClientError;
use crate::mcp::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental parser for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds raw bytes and returns every event completed by them.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = Self::parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }

    fn parse_block(block: &str) -> Option<SseEvent> {
        let mut event = None;
        let mut data: Vec<&str> = Vec::new();

        for line in block.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => data.push(value),
                _ => {}
            }
        }

        if event.is_none() && data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: data.join("\n"),
        })
    }
}

/// A byte stream decoded into events.
pub(crate) struct SseEventStream<S> {
    inner: S,
    decoder: SseDecoder,
    ready: VecDeque<SseEvent>,
}

impl<S, B, E> SseEventStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: SseDecoder::default(),
            ready: VecDeque::new(),
        }
    }

    /// Next complete event, `None` once the stream has ended.
    pub(crate) async fn next_event(&mut self) -> Option<Result<SseEvent, ClientError>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(Ok(event));
            }
            match self.inner.next().await? {
                Ok(chunk) => self.ready.extend(self.decoder.push(chunk.as_ref())),
                Err(e) => return Some(Err(ClientError::Connection(e.to_string()))),
            }
        }
    }
}

pub struct SseTransport {
    http: reqwest::Client,
    endpoint: Url,
    pending: Arc<PendingRequests>,
    reader: JoinHandle<()>,
}

impl SseTransport {
    /// Opens the event stream at `url` and waits for the host to announce its
    /// message endpoint.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(url)
            .map_err(|e| ClientError::Connection(format!("invalid url '{url}': {e}")))?;
        let http = reqwest::Client::new();

        log::info!("Connecting to tool host at {base}");
        let response = tokio::time::timeout(
            timeout,
            http.get(base.clone())
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache")
                .send(),
        )
        .await
        .map_err(|_| ClientError::Timeout(timeout))?
        .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Connection(format!(
                "GET {base} returned {}",
                response.status()
            )));
        }

        let mut events = SseEventStream::new(Box::pin(response.bytes_stream()));
        let endpoint = tokio::time::timeout(timeout, Self::read_endpoint(&mut events))
            .await
            .map_err(|_| ClientError::Timeout(timeout))??;
        let endpoint = base
            .join(&endpoint)
            .map_err(|e| ClientError::Protocol(format!("invalid endpoint '{endpoint}': {e}")))?;
        log::debug!("Tool host message endpoint is {endpoint}");

        let pending = Arc::new(PendingRequests::new());
        let reader = tokio::spawn(Self::read_loop(events, pending.clone()));

        Ok(Self {
            http,
            endpoint,
            pending,
            reader,
        })
    }

    async fn read_endpoint<S, B, E>(events: &mut SseEventStream<S>) -> Result<String, ClientError>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Display,
    {
        while let Some(event) = events.next_event().await {
            let event = event?;
            if event.event == "endpoint" {
                return Ok(event.data);
            }
            log::debug!("Skipping '{}' event before endpoint", event.event);
        }
        Err(ClientError::Connection(
            "event stream closed before the endpoint was announced".to_string(),
        ))
    }

    async fn read_loop<S, B, E>(mut events: SseEventStream<S>, pending: Arc<PendingRequests>)
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Display,
    {
        while let Some(event) = events.next_event().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("Event stream failed: {e}");
                    break;
                }
            };
            if event.event != "message" {
                log::debug!("Ignoring '{}' event", event.event);
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                Ok(response) => pending.complete(response).await,
                Err(e) => log::warn!("Undecodable message from tool host: {e}"),
            }
        }
        log::info!("Tool host event stream closed");
        pending.fail_all().await;
    }

    async fn post<T: Serialize + Sync>(&self, body: &T) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::BAD_REQUEST => Err(ClientError::Protocol(
                "tool host rejected the message as malformed".to_string(),
            )),
            status => Err(ClientError::Connection(format!(
                "tool host returned {status} for {}",
                self.endpoint
            ))),
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, ClientError> {
        let (id, rx) = self.pending.register().await?;
        let request = JsonRpcRequest::new(RequestId::Number(id), method, params);
        log::debug!("Sending '{method}' request {id}");

        match tokio::time::timeout(timeout, self.post(&request)).await {
            Ok(Ok(())) => self.pending.wait(id, rx, timeout).await,
            Ok(Err(e)) => {
                self.pending.cancel(id).await;
                Err(e)
            }
            Err(_) => {
                self.pending.cancel(id).await;
                Err(ClientError::Timeout(timeout))
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        self.post(&JsonRpcNotification::new(method, params)).await
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
