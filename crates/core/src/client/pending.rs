use crate::error::ClientError;
use crate::mcp::{JsonRpcResponse, RequestId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

/// Routes replies arriving on a shared connection back to their callers.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    next_id: AtomicI64,
    closed: AtomicBool,
    waiting: Mutex<HashMap<i64, oneshot::Sender<JsonRpcResponse>>>,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates an id and a slot for its reply.
    pub(crate) async fn register(
        &self,
    ) -> Result<(i64, oneshot::Receiver<JsonRpcResponse>), ClientError> {
        // `closed` is only flipped under this lock, so no waiter slips in after `fail_all`.
        let mut waiting = self.waiting.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Connection(
                "connection to the tool host is closed".to_string(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        waiting.insert(id, tx);
        Ok((id, rx))
    }

    /// Delivers a reply to whoever is waiting on its id.
    pub(crate) async fn complete(&self, response: JsonRpcResponse) {
        let id = match &response.id {
            Some(RequestId::Number(id)) => *id,
            other => {
                log::warn!("Dropping reply with unexpected id {other:?}");
                return;
            }
        };

        match self.waiting.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => log::warn!("Dropping reply for unknown request {id}"),
        }
    }

    pub(crate) async fn cancel(&self, id: i64) {
        self.waiting.lock().await.remove(&id);
    }

    /// Marks the connection closed; every waiter sees a connection error.
    pub(crate) async fn fail_all(&self) {
        let mut waiting = self.waiting.lock().await;
        self.closed.store(true, Ordering::Release);
        if !waiting.is_empty() {
            log::warn!("Connection closed with {} request(s) in flight", waiting.len());
        }
        waiting.clear();
    }

    /// Waits for the reply to `id`, giving up after `timeout`.
    pub(crate) async fn wait(
        &self,
        id: i64,
        rx: oneshot::Receiver<JsonRpcResponse>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, ClientError> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ClientError::Connection(
                "connection closed before the tool host replied".to_string(),
            )),
            Err(_) => {
                self.cancel(id).await;
                Err(ClientError::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_reply_routed_by_id() {
        let pending = PendingRequests::new();
        let (first, rx_first) = pending.register().await.unwrap();
        let (second, rx_second) = pending.register().await.unwrap();
        assert_ne!(first, second);

        pending
            .complete(JsonRpcResponse::success(RequestId::Number(second), json!(2)))
            .await;
        pending
            .complete(JsonRpcResponse::success(RequestId::Number(first), json!(1)))
            .await;

        let timeout = Duration::from_secs(1);
        let reply = pending.wait(first, rx_first, timeout).await.unwrap();
        assert_eq!(reply.result, Some(json!(1)));
        let reply = pending.wait(second, rx_second, timeout).await.unwrap();
        assert_eq!(reply.result, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register().await.unwrap();
        let result = pending.wait(id, rx, Duration::from_millis(10)).await;
        assert_eq!(result, Err(ClientError::Timeout(Duration::from_millis(10))));
        assert!(pending.waiting.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fail_all_closes_connection() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register().await.unwrap();
        pending.fail_all().await;

        let result = pending.wait(id, rx, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
        assert!(matches!(
            pending.register().await,
            Err(ClientError::Connection(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_register_racing_fail_all_never_times_out() {
        for _ in 0..50 {
            let pending = std::sync::Arc::new(PendingRequests::new());
            let registering = {
                let pending = pending.clone();
                tokio::spawn(async move { pending.register().await })
            };
            let closing = {
                let pending = pending.clone();
                tokio::spawn(async move { pending.fail_all().await })
            };
            let registered = registering.await.unwrap();
            closing.await.unwrap();

            if let Ok((id, rx)) = registered {
                let result = pending.wait(id, rx, Duration::from_millis(50)).await;
                assert!(matches!(result, Err(ClientError::Connection(_))));
            }
        }
    }
}
