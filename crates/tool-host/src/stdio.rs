//! Stdio transport: one JSON-RPC message per line in, one response per line out.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use toolbridge_core::host::ToolHost;

const OUTPUT_BUFFER: usize = 100;

/// Serves `host` until `reader` reaches end of input.
///
/// Every line is handled on its own task. Responses go through a single
/// writer task so lines never interleave, and all of them are flushed before
/// this returns.
pub async fn serve<R, W>(host: Arc<ToolHost>, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<String>(OUTPUT_BUFFER);
    let writer_task = tokio::spawn(write_lines(rx, writer));

    let mut lines = reader.lines();
    let mut handlers = JoinSet::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let host = host.clone();
        let tx = tx.clone();
        handlers.spawn(async move {
            let Some(response) = host.handle_raw(&line) else {
                return;
            };
            match serde_json::to_string(&response) {
                Ok(json) => {
                    let _ = tx.send(json).await;
                }
                Err(e) => log::error!("Could not encode response: {e}"),
            }
        });
        reap_finished(&mut handlers);
    }
    log::info!("Input closed, finishing in-flight requests");

    while let Some(joined) = handlers.join_next().await {
        log_failure(joined);
    }
    drop(tx);
    writer_task.await.map_err(io::Error::other)?
}

/// Drops handlers that already finished so a long session holds only the
/// ones still running.
fn reap_finished(handlers: &mut JoinSet<()>) {
    while let Some(joined) = handlers.try_join_next() {
        log_failure(joined);
    }
}

fn log_failure(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        log::error!("Request handler failed: {e}");
    }
}

async fn write_lines<W>(mut rx: mpsc::Receiver<String>, mut writer: W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
