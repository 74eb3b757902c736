//! SSE transport.
//!
//! A client opens `GET /sse` and keeps it open. The first frame is an
//! `endpoint` event naming the URL to POST requests to. Each POSTed request is
//! acknowledged with `202 Accepted` and its response is pushed back over the
//! client's stream as a `message` event.

use actix_web::{
    dev::Server,
    web::{self, Bytes},
    App, HttpResponse, HttpServer, Responder,
};
use futures::Stream;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::TcpListener;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use toolbridge_core::host::ToolHost;
use toolbridge_core::mcp::{JsonRpcResponse, PARSE_ERROR};
use uuid::Uuid;

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages/";

const SESSION_BUFFER: usize = 100;

/// Shared state of the SSE routes: the host plus one outbound channel per
/// open stream.
pub struct SseState {
    host: Arc<ToolHost>,
    sessions: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
}

impl SseState {
    pub fn new(host: Arc<ToolHost>) -> Self {
        Self {
            host,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new session and returns its id and outbound frames.
    pub fn open_session(&self) -> (Uuid, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        (id, rx)
    }

    pub fn close_session(&self, id: &Uuid) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    fn session(&self, id: &Uuid) -> Option<mpsc::Sender<String>> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Formats one SSE frame. Multi-line data is split over several `data:` lines.
pub fn frame(event: &str, data: &str) -> String {
    let mut out = format!("event: {event}\n");
    for line in data.split('\n') {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Outbound frames of one session. Dropping it ends the session.
struct SessionStream {
    id: Uuid,
    frames: ReceiverStream<String>,
    state: web::Data<SseState>,
}

impl Stream for SessionStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().frames)
            .poll_next(cx)
            .map(|frame| frame.map(|f| Ok(Bytes::from(f))))
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.state.close_session(&self.id);
        log::info!("Session {} closed", self.id.simple());
    }
}

async fn open_stream(state: web::Data<SseState>) -> HttpResponse {
    let (id, rx) = state.open_session();
    let endpoint = format!("{MESSAGES_PATH}?session_id={}", id.simple());
    log::info!("Session {} opened", id.simple());

    if let Some(tx) = state.session(&id) {
        let _ = tx.send(frame("endpoint", &endpoint)).await;
    }

    let stream = SessionStream {
        id,
        frames: ReceiverStream::new(rx),
        state: state.clone(),
    };
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(stream)
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn post_message(
    state: web::Data<SseState>,
    query: web::Query<SessionQuery>,
    body: Bytes,
) -> impl Responder {
    let Ok(id) = Uuid::parse_str(&query.session_id) else {
        return HttpResponse::BadRequest().body("Invalid session ID");
    };
    let Some(tx) = state.session(&id) else {
        log::warn!("Message for unknown session {}", query.session_id);
        return HttpResponse::NotFound().body("Could not find session");
    };
    let reply = match ToolHost::decode(&body) {
        Ok(message) => state.host.handle(message),
        Err(response) if is_parse_error(&response) => {
            log::warn!("Malformed message for session {}", id.simple());
            let reason = response.error.map(|e| e.message).unwrap_or_default();
            return HttpResponse::BadRequest().body(format!("Could not parse message: {reason}"));
        }
        Err(response) => Some(response),
    };

    if let Some(response) = reply {
        match serde_json::to_string(&response) {
            Ok(json) => {
                if tx.send(frame("message", &json)).await.is_err() {
                    log::warn!("Session {} closed before its response", id.simple());
                }
            }
            Err(e) => log::error!("Could not encode response: {e}"),
        }
    }
    HttpResponse::Accepted().body("Accepted")
}

fn is_parse_error(response: &JsonRpcResponse) -> bool {
    response
        .error
        .as_ref()
        .is_some_and(|e| e.code == PARSE_ERROR)
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route(SSE_PATH, web::get().to(open_stream))
        .route(MESSAGES_PATH, web::post().to(post_message));
}

/// Builds the HTTP server on an already bound listener.
pub fn server(host: Arc<ToolHost>, listener: TcpListener) -> std::io::Result<Server> {
    let state = web::Data::new(SseState::new(host));
    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .listen(listener)?
        .run();
    Ok(server)
}
