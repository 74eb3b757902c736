//! Running turns against a shared conversation.
//!
//! A turn holds its conversation exclusively from start to finish. Starting a
//! second turn on a busy conversation is rejected rather than queued.

use crate::agent::{Agent, AgentState};
use crate::context::{ConversationContext, SharedContext};
use crate::error::TurnError;
use crate::protocol::Event;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use toolbridge_llm::chat::ChatMessage;

const EVENT_BUFFER: usize = 100;

/// Ordered, finite stream of a turn's events.
pub type EventStream = ReceiverStream<Event>;

/// A turn in progress.
///
/// Events can be observed at most once through [`TurnHandle::stream_events`].
/// The stream ends before the answer becomes available.
#[derive(Debug)]
pub struct TurnHandle {
    events: Option<EventStream>,
    task: JoinHandle<Result<String, TurnError>>,
}

impl TurnHandle {
    /// Takes the event stream. Returns `None` on every later call.
    pub fn stream_events(&mut self) -> Option<EventStream> {
        self.events.take()
    }

    /// Waits for the final answer. Events nobody took are discarded.
    pub async fn answer(mut self) -> Result<String, TurnError> {
        drop(self.events.take());
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(TurnError::Aborted(e.to_string())),
        }
    }
}

/// Starts a turn on `context`.
///
/// Fails with [`TurnError::TurnInProgress`] when another turn currently holds
/// the conversation. Must be called from within a tokio runtime.
pub fn run_turn(
    message: impl Into<String>,
    agent: Arc<Agent>,
    context: &SharedContext,
) -> Result<TurnHandle, TurnError> {
    let mut guard = context
        .clone()
        .try_lock_owned()
        .map_err(|_| TurnError::TurnInProgress)?;
    let message = message.into();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let task = tokio::spawn(async move { run_locked(&agent, &message, &mut guard, tx).await });

    Ok(TurnHandle {
        events: Some(ReceiverStream::new(rx)),
        task,
    })
}

async fn run_locked(
    agent: &Agent,
    message: &str,
    context: &mut ConversationContext,
    tx_event: mpsc::Sender<Event>,
) -> Result<String, TurnError> {
    let outcome = {
        let (history, state) = context.parts_mut();
        agent.execute(message, history, state, tx_event).await
    };

    match outcome {
        Ok(outcome) => {
            context.commit(outcome.messages);
            context.reset_state();
            log::debug!("Turn {} finished", context.turns());
            Ok(outcome.answer)
        }
        Err(e) => {
            log::warn!("Turn failed: {e}");
            context.reset_state();
            Err(e)
        }
    }
}

/// An agent paired with its own conversation.
#[derive(Debug, Clone)]
pub struct Conversation {
    agent: Arc<Agent>,
    context: SharedContext,
}

impl Conversation {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self::with_context(agent, ConversationContext::new().shared())
    }

    pub fn with_context(agent: Arc<Agent>, context: SharedContext) -> Self {
        Self { agent, context }
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Starts a turn and returns its handle.
    pub fn start(&self, message: impl Into<String>) -> Result<TurnHandle, TurnError> {
        run_turn(message, self.agent.clone(), &self.context)
    }

    /// Runs a turn to completion, discarding its events.
    pub async fn run(&self, message: impl Into<String>) -> Result<String, TurnError> {
        self.start(message)?.answer().await
    }

    /// Copy of the committed history. Waits for a running turn to finish.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.context.lock().await.messages().to_vec()
    }

    pub async fn state(&self) -> AgentState {
        self.context.lock().await.state()
    }
}
