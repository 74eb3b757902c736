use crate::agent::AgentState;
use std::sync::Arc;
use tokio::sync::Mutex;
use toolbridge_llm::chat::ChatMessage;

/// Conversation state shared between turns.
pub type SharedContext = Arc<Mutex<ConversationContext>>;

/// History and state of one conversation.
///
/// Only whole turns are ever committed: a turn that fails leaves the history
/// as it was.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<ChatMessage>,
    state: AgentState,
    turns: usize,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Number of turns completed successfully.
    pub fn turns(&self) -> usize {
        self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.turns = 0;
    }

    pub(crate) fn parts_mut(&mut self) -> (&[ChatMessage], &mut AgentState) {
        (&self.messages, &mut self.state)
    }

    pub(crate) fn commit(&mut self, messages: Vec<ChatMessage>) {
        self.messages.extend(messages);
        self.turns += 1;
        self.state = AgentState::Done;
    }

    pub(crate) fn reset_state(&mut self) {
        self.state = AgentState::Idle;
    }
}
