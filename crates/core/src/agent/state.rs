/// Where a conversation is within its current turn.
///
/// A turn moves `Idle → Thinking`, through any number of
/// `ToolCallPending → ToolCallResolved → Thinking` rounds, then
/// `Answering → Done → Idle`. A failed turn drops straight back to `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgentState {
    #[default]
    Idle,
    Thinking,
    ToolCallPending,
    ToolCallResolved,
    Answering,
    Done,
}

impl AgentState {
    pub fn can_transition_to(self, next: AgentState) -> bool {
        use AgentState::*;
        matches!(
            (self, next),
            (_, Idle)
                | (Idle, Thinking)
                | (Thinking, ToolCallPending)
                | (Thinking, Answering)
                | (ToolCallPending, ToolCallResolved)
                | (ToolCallResolved, Thinking)
                | (Answering, Done)
        )
    }

    pub fn is_busy(self) -> bool {
        !matches!(self, AgentState::Idle | AgentState::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(AgentState::default(), AgentState::Idle);
        assert!(!AgentState::Idle.is_busy());
    }

    #[test]
    fn test_tool_round_transitions() {
        assert!(AgentState::Idle.can_transition_to(AgentState::Thinking));
        assert!(AgentState::Thinking.can_transition_to(AgentState::ToolCallPending));
        assert!(AgentState::ToolCallPending.can_transition_to(AgentState::ToolCallResolved));
        assert!(AgentState::ToolCallResolved.can_transition_to(AgentState::Thinking));
        assert!(AgentState::Thinking.can_transition_to(AgentState::Answering));
        assert!(AgentState::Answering.can_transition_to(AgentState::Done));
        assert!(AgentState::Done.can_transition_to(AgentState::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!AgentState::Idle.can_transition_to(AgentState::Answering));
        assert!(!AgentState::ToolCallPending.can_transition_to(AgentState::Answering));
        assert!(!AgentState::Done.can_transition_to(AgentState::Thinking));
    }

    #[test]
    fn test_failure_resets_from_anywhere() {
        for state in [
            AgentState::Thinking,
            AgentState::ToolCallPending,
            AgentState::ToolCallResolved,
            AgentState::Answering,
        ] {
            assert!(state.is_busy());
            assert!(state.can_transition_to(AgentState::Idle));
        }
    }
}
