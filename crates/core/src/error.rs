use std::time::Duration;

/// Failures seen by a tool registry client while talking to a host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out after {0:?} waiting for the tool host")]
    Timeout(Duration),
}

/// Reasons a conversation turn can fail.
///
/// A failed turn leaves the conversation history exactly as it was before the
/// turn started.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Completion backend error: {0}")]
    CompletionBackend(String),

    #[error("Completion backend did not reply within {0:?}")]
    CompletionTimeout(Duration),

    #[error("Protocol error: model requested unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tool invocation failed: {0}")]
    Tool(#[from] ClientError),

    #[error("Maximum iterations exceeded: {0}")]
    MaxIterations(usize),

    #[error("A turn is already running on this conversation")]
    TurnInProgress,

    #[error("Turn aborted: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let error = ClientError::Connection("connection refused".to_string());
        assert_eq!(error.to_string(), "Connection error: connection refused");

        let error = ClientError::Timeout(Duration::from_secs(30));
        assert_eq!(
            error.to_string(),
            "Timed out after 30s waiting for the tool host"
        );
    }

    #[test]
    fn test_turn_error_from_client_error() {
        let error: TurnError = ClientError::Protocol("bad reply".to_string()).into();
        assert!(matches!(error, TurnError::Tool(ClientError::Protocol(_))));
        assert_eq!(
            error.to_string(),
            "Tool invocation failed: Protocol error: bad reply"
        );
    }

    #[test]
    fn test_unknown_tool_is_reported_as_protocol_error() {
        let error = TurnError::UnknownTool("delete_everything".to_string());
        assert!(error.to_string().starts_with("Protocol error"));
        assert!(error.to_string().contains("delete_everything"));
    }
}
