use crate::error::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentBuildError {
    #[error("Tool discovery failed: {0}")]
    Discovery(#[from] ClientError),

    #[error("No LLM provider configured")]
    MissingLlm,

    #[error("No tool registry configured")]
    MissingRegistry,
}
