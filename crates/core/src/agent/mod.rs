mod base;
mod error;
mod executor;
mod state;

pub use base::{Agent, AgentBuilder, AgentConfig, DEFAULT_SYSTEM_PROMPT};
pub use error::AgentBuildError;
pub use executor::TurnOutcome;
pub use state::AgentState;
