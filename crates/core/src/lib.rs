pub mod agent;
pub mod client;
pub mod context;
mod error;
pub mod host;
pub mod mcp;
pub mod protocol;
pub mod runner;
pub mod tool;

pub use error::{ClientError, TurnError};
pub use toolbridge_llm as llm;
