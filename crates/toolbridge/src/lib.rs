//! Tool-calling chat agent and the tool host it talks to.
//!
//! This crate re-exports the pieces most programs need: the agent and turn
//! runner from [`core`], the chat capability from [`llm`], and the derive
//! macros for declaring host-side tools.

pub use async_trait::async_trait;

pub use toolbridge_core::{self as core, ClientError, TurnError};
pub use toolbridge_derive::{tool, ToolInput};
pub use toolbridge_llm::{self as llm, error as llm_error};

/// Initialises `env_logger` with an `info` default, overridable by `RUST_LOG`.
#[cfg(feature = "logging")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
