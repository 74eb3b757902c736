//! Test doubles shared by the workspace's test suites.

pub mod llm;
pub mod registry;

pub use llm::{MockLLMProvider, ScriptedLLMProvider, ScriptedReply};
pub use registry::MockToolRegistry;
