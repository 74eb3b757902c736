//! A tool host serving `read_data` and `add_data` over SSE or stdio.

use clap::ValueEnum;
use toolbridge_core::host::ToolHost;

pub mod sse;
pub mod stdio;
pub mod tools;

pub use tools::{AddData, ReadData};

/// Name the host advertises during the handshake.
pub const HOST_NAME: &str = "hello-world";

/// How the host is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerType {
    /// Long-lived event stream plus a POST endpoint.
    Sse,
    /// Newline-delimited JSON-RPC on stdin/stdout.
    Stdio,
}

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub name: String,
    pub version: String,
    pub bind_host: String,
    pub port: u16,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: HOST_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            bind_host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// The host with both tools registered.
pub fn build_host(config: &HostConfig) -> ToolHost {
    ToolHost::new(&config.name, &config.version)
        .with_tool(Box::new(ReadData))
        .with_tool(Box::new(AddData))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_host_registers_both_tools() {
        let host = build_host(&HostConfig::default());
        assert_eq!(host.info().name, "hello-world");
        let names: Vec<String> = host.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["read_data", "add_data"]);
    }

    #[test]
    fn test_server_type_from_str() {
        assert_eq!(ServerType::from_str("sse", true).unwrap(), ServerType::Sse);
        assert_eq!(ServerType::from_str("STDIO", true).unwrap(), ServerType::Stdio);
        assert!(ServerType::from_str("websocket", true).is_err());
    }
}
