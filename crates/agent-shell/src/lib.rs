//! Line-oriented chat loop on top of a [`Conversation`].

use clap::ValueEnum;
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::StreamExt;
use toolbridge_core::client::{ClientConfig, McpClient, ToolRegistryClient};
use toolbridge_core::protocol::Event;
use toolbridge_core::runner::Conversation;
use toolbridge_core::ClientError;

pub const PROMPT: &str = "Enter your message: ";
pub const EXIT_MESSAGE: &str = "👋 Exiting...";

/// How the shell reaches the tool host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HostTransport {
    /// Connect to a running host's event stream.
    Sse,
    /// Start the host as a child process and talk over its stdin/stdout.
    Stdio,
}

/// `exit` in any case, surrounded by any whitespace.
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// The line printed for an event in verbose mode.
pub fn format_event(event: &Event) -> String {
    match event {
        Event::ToolCallStarted {
            tool_name,
            arguments,
            ..
        } => format!(
            "🔧 Calling tool '{tool_name}' with kwargs {}",
            serde_json::Value::Object(arguments.clone())
        ),
        Event::ToolCallFinished {
            tool_name, output, ..
        } => format!("✅ Tool '{tool_name}' returned: {output}"),
    }
}

/// Connects to the tool host. For stdio, `host_command` is split on
/// whitespace into the program and its arguments.
pub async fn connect_registry(
    transport: HostTransport,
    url: &str,
    host_command: &str,
    config: ClientConfig,
) -> Result<Arc<dyn ToolRegistryClient>, ClientError> {
    match transport {
        HostTransport::Sse => Ok(Arc::new(McpClient::connect_sse(url, config).await?)),
        HostTransport::Stdio => {
            let mut parts = host_command.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| ClientError::Connection("empty host command".to_string()))?;
            let args: Vec<String> = parts.map(str::to_string).collect();
            Ok(Arc::new(
                McpClient::connect_stdio(program, &args, config).await?,
            ))
        }
    }
}

pub struct Shell {
    conversation: Conversation,
    verbose: bool,
}

impl Shell {
    pub fn new(conversation: Conversation, verbose: bool) -> Self {
        Self {
            conversation,
            verbose,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Reads messages from `input` until `exit` or end of input, running one
    /// turn per line. Returns how many turns were submitted.
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut turns = 0;
        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\n").await?;
                break;
            };
            if is_exit_command(&line) {
                output
                    .write_all(format!("{EXIT_MESSAGE}\n").as_bytes())
                    .await?;
                break;
            }

            output
                .write_all(format!("User: {line}\n").as_bytes())
                .await?;
            turns += 1;
            let reply = match self.turn(&line, output).await? {
                Ok(answer) => format!("Agent: {answer}\n"),
                Err(e) => format!("Error: {e}\n"),
            };
            output.write_all(reply.as_bytes()).await?;
        }
        output.flush().await?;
        Ok(turns)
    }

    async fn turn<W>(
        &self,
        message: &str,
        output: &mut W,
    ) -> io::Result<Result<String, toolbridge_core::TurnError>>
    where
        W: AsyncWrite + Unpin,
    {
        let mut handle = match self.conversation.start(message) {
            Ok(handle) => handle,
            Err(e) => return Ok(Err(e)),
        };
        if let Some(mut events) = handle.stream_events() {
            while let Some(event) = events.next().await {
                if self.verbose {
                    output
                        .write_all(format!("{}\n", format_event(&event)).as_bytes())
                        .await?;
                }
            }
        }
        Ok(handle.answer().await)
    }
}
