use clap::Parser;
use std::time::Duration;
use tokio::io::BufReader;
use toolbridge_core::agent::AgentBuilder;
use toolbridge_core::client::ClientConfig;
use toolbridge_core::runner::Conversation;
use toolbridge_llm::backends::ollama::Ollama;
use toolbridge_llm::builder::LLMBuilder;
use toolbridge_shell::{connect_registry, HostTransport, Shell};

/// Chat with an agent that can call the tool host's operations.
#[derive(Parser, Debug)]
#[command(name = "toolbridge-shell", version, about)]
struct Cli {
    /// How to reach the tool host
    #[arg(long, value_enum, default_value_t = HostTransport::Sse)]
    transport: HostTransport,

    /// Event stream URL of a running host
    #[arg(long, default_value = "http://127.0.0.1:8000/sse")]
    url: String,

    /// Command that starts a host speaking stdio
    #[arg(long, default_value = "toolbridge-host --server-type stdio")]
    host_command: String,

    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,

    #[arg(long, default_value = "llama3.2")]
    model: String,

    /// Seconds allowed for one completion request
    #[arg(long, default_value_t = 120)]
    completion_timeout: u64,

    /// Seconds allowed for one round trip to the tool host
    #[arg(long, default_value_t = 30)]
    tool_timeout: u64,

    /// Do not print tool call events
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = ClientConfig {
        request_timeout: Duration::from_secs(cli.tool_timeout),
        ..ClientConfig::default()
    };
    let registry = connect_registry(cli.transport, &cli.url, &cli.host_command, config).await?;

    let llm = LLMBuilder::<Ollama>::new()
        .base_url(cli.ollama_url)
        .model(cli.model)
        .timeout_seconds(cli.completion_timeout)
        .build()?;

    let agent = AgentBuilder::discover(registry)
        .with_llm(llm)
        .completion_timeout(Duration::from_secs(cli.completion_timeout))
        .build()
        .await?;

    let shell = Shell::new(Conversation::new(agent), !cli.quiet);
    let mut stdout = tokio::io::stdout();
    shell.run(BufReader::new(tokio::io::stdin()), &mut stdout).await?;
    Ok(())
}
