use clap::Parser;
use std::net::TcpListener;
use std::sync::Arc;
use tokio::io::BufReader;
use toolbridge_host::{build_host, sse, stdio, HostConfig, ServerType};

/// Serves the `read_data` and `add_data` tools.
#[derive(Parser, Debug)]
#[command(name = "toolbridge-host", version, about)]
struct Cli {
    /// Transport to serve on
    #[arg(long = "server-type", alias = "server_type", value_enum, default_value_t = ServerType::Sse)]
    server_type: ServerType,

    /// Address to bind in SSE mode
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind in SSE mode
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the stdio wire, so logs always go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = HostConfig {
        bind_host: cli.host,
        port: cli.port,
        ..HostConfig::default()
    };
    let host = Arc::new(build_host(&config));
    log::info!(
        "🚀 Starting {} tool host {} ({:?})",
        config.name,
        config.version,
        cli.server_type
    );

    match cli.server_type {
        ServerType::Sse => {
            let listener = TcpListener::bind((config.bind_host.as_str(), config.port))?;
            log::info!(
                "Listening on http://{}{}",
                listener.local_addr()?,
                sse::SSE_PATH
            );
            sse::server(host, listener)?.await?;
        }
        ServerType::Stdio => {
            stdio::serve(host, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        }
    }
    Ok(())
}
