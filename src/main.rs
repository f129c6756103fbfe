use codepoint_tcp::{Listener, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::default();
    let listener = Listener::bind(config.addr)?;
    tracing::info!(
        message = "Streaming message to every client.",
        addr = %listener.local_addr()?,
        code_points = config.streamer.message.len(),
    );

    // accept errors are fatal: returning them exits with status 1
    Server::new(config)?.run(listener.incoming()).await?;
    Ok(())
}
