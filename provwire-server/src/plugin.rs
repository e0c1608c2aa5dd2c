//! Entry point for provider plugin binaries.

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::provider::Provider;
use crate::server::{router, ServerConfig};
use crate::servicer::ProviderServer;

/// Command line the engine launches a provider plugin with.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(about = "Resource provider plugin (HTTP server)")]
pub struct ProviderArgs {
    /// Engine address
    pub engine: String,

    /// Currently ignored
    #[arg(long)]
    pub logflow: bool,

    /// Currently ignored
    #[arg(long)]
    pub logtostderr: bool,
}

/// Serve `provider` on an OS-assigned port until ctrl-c.
pub async fn serve<P: Provider>(provider: P, args: ProviderArgs) -> anyhow::Result<()> {
    serve_with_config(provider, args, ServerConfig::default()).await
}

/// Serve `provider` with an explicit configuration. The bound port is
/// written to stdout followed by a newline, which is how the engine finds
/// the plugin.
pub async fn serve_with_config<P: Provider>(
    provider: P,
    args: ProviderArgs,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let server = Arc::new(ProviderServer::new(provider, args.engine));
    let app = router(server, config.max_body_bytes);

    let listener = TcpListener::bind(config.addr()).await?;
    let port = listener.local_addr()?.port();
    announce_port(port)?;

    info!("Provider listening on {}:{}", config.host, port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Provider shut down");
    Ok(())
}

fn announce_port(port: u16) -> std::io::Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", port)?;
    stdout.flush()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args =
            ProviderArgs::try_parse_from(["echo-provider", "127.0.0.1:4000", "--logtostderr"])
                .unwrap();
        assert_eq!(args.engine, "127.0.0.1:4000");
        assert!(args.logtostderr);
        assert!(!args.logflow);
    }

    #[test]
    fn test_engine_address_is_required() {
        assert!(ProviderArgs::try_parse_from(["echo-provider"]).is_err());
    }
}
