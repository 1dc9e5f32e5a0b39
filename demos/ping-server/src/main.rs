use clap::Parser;
use modrouter::openapi::DocumentBuilder;
use modrouter::signal::shutdown_signal;
use modrouter::transport::http::RequestLogger;
use modrouter::{ConfigService, Router, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod ping;

use ping::{Echo, Ping, PingService, Pong};

/// Small HTTP service built from declarative endpoints.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Print the OpenAPI document and exit
    #[arg(long)]
    meta: bool,

    /// Listen host, overrides HOST
    #[arg(long, env = "PING_HOST")]
    host: Option<String>,

    /// Listen port, overrides PORT
    #[arg(long, env = "PING_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.meta {
        let doc = DocumentBuilder::new("Example API", "1.0.0")
            .documented::<Ping>()
            .endpoint::<Echo>()
            .build();
        println!("{}", doc.to_json_pretty()?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut server = ServerConfig::from_config(&ConfigService::new());
    if let Some(host) = args.host {
        server.host = host;
    }
    if let Some(port) = args.port {
        server.port = port;
    }

    let mut router = Router::new();
    router.use_middleware(RequestLogger);
    router.provide::<dyn PingService>("PingService", Arc::new(Pong));
    router.register(Ping::default());
    router.register(Echo::default());

    tracing::info!("🚀 Listening on http://{}", server.addr());

    router
        .listen_until(server.addr(), async {
            shutdown_signal().await;
            tracing::info!("🛑 Initiating graceful shutdown...");
        })
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}
