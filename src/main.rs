use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use queue_exporter::config::Config;
use queue_exporter::server;
use queue_exporter::ExporterEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        store = %config.store.addr,
        patterns = %config.scan.key_patterns,
        merge_policy = %config.scan.merge_policy,
        timeout_ms = config.store.timeout_ms,
        "🚀 Queue exporter starting"
    );

    let addr = config.server.listen_addr();
    let engine = ExporterEngine::new(config);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    server::serve(listener, engine, server::shutdown_signal()).await?;
    Ok(())
}
