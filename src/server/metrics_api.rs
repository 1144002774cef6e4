//! Metrics endpoint: `GET /metrics` scans, merges and renders on every request.

use std::future::Future;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::ExporterEngine;

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn router(engine: ExporterEngine) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .layer(CompressionLayer::new())
        .with_state(engine)
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, engine: ExporterEngine, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("📈 Metrics available at http://{}/metrics", addr);
    }
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Always 200: scan failures only reduce what the snapshot holds. If the client goes away
/// mid-scan the handler future is dropped, which abandons the store queries.
pub async fn get_metrics(State(engine): State<ExporterEngine>) -> Response {
    let body = engine.collect().await;
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
