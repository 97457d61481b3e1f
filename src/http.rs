//! HTTP health-check and metrics endpoint.
//!
//! Hosting platforms probe `/` to decide whether the process is alive;
//! `/metrics` serves Prometheus text.

use axum::{Router, routing::get};
use std::net::SocketAddr;

/// Body returned by the health check.
pub const ONLINE_TEXT: &str = "nickwarden is online";

async fn health_handler() -> &'static str {
    ONLINE_TEXT
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/metrics", get(metrics_handler))
}

/// Run the HTTP server.
///
/// Binds to `0.0.0.0:port`. This is a long-running task that should be
/// spawned in the background; bind failures are logged, not fatal.
pub async fn run_http_server(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("HTTP server listening on {}", addr);

    if let Err(e) = axum::serve(listener, router()).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
