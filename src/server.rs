//! HTTP status server for a running classifier.
//!
//! Exposes read-only endpoints on localhost so dashboards and scripts can
//! check on a long-running prediction session:
//!
//! ```text
//! GET /health ──→ {status, version}
//! GET /status ──→ {instance_id, state, windowed, stats, ...}
//! ```

use crate::core::{Classifier, StatusReport};
use crate::trainer::Trainer;
use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Anything that can report classifier status.
pub trait StatusProvider: Send + Sync + 'static {
    fn status(&self) -> StatusReport;
}

impl<T: Trainer> StatusProvider for Classifier<T> {
    fn status(&self) -> StatusReport {
        Classifier::status(self)
    }
}

/// Shared server state
type SharedProvider = Arc<dyn StatusProvider>;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /status
async fn status(State(provider): State<SharedProvider>) -> Json<StatusReport> {
    Json(provider.status())
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    provider: SharedProvider,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(provider);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Status server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
