//! HTTP server for the Prometheus metrics endpoint.

use crate::config::WebSettings;
use crate::metrics::MetricsRegistry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

#[derive(Clone)]
struct AppState {
    registry: Arc<MetricsRegistry>,
    landing_page: Arc<str>,
}

/// HTTP server for exposing Prometheus metrics.
pub struct MetricsServer {
    config: WebSettings,
    registry: Arc<MetricsRegistry>,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(config: WebSettings, registry: Arc<MetricsRegistry>) -> Self {
        Self { config, registry }
    }

    /// Builds the router serving the metrics path, `/` and `/health`.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            landing_page: landing_page(&self.config.telemetry_path).into(),
        };

        Router::new()
            .route(&self.config.telemetry_path, get(metrics_handler))
            .route("/", get(landing_handler))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.listen_address).await?;

        tracing::info!(
            addr = %self.config.listen_address,
            path = %self.config.telemetry_path,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// HTML served at `/`, linking to the metrics path.
pub fn landing_page(metrics_path: &str) -> String {
    format!(
        "<html>\n<head><title>Buildkite exporter</title></head>\n<body>\n<h1>Buildkite exporter</h1>\n<p><a href='{metrics_path}'>Metrics</a></p>\n</body>\n</html>\n"
    )
}

/// Handler for the metrics endpoint.
///
/// The scrape blocks on upstream HTTP calls, so it runs off the async
/// workers.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = Arc::clone(&state.registry);

    match tokio::task::spawn_blocking(move || registry.encode()).await {
        Ok(Ok(output)) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Scrape task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Scrape failed: {}", e),
            )
        }
    }
}

async fn landing_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(state.landing_page.to_string())
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
