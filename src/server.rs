//! Ingest Server - REST endpoint for the HTTP sink.
//!
//! Provides endpoints for:
//! - `POST /buckets` - store one bucket
//! - `POST /events` - store one event
//! - `GET /health` - liveness and uptime
//!
//! Records are written through whatever [`Sink`] the server is given,
//! normally a [`PostgresSink`](crate::sync::PostgresSink).
//!
//! # Usage
//!
//! ```bash
//! DSN=postgres://relay@localhost/activity cargo run --bin relay-ingest -- --port 8080
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::sync::{Bucket, Event, Sink};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Shared server state
pub struct ServerState {
    /// Where uploaded records go
    pub sink: Arc<dyn Sink>,
    /// When the server started
    pub started: Instant,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the API router
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/buckets", post(upload_bucket_handler))
        .route("/events", post(upload_event_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root endpoint - API info
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Activity Relay Ingest Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "buckets": "POST /buckets",
            "events": "POST /events"
        }
    }))
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}

/// Store one bucket
async fn upload_bucket_handler(
    State(state): State<Arc<ServerState>>,
    payload: std::result::Result<Json<Bucket>, JsonRejection>,
) -> (StatusCode, String) {
    let Json(bucket) = match payload {
        Ok(bucket) => bucket,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Error unmarshalling bucket data: {}", e.body_text()),
            )
        }
    };

    match state.sink.insert_bucket(&bucket).await {
        Ok(()) => (StatusCode::OK, "Bucket uploaded successfully".to_string()),
        Err(e) => {
            tracing::warn!("Failed to insert bucket {}: {}", bucket.key, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error inserting bucket: {}", e),
            )
        }
    }
}

/// Store one event
async fn upload_event_handler(
    State(state): State<Arc<ServerState>>,
    payload: std::result::Result<Json<Event>, JsonRejection>,
) -> (StatusCode, String) {
    let Json(event) = match payload {
        Ok(event) => event,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Error unmarshalling event data: {}", e.body_text()),
            )
        }
    };

    match state.sink.insert_event(&event).await {
        Ok(()) => (StatusCode::OK, "Event uploaded successfully".to_string()),
        Err(e) => {
            tracing::warn!("Failed to insert event {}: {}", event.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error inserting event: {}", e),
            )
        }
    }
}

/// Serve on an already-bound listener until the process is stopped
pub async fn serve(listener: TcpListener, sink: Arc<dyn Sink>) -> Result<()> {
    let state = Arc::new(ServerState {
        sink,
        started: Instant::now(),
    });

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// Start the ingest server, shutting down on Ctrl-C
pub async fn start_server(config: ServerConfig, sink: Arc<dyn Sink>) -> Result<()> {
    let state = Arc::new(ServerState {
        sink,
        started: Instant::now(),
    });

    let app = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Starting Activity Relay ingest server");
    tracing::info!("   Listening on: http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Ingest server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
