//! Axum router construction for the telemetry API.
//!
//! Assembles all routes (REST + SSE + `WebSocket`) into a single
//! [`Router`] with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, sse, ws};

/// Build the complete Axum router for the telemetry server.
///
/// The router includes:
/// - `GET /healthz` -- liveness probe
/// - `GET /api/metrics` -- current sample
/// - `GET /api/stream` -- SSE live stream
/// - `GET /ws/stream` -- `WebSocket` live stream
/// - `GET /api/export` -- CSV / JSONL export
///
/// CORS allows any origin: the dashboard is served from elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        // Live stream
        .route("/api/stream", get(sse::stream_sse))
        .route("/ws/stream", get(ws::ws_stream))
        // REST API
        .route("/api/metrics", get(handlers::get_metrics))
        .route("/api/export", get(handlers::get_export))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
