//! Error types for the telemetry API layer.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//! Generation failures carry a fixed public message; the cause is logged
//! where it happens and never reaches the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// No route matched.
    #[error("not found: {0}")]
    NotFound(String),

    /// An invalid or missing query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The snapshot sample could not be synthesized.
    #[error("Failed to generate metrics")]
    Snapshot,

    /// The export document could not be produced.
    #[error("Failed to generate export")]
    Export,
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Snapshot | Self::Export => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
