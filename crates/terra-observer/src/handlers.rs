//! REST endpoint handlers for the telemetry API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/healthz` | Liveness probe |
//! | `GET` | `/api/metrics` | Current-instant sample |
//! | `GET` | `/api/export` | Historical export (`format`, `minutes`) |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{Uri, header};
use axum::response::{IntoResponse, Response};
use terra_core::export::{self, clamp_minutes};
use terra_types::ExportFormat;
use tracing::{debug, error};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/export` endpoint.
///
/// Both fields are taken as raw strings: `format` is validated strictly,
/// while `minutes` is clamped and never rejected.
#[derive(Debug, serde::Deserialize)]
pub struct ExportQuery {
    /// `csv` or `jsonl`. Required.
    pub format: Option<String>,
    /// Window size in minutes (default 30, clamped to `[1, 1440]`).
    pub minutes: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /healthz
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// GET /api/metrics
// ---------------------------------------------------------------------------

/// Return one freshly synthesized sample.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Response, ObserverError> {
    let sample = state.synthesizer.current_sample().map_err(|e| {
        error!(error = %e, "failed to generate metric sample");
        ObserverError::Snapshot
    })?;

    Ok((
        [(header::CACHE_CONTROL, "no-store, max-age=0")],
        Json(sample),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// GET /api/export
// ---------------------------------------------------------------------------

/// Return the historical window as a CSV or JSONL attachment.
///
/// A missing or unrecognized `format` is rejected with 400 before any
/// record is generated. Any generation failure yields a generic 500 with
/// no partial body.
pub async fn get_export(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ObserverError> {
    let format: ExportFormat = query
        .format
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e: terra_types::FormatError| ObserverError::InvalidQuery(e.to_string()))?;
    let minutes = clamp_minutes(query.minutes.as_deref());

    let document = export::export(&state.synthesizer, format, minutes).map_err(|e| {
        error!(error = %e, %format, minutes, "failed to generate export");
        ObserverError::Export
    })?;

    debug!(%format, minutes = document.minutes, "export served");

    let disposition = format!("attachment; filename=\"{}\"", document.filename());
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type().to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, String::from("no-store")),
        ],
        document.body,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// JSON 404 for unmatched routes.
pub async fn not_found(uri: Uri) -> ObserverError {
    ObserverError::NotFound(format!("no route for {uri}"))
}
