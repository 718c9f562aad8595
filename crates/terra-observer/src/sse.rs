//! Server-Sent Events transport for the live stream.
//!
//! Clients connect to `GET /api/stream` and receive one `data:` line per
//! [`StreamEvent`](terra_types::StreamEvent). When the client goes away,
//! Axum drops the response body, which drops the session's receiver and
//! cancels it.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::state::AppState;

/// Open a live stream over SSE.
///
/// # Route
///
/// `GET /api/stream`
pub async fn stream_sse(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.open_stream("sse");
    let events = ReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
    Sse::new(events).keep_alive(KeepAlive::default())
}
