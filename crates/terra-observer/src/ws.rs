//! `WebSocket` transport for the live stream.
//!
//! Clients connect to `GET /ws/stream` and receive each event as one
//! JSON text frame. A close frame or a dropped socket cancels the session.
//! After the server-side `close` event the socket is closed as well.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use terra_types::StreamEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin streaming.
///
/// # Route
///
/// `GET /ws/stream`
pub async fn ws_stream(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let rx = state.open_stream("websocket");
    let (outgoing, incoming) = socket.split();
    pump(rx, outgoing, incoming).await;
}

/// Forward session events to the peer until either side finishes.
///
/// Returning drops `rx`, which is what cancels the session.
async fn pump<Si, St, E>(mut rx: mpsc::Receiver<StreamEvent>, mut outgoing: Si, mut incoming: St)
where
    Si: Sink<Message> + Unpin,
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    // Session ended; its close event (if any) is already sent.
                    if outgoing.send(Message::Close(None)).await.is_err() {
                        debug!("WebSocket client gone before close frame");
                    }
                    return;
                };
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!("Failed to serialize stream event: {e}");
                        continue;
                    }
                };
                if outgoing.send(Message::Text(json.into())).await.is_err() {
                    debug!("WebSocket client disconnected (send failed)");
                    return;
                }
            }
            frame = incoming.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if outgoing.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Clients have nothing to say on this channel.
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Bytes;
    use futures::channel::mpsc as frames;
    use serde_json::Value;
    use terra_types::CloseReason;

    fn event_type(message: &Message) -> Option<String> {
        let Message::Text(text) = message else {
            return None;
        };
        let value: Value = serde_json::from_str(text.as_str()).ok()?;
        value.get("type").and_then(Value::as_str).map(str::to_owned)
    }

    #[tokio::test]
    async fn events_are_framed_then_socket_is_closed() {
        let (tx, rx) = mpsc::channel(4);
        let (out_tx, out_rx) = frames::unbounded::<Message>();
        let (_in_tx, in_rx) = frames::unbounded::<Result<Message, axum::Error>>();

        let error = StreamEvent::Error {
            message: "Failed to generate metric".to_owned(),
        };
        let close = StreamEvent::Close {
            reason: CloseReason::IdleTimeout,
        };
        assert!(tx.send(error).await.is_ok());
        assert!(tx.send(close).await.is_ok());
        drop(tx);

        pump(rx, out_tx, in_rx).await;
        let sent: Vec<Message> = out_rx.collect().await;

        assert_eq!(sent.len(), 3);
        let kinds: Vec<String> = sent.iter().filter_map(event_type).collect();
        assert_eq!(kinds, ["error", "close"]);
        assert!(matches!(sent.last(), Some(Message::Close(None))));
    }

    #[tokio::test]
    async fn client_close_frame_cancels_the_session() {
        let (tx, rx) = mpsc::channel::<StreamEvent>(4);
        let (out_tx, out_rx) = frames::unbounded::<Message>();
        let (in_tx, in_rx) = frames::unbounded::<Result<Message, axum::Error>>();

        assert!(in_tx.unbounded_send(Ok(Message::Close(None))).is_ok());
        pump(rx, out_tx, in_rx).await;

        assert!(tx.is_closed());
        let sent: Vec<Message> = out_rx.collect().await;
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn dropped_socket_cancels_the_session() {
        let (tx, rx) = mpsc::channel::<StreamEvent>(4);
        let (out_tx, _out_rx) = frames::unbounded::<Message>();
        let (in_tx, in_rx) = frames::unbounded::<Result<Message, axum::Error>>();

        drop(in_tx);
        pump(rx, out_tx, in_rx).await;

        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let (tx, rx) = mpsc::channel::<StreamEvent>(4);
        let (out_tx, mut out_rx) = frames::unbounded::<Message>();
        let (in_tx, in_rx) = frames::unbounded::<Result<Message, axum::Error>>();

        let handle = tokio::spawn(pump(rx, out_tx, in_rx));
        assert!(in_tx
            .unbounded_send(Ok(Message::Ping(Bytes::from_static(b"hb"))))
            .is_ok());

        let reply = out_rx.next().await;
        assert!(matches!(reply, Some(Message::Pong(data)) if data == Bytes::from_static(b"hb")));

        drop(tx);
        assert!(handle.await.is_ok());
        assert!(matches!(out_rx.next().await, Some(Message::Close(None))));
    }
}
