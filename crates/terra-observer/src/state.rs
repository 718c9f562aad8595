//! Shared application state for the telemetry API server.
//!
//! [`AppState`] holds only immutable configuration: the synthesizer with
//! its injected device profile, and the stream timing. Nothing in it is
//! mutated after startup, so handlers never lock.

use std::sync::Arc;

use terra_core::{CloseCause, StreamSession, StreamSettings, Synthesizer, TelemetryConfig};
use terra_types::StreamEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Sample and record synthesizer for the configured device.
    pub synthesizer: Arc<Synthesizer>,
    /// Timing applied to every new stream connection.
    pub stream: StreamSettings,
}

impl AppState {
    /// Create state from an explicit synthesizer and stream timing.
    pub fn new(synthesizer: Synthesizer, stream: StreamSettings) -> Self {
        Self {
            synthesizer: Arc::new(synthesizer),
            stream,
        }
    }

    /// Create state from loaded configuration.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(
            Synthesizer::new((&config.device).into()),
            StreamSettings::from(&config.stream),
        )
    }

    /// Start a stream session on its own task and return its event receiver.
    ///
    /// Dropping the receiver cancels the session. The session's outcome is
    /// logged when it ends.
    pub fn open_stream(&self, transport: &'static str) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = self.stream.channel();
        let session = StreamSession::new(Arc::clone(&self.synthesizer), self.stream);
        let id = session.id();
        debug!(session = %id, transport, "stream client connected");

        tokio::spawn(async move {
            let summary = session.run(tx).await;
            match summary.cause {
                CloseCause::Idle => info!(
                    session = %summary.id,
                    transport,
                    metrics = summary.metrics,
                    errors = summary.errors,
                    dropped = summary.dropped,
                    "stream closed on idle timeout"
                ),
                CloseCause::ClientCancel => debug!(
                    session = %summary.id,
                    transport,
                    metrics = summary.metrics,
                    dropped = summary.dropped,
                    "stream client disconnected"
                ),
                CloseCause::Error => warn!(
                    session = %summary.id,
                    transport,
                    "stream failed during setup"
                ),
            }
        });

        rx
    }
}
