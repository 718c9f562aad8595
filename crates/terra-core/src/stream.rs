//! Live stream lifecycle.
//!
//! One [`StreamSession`] drives one client connection. It is a single
//! async task that owns both of its timers:
//!
//! - a periodic ticker, first firing one interval after the connection opens;
//! - a hard lifetime deadline, measured from connection start regardless of
//!   tick activity.
//!
//! The session writes [`StreamEvent`]s into a bounded channel whose receiver
//! belongs to the transport (SSE body, `WebSocket` pump). Dropping that
//! receiver is how the transport signals client cancellation. Writes never
//! wait for channel space: a tick that finds the buffer full is dropped, so a
//! client that stops reading still hits the deadline. Every return path drops
//! both timers, so nothing fires after the session ends.
//!
//! ```text
//! Opening --connected--> Streaming --deadline--> Closed(Idle)         [close event]
//!    |                       |------receiver dropped--> Closed(ClientCancel)
//!    '--bad settings-----------------------------------> Closed(Error)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use terra_types::time::truncate_millis;
use terra_types::{CloseReason, StreamEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::StreamConfig;
use crate::synth::SampleSource;

/// Message carried by the inline `error` event when a tick fails.
pub const TICK_ERROR_MESSAGE: &str = "Failed to generate metric";

/// Timing for one stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Period between metric events.
    pub tick_interval: Duration,
    /// Hard cap on the connection's lifetime.
    pub idle_timeout: Duration,
    /// Events buffered between the session and its transport.
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for StreamSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            channel_capacity: config.channel_capacity,
        }
    }
}

impl StreamSettings {
    /// Open the event channel a transport should hand to [`StreamSession::run`].
    pub fn channel(&self) -> (mpsc::Sender<StreamEvent>, mpsc::Receiver<StreamEvent>) {
        mpsc::channel(self.channel_capacity.max(1))
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Accepted, `connected` not yet delivered.
    Opening,
    /// Ticking.
    Streaming,
    /// Terminal; timers released.
    Closed(CloseCause),
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// The lifetime deadline elapsed; a `close` event was sent.
    Idle,
    /// The transport dropped its receiver; nothing further was sent.
    ClientCancel,
    /// The session could not be set up; no events were sent.
    Error,
}

/// Outcome of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Session id, as logged.
    pub id: Uuid,
    /// Terminal cause.
    pub cause: CloseCause,
    /// `metric` events produced.
    pub metrics: u64,
    /// `error` events produced.
    pub errors: u64,
    /// Ticks discarded because the transport was not keeping up.
    pub dropped: u64,
}

/// A single client's live stream.
pub struct StreamSession<S: ?Sized> {
    id: Uuid,
    source: Arc<S>,
    settings: StreamSettings,
    state: StreamState,
    metrics: u64,
    errors: u64,
    dropped: u64,
}

impl<S: SampleSource + ?Sized> StreamSession<S> {
    /// Create a session in the `Opening` state.
    pub fn new(source: Arc<S>, settings: StreamSettings) -> Self {
        Self {
            id: Uuid::now_v7(),
            source,
            settings,
            state: StreamState::Opening,
            metrics: 0,
            errors: 0,
            dropped: 0,
        }
    }

    /// Session id used in logs.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// Drive the session to completion, writing events into `tx`.
    ///
    /// Returns once the session reaches a terminal state. Events are sent
    /// strictly in order from this one task, so no two ticks ever overlap.
    pub async fn run(mut self, tx: mpsc::Sender<StreamEvent>) -> SessionSummary {
        let cause = self.drive(&tx).await;
        self.transition(StreamState::Closed(cause));
        SessionSummary {
            id: self.id,
            cause,
            metrics: self.metrics,
            errors: self.errors,
            dropped: self.dropped,
        }
    }

    async fn drive(&mut self, tx: &mpsc::Sender<StreamEvent>) -> CloseCause {
        let tick = self.settings.tick_interval;
        let lifetime = self.settings.idle_timeout;
        if tick.is_zero() || lifetime.is_zero() {
            warn!(session = %self.id, ?tick, ?lifetime, "refusing stream with zero timing");
            return CloseCause::Error;
        }

        let opened_at = Instant::now();
        let (Some(first_tick), Some(deadline_at)) =
            (opened_at.checked_add(tick), opened_at.checked_add(lifetime))
        else {
            warn!(session = %self.id, ?tick, ?lifetime, "stream timing overflows the clock");
            return CloseCause::Error;
        };

        let connected = StreamEvent::Connected {
            timestamp: truncate_millis(Utc::now()),
        };
        // Fresh channel, so only a dropped receiver can refuse this.
        if tx.try_send(connected).is_err() {
            return CloseCause::ClientCancel;
        }
        self.transition(StreamState::Streaming);

        let mut ticker = time::interval_at(first_tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = time::sleep_until(deadline_at);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                // Deadline beats a tick due at the same instant, so `close`
                // is always last.
                biased;

                () = tx.closed() => return CloseCause::ClientCancel,

                () = &mut deadline => {
                    let close = StreamEvent::Close { reason: CloseReason::IdleTimeout };
                    match tx.try_send(close) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!(session = %self.id, "transport backlogged, closing without close event");
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!(session = %self.id, "client gone before close event");
                        }
                    }
                    return CloseCause::Idle;
                }

                _ = ticker.tick() => {
                    let event = self.next_event();
                    match tx.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            self.dropped = self.dropped.saturating_add(1);
                            debug!(session = %self.id, dropped = self.dropped, "transport backlogged, tick dropped");
                        }
                        Err(TrySendError::Closed(_)) => return CloseCause::ClientCancel,
                    }
                }
            }
        }
    }

    fn next_event(&mut self) -> StreamEvent {
        match self.source.next_sample() {
            Ok(sample) => {
                self.metrics = self.metrics.saturating_add(1);
                StreamEvent::Metric(sample)
            }
            Err(e) => {
                self.errors = self.errors.saturating_add(1);
                warn!(session = %self.id, error = %e, "sample synthesis failed, emitting error event");
                StreamEvent::Error {
                    message: TICK_ERROR_MESSAGE.to_owned(),
                }
            }
        }
    }

    fn transition(&mut self, next: StreamState) {
        debug!(session = %self.id, from = ?self.state, to = ?next, "stream state change");
        self.state = next;
    }
}
