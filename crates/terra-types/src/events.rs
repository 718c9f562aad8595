//! Push events for the live metric stream.
//!
//! A stream emits exactly one [`StreamEvent::Connected`], then any number of
//! [`StreamEvent::Metric`] and [`StreamEvent::Error`] events, then at most one
//! [`StreamEvent::Close`]. Each event is serialized as a single JSON object
//! with a `type` discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::sample::MetricSample;
use crate::time::iso_millis;

/// One message on a live stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StreamEvent {
    /// First event of every stream, carrying the server's current time.
    Connected {
        /// Server time at connection acceptance.
        #[serde(with = "iso_millis")]
        #[ts(type = "string")]
        timestamp: DateTime<Utc>,
    },
    /// A freshly synthesized sample; the sample's fields sit beside `type`.
    Metric(MetricSample),
    /// A tick failed to synthesize. The stream stays open.
    Error {
        /// Human-readable failure description.
        message: String,
    },
    /// Final event before the server ends the stream.
    Close {
        /// Why the server closed the stream.
        reason: CloseReason,
    },
}

impl StreamEvent {
    /// Wire name of the event's `type` field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Metric(_) => "metric",
            Self::Error { .. } => "error",
            Self::Close { .. } => "close",
        }
    }
}

/// Server-initiated close reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CloseReason {
    /// The connection reached its hard lifetime cap.
    IdleTimeout,
}
