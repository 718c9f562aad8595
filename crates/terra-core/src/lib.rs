//! Core pipeline of the Terra Nature synthetic telemetry service.
//!
//! Every value is computed on demand from a timestamp: there is no device,
//! no persistence, and no shared mutable state.
//!
//! # Modules
//!
//! - [`noise`] -- Hash-seeded value engine mapping `(timestamp, label)` to `[0, 1]`
//! - [`synth`] -- Builds live samples and minute-bucketed historical records
//! - [`export`] -- Bulk historical export as CSV or JSONL
//! - [`stream`] -- Per-connection live stream lifecycle (ticks, deadline, cancellation)
//! - [`config`] -- YAML configuration with environment overrides
//! - [`error`] -- Error types shared by the pipeline

pub mod config;
pub mod error;
pub mod export;
pub mod noise;
pub mod stream;
pub mod synth;

pub use config::TelemetryConfig;
pub use error::{ExportError, SynthesisError};
pub use export::ExportDocument;
pub use stream::{CloseCause, SessionSummary, StreamSession, StreamSettings, StreamState};
pub use synth::{DeviceProfile, SampleSource, Synthesizer};
