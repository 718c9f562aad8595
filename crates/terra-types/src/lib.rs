//! Shared wire types for the Terra Nature telemetry service.
//!
//! This crate is the single source of truth for every value that crosses
//! the service boundary. Types flow downstream to `TypeScript` via `ts-rs`
//! for the dashboard, which only ever consumes them.
//!
//! # Modules
//!
//! - [`sample`] -- Live [`MetricSample`] and minute-bucketed [`HistoricalRecord`]
//! - [`events`] -- Push events delivered over a live stream
//! - [`export`] -- Export document formats
//! - [`time`] -- Millisecond ISO-8601 rendering shared by every timestamp

pub mod events;
pub mod export;
pub mod sample;
pub mod time;

// Re-export all public types at crate root for convenience.
pub use events::{CloseReason, StreamEvent};
pub use export::{ExportFormat, FormatError};
pub use sample::{HistoricalRecord, MetricSample};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the dashboard.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::sample::MetricSample::export_all();
        let _ = crate::sample::HistoricalRecord::export_all();
        let _ = crate::events::StreamEvent::export_all();
        let _ = crate::events::CloseReason::export_all();
        let _ = crate::export::ExportFormat::export_all();
    }
}
