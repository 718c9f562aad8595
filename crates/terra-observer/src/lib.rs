//! Telemetry API server for the Terra Nature synthetic device.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Snapshot** (`GET /api/metrics`) -- one fresh `MetricSample`
//! - **Live stream** over Server-Sent Events (`GET /api/stream`) and
//!   `WebSocket` (`GET /ws/stream`), one JSON event per message
//! - **Export** (`GET /api/export`) -- CSV or JSONL history with proof ids
//! - **Health** (`GET /healthz`)
//!
//! # Architecture
//!
//! Snapshot and export are stateless and compute directly from the
//! request instant. Each stream connection gets its own
//! [`StreamSession`](terra_core::StreamSession) task feeding a bounded
//! channel; the transport owns the receiving end, and dropping it on
//! disconnect is what cancels the session's timers.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod sse;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
