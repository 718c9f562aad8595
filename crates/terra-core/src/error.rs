//! Error types for sample synthesis and export.

/// A sample or record could not be synthesized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    /// A computed quantity was NaN, infinite, or negative.
    #[error("synthesized {field} is out of range: {value}")]
    OutOfRange {
        /// Wire name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// An export document could not be produced. No partial output escapes.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A record in the requested window failed to synthesize.
    #[error("record synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// The CSV writer rejected a row.
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    /// A record could not be encoded as JSON.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The in-memory buffer could not be finalized.
    #[error("buffer error: {0}")]
    Buffer(String),
}
