//! Export document formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The two recognized export encodings. There is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ExportFormat {
    /// Comma-separated values with a header line.
    Csv,
    /// Newline-delimited JSON, one record per line.
    Jsonl,
}

impl ExportFormat {
    /// Request token and file extension.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        }
    }

    /// Media type of a document in this format.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Jsonl => "application/jsonl",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The format token was not exactly `csv` or `jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid format. Must be \"csv\" or \"jsonl\"")]
pub struct FormatError {
    /// The rejected token.
    pub token: String,
}

impl FromStr for ExportFormat {
    type Err = FormatError;

    /// Tokens are matched exactly; `CSV` or ` csv` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "jsonl" => Ok(Self::Jsonl),
            other => Err(FormatError {
                token: other.to_owned(),
            }),
        }
    }
}
