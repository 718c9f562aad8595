//! Millisecond-precision ISO-8601 timestamps.
//!
//! Every instant the service emits is rendered as `YYYY-MM-DDTHH:MM:SS.sssZ`.
//! The rendered string is also the input to the value engine, so the
//! instant must be truncated to milliseconds before it is stored; otherwise
//! a record would carry sub-millisecond data that never reached the hash.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};

/// Render an instant as ISO-8601 UTC with exactly three fractional digits.
pub fn format_millis(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drop everything below the millisecond.
pub fn truncate_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    let millis = instant.nanosecond() / 1_000_000;
    instant
        .with_nanosecond(millis.saturating_mul(1_000_000))
        .unwrap_or(instant)
}

/// Floor an instant to the start of its minute (seconds and sub-seconds zeroed).
///
/// Works across the whole calendar range, unlike nanosecond-based rounding.
pub fn floor_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}

/// Serde adapter that writes [`format_millis`] and reads any RFC 3339 string.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an instant with millisecond precision.
    pub fn serialize<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_millis(instant))
    }

    /// Deserialize an RFC 3339 instant into UTC.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
