//! Synthesized readings: the live [`MetricSample`] and the minute-bucketed
//! [`HistoricalRecord`].
//!
//! Both are value objects. They are built fresh for every request or stream
//! tick and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::time::{format_millis, iso_millis};

// ---------------------------------------------------------------------------
// MetricSample
// ---------------------------------------------------------------------------

/// A current-instant reading for the simulated device.
///
/// `power_kW` is derived from `energy_kWh` (roughly `0.85 x energy` with its
/// own noise), never drawn independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricSample {
    /// Generation instant, millisecond precision.
    #[serde(with = "iso_millis")]
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    /// Identifier of the simulated device.
    pub device_id: String,
    /// Energy consumption in kWh, three fractional digits.
    #[serde(rename = "energy_kWh")]
    pub energy_kwh: f64,
    /// Heat generation in kWh, three fractional digits.
    #[serde(rename = "heat_kWh")]
    pub heat_kwh: f64,
    /// Electrical power in kW, three fractional digits.
    #[serde(rename = "power_kW", alias = "Pel_kW")]
    pub power_kw: f64,
}

// ---------------------------------------------------------------------------
// HistoricalRecord
// ---------------------------------------------------------------------------

/// A reading for one past minute bucket, carrying a content fingerprint.
///
/// Every field is a function of the bucket instant alone, so two records
/// built for the same minute are identical, `proof_id` included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistoricalRecord {
    /// Start of the minute bucket (seconds and sub-seconds are zero).
    #[serde(with = "iso_millis")]
    #[ts(type = "string")]
    pub ts: DateTime<Utc>,
    /// Identifier of the simulated device.
    pub device: String,
    /// Energy consumption in kWh, three fractional digits.
    #[serde(rename = "energy_kWh")]
    pub energy_kwh: f64,
    /// Heat generation in kWh, three fractional digits.
    #[serde(rename = "heat_kWh")]
    pub heat_kwh: f64,
    /// Lowercase hex SHA-256 of [`HistoricalRecord::canonical_payload`].
    pub proof_id: String,
}

impl HistoricalRecord {
    /// The string that `proof_id` fingerprints.
    ///
    /// Format: `{ts}|device:{device}|{energy_kWh}|{heat_kWh}`, numbers in
    /// shortest round-trip decimal form.
    pub fn canonical_payload(&self) -> String {
        canonical_payload(&self.ts, &self.device, self.energy_kwh, self.heat_kwh)
    }
}

/// Build the proof payload for a record that does not exist yet.
pub fn canonical_payload(
    ts: &DateTime<Utc>,
    device: &str,
    energy_kwh: f64,
    heat_kwh: f64,
) -> String {
    format!(
        "{}|device:{device}|{energy_kwh}|{heat_kwh}",
        format_millis(ts)
    )
}
