//! Sample synthesizer.
//!
//! Turns an instant into a [`MetricSample`] or, for a past minute bucket,
//! into a [`HistoricalRecord`] with a proof fingerprint. Both paths are
//! pure over the instant and the injected [`DeviceProfile`].
//!
//! The synthesizer performs no bounds checking on `minutes_ago`: callers
//! (the export service) clamp it first.

use chrono::{DateTime, TimeDelta, Utc};
use terra_types::sample::canonical_payload;
use terra_types::time::{floor_minute, format_millis, truncate_millis};
use terra_types::{HistoricalRecord, MetricSample};

use crate::config::DeviceConfig;
use crate::error::SynthesisError;
use crate::noise::{NoiseBand, NoiseLabels, fingerprint};

/// Ratio of electrical power to energy before noise.
pub const POWER_FACTOR: f64 = 0.85;

/// Immutable identity and baselines of the simulated device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    /// Identifier stamped on every sample and record.
    pub device_id: String,
    /// Energy baseline in kWh.
    pub base_energy_kwh: f64,
    /// Heat baseline in kWh.
    pub base_heat_kwh: f64,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::from(&DeviceConfig::default())
    }
}

impl From<&DeviceConfig> for DeviceProfile {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            device_id: config.id.clone(),
            base_energy_kwh: config.base_energy_kwh,
            base_heat_kwh: config.base_heat_kwh,
        }
    }
}

/// Round to three fractional digits, halves away from zero.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Something that can produce a fresh live sample on demand.
///
/// The live stream pulls from this on every tick; a failure becomes an
/// inline `error` event rather than ending the stream.
pub trait SampleSource: Send + Sync {
    /// Produce a sample for the current instant.
    fn next_sample(&self) -> Result<MetricSample, SynthesisError>;
}

/// Builds samples and records for one device.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    profile: DeviceProfile,
}

impl Synthesizer {
    /// Create a synthesizer for `profile`.
    pub const fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    /// The injected device profile.
    pub const fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Synthesize a sample for the current instant.
    pub fn current_sample(&self) -> Result<MetricSample, SynthesisError> {
        self.sample_at(Utc::now())
    }

    /// Synthesize a sample for `now` (truncated to milliseconds).
    pub fn sample_at(&self, now: DateTime<Utc>) -> Result<MetricSample, SynthesisError> {
        let timestamp = truncate_millis(now);
        let key = format_millis(&timestamp);
        let labels = NoiseLabels::LIVE;

        let energy_noise = NoiseBand::ENERGY.draw(&key, labels.energy);
        let heat_noise = NoiseBand::HEAT.draw(&key, labels.heat);
        let power_noise = labels
            .power
            .map_or(0.0, |label| NoiseBand::POWER.draw(&key, label));

        let energy = self.profile.base_energy_kwh * (1.0 + energy_noise);
        let heat = self.profile.base_heat_kwh * (1.0 + heat_noise);
        // Derived from the unrounded energy.
        let power = (energy * POWER_FACTOR) * (1.0 + power_noise);

        Ok(MetricSample {
            timestamp,
            device_id: self.profile.device_id.clone(),
            energy_kwh: checked("energy_kWh", round3(energy))?,
            heat_kwh: checked("heat_kWh", round3(heat))?,
            power_kw: checked("power_kW", round3(power))?,
        })
    }

    /// Synthesize the record for the minute bucket `minutes_ago` before now.
    pub fn historical_record(&self, minutes_ago: i64) -> Result<HistoricalRecord, SynthesisError> {
        self.record_at(Utc::now(), minutes_ago)
    }

    /// Synthesize the record for the minute bucket `minutes_ago` before `now`.
    ///
    /// Negative offsets reach into the future. Offsets beyond the
    /// representable calendar saturate at its ends.
    pub fn record_at(
        &self,
        now: DateTime<Utc>,
        minutes_ago: i64,
    ) -> Result<HistoricalRecord, SynthesisError> {
        let shifted = TimeDelta::try_minutes(minutes_ago)
            .and_then(|delta| now.checked_sub_signed(delta))
            .unwrap_or(if minutes_ago > 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });
        let ts = floor_minute(shifted);
        let key = format_millis(&ts);
        let labels = NoiseLabels::HISTORICAL;

        let energy = self.profile.base_energy_kwh
            * (1.0 + NoiseBand::ENERGY.draw(&key, labels.energy));
        let heat =
            self.profile.base_heat_kwh * (1.0 + NoiseBand::HEAT.draw(&key, labels.heat));

        let energy_kwh = checked("energy_kWh", round3(energy))?;
        let heat_kwh = checked("heat_kWh", round3(heat))?;
        let proof_id = fingerprint(&canonical_payload(
            &ts,
            &self.profile.device_id,
            energy_kwh,
            heat_kwh,
        ));

        Ok(HistoricalRecord {
            ts,
            device: self.profile.device_id.clone(),
            energy_kwh,
            heat_kwh,
            proof_id,
        })
    }
}

impl SampleSource for Synthesizer {
    fn next_sample(&self) -> Result<MetricSample, SynthesisError> {
        self.current_sample()
    }
}

/// Recompute a record's fingerprint from its own fields and compare.
///
/// Detects tampering or regeneration drift; it is not an authenticity proof.
pub fn verify_proof(record: &HistoricalRecord) -> bool {
    fingerprint(&record.canonical_payload()) == record.proof_id
}

fn checked(field: &'static str, value: f64) -> Result<f64, SynthesisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SynthesisError::OutOfRange { field, value })
    }
}
