//! Hash-seeded value engine.
//!
//! Replaces a stateful RNG with a pure function: the same `(timestamp,
//! label)` pair always stretches to the same value, in every process.
//! Different labels over one timestamp decorrelate the energy, heat, and
//! power noise.

use sha2::{Digest, Sha256};

/// Labels used to draw the noise for one kind of reading.
///
/// Live samples and historical records draw from disjoint label sets, so
/// the two series are independent even at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseLabels {
    /// Label for the energy draw.
    pub energy: &'static str,
    /// Label for the heat draw.
    pub heat: &'static str,
    /// Label for the power draw; historical records carry no power.
    pub power: Option<&'static str>,
}

impl NoiseLabels {
    /// Labels for [`terra_types::MetricSample`].
    pub const LIVE: Self = Self {
        energy: "energy",
        heat: "heat",
        power: Some("power"),
    };

    /// Labels for [`terra_types::HistoricalRecord`].
    pub const HISTORICAL: Self = Self {
        energy: "energy_jsonl",
        heat: "heat_jsonl",
        power: None,
    };

    /// Every label in this set.
    pub fn all(self) -> impl Iterator<Item = &'static str> {
        [Some(self.energy), Some(self.heat), self.power]
            .into_iter()
            .flatten()
    }
}

/// Symmetric relative noise band of `±half_width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBand {
    half_width: f64,
}

impl NoiseBand {
    /// ±10%.
    pub const ENERGY: Self = Self { half_width: 0.1 };
    /// ±7.5%.
    pub const HEAT: Self = Self { half_width: 0.075 };
    /// ±15%.
    pub const POWER: Self = Self { half_width: 0.15 };

    /// Map a unit value onto the band.
    ///
    /// Computed as `v * width - half` with two roundings; a fused
    /// multiply-add would shift the published series in the last bit.
    #[allow(clippy::suboptimal_flops)]
    pub fn apply(self, unit: f64) -> f64 {
        unit * (self.half_width * 2.0) - self.half_width
    }

    /// Draw the relative noise for `label` at `timestamp`.
    pub fn draw(self, timestamp: &str, label: &str) -> f64 {
        self.apply(stretch(timestamp, label))
    }
}

/// Stretch a timestamp and label into a reproducible value in `[0, 1]`.
///
/// SHA-256 over `timestamp ++ label`, first 32 bits of the digest read
/// big-endian, divided by `2^32 - 1`.
pub fn stretch(timestamp: &str, label: &str) -> f64 {
    let digest = Sha256::new()
        .chain_update(timestamp.as_bytes())
        .chain_update(label.as_bytes())
        .finalize();
    let prefix = digest
        .as_slice()
        .first_chunk::<4>()
        .map_or(0, |bytes| u32::from_be_bytes(*bytes));
    f64::from(prefix) / f64::from(u32::MAX)
}

/// Lowercase hex SHA-256 of `payload` (64 characters).
pub fn fingerprint(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2025-03-14T09:26:53.589Z";

    #[test]
    fn stretch_is_pinned_for_known_inputs() {
        assert_eq!(stretch(TS, "energy").to_bits(), 0.155_507_724_302_706_24_f64.to_bits());
        assert_eq!(stretch(TS, "heat").to_bits(), 0.680_572_871_510_072_8_f64.to_bits());
        assert_eq!(stretch(TS, "power").to_bits(), 0.810_436_482_962_788_1_f64.to_bits());
    }

    #[test]
    fn stretch_is_deterministic() {
        let first = stretch(TS, "heat_jsonl");
        for _ in 0..10 {
            assert_eq!(stretch(TS, "heat_jsonl").to_bits(), first.to_bits());
        }
    }

    #[test]
    fn labels_decorrelate_one_timestamp() {
        let energy = stretch(TS, "energy");
        let energy_hist = stretch(TS, "energy_jsonl");
        assert_ne!(energy.to_bits(), energy_hist.to_bits());
    }

    #[test]
    fn stretch_stays_in_unit_interval() {
        for minute in 0..200 {
            let ts = format!("2025-03-14T{:02}:{:02}:00.000Z", minute / 60, minute % 60);
            for label in NoiseLabels::LIVE.all().chain(NoiseLabels::HISTORICAL.all()) {
                let v = stretch(&ts, label);
                assert!((0.0..=1.0).contains(&v), "{ts}/{label} -> {v}");
            }
        }
    }

    #[test]
    fn live_and_historical_label_sets_are_disjoint() {
        for live in NoiseLabels::LIVE.all() {
            assert!(NoiseLabels::HISTORICAL.all().all(|hist| hist != live));
        }
        assert_eq!(NoiseLabels::LIVE.all().count(), 3);
        assert_eq!(NoiseLabels::HISTORICAL.all().count(), 2);
    }

    #[test]
    fn band_edges() {
        assert!((NoiseBand::ENERGY.apply(0.0) + 0.1).abs() < 1e-12);
        assert!((NoiseBand::ENERGY.apply(1.0) - 0.1).abs() < 1e-12);
        assert!(NoiseBand::HEAT.apply(0.5).abs() < 1e-12);
        assert!((NoiseBand::POWER.apply(1.0) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn fingerprint_is_lowercase_sha256_hex() {
        assert_eq!(
            fingerprint("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
