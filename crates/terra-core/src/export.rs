//! Bulk historical export.
//!
//! An export is one [`HistoricalRecord`] per minute for the requested
//! window, sorted oldest first, serialized into a single in-memory buffer.
//! Generation is all-or-nothing: any failure discards the whole document.

use chrono::{DateTime, Utc};
use terra_types::time::format_millis;
use terra_types::{ExportFormat, HistoricalRecord};
use tracing::debug;

use crate::error::{ExportError, SynthesisError};
use crate::synth::Synthesizer;

/// Window used when the request does not name one.
pub const DEFAULT_MINUTES: u32 = 30;

/// Smallest window; invalid or too-small requests clamp here.
pub const MIN_MINUTES: u32 = 1;

/// Hard cap: 24 hours of minute-resolution data.
pub const MAX_MINUTES: u32 = 1440;

/// CSV header, in column order.
pub const CSV_HEADER: [&str; 5] = ["timestamp", "device", "energy_kWh", "heat_kWh", "proof_id"];

/// A finished export, ready for the transport to frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    /// Encoding of `body`.
    pub format: ExportFormat,
    /// Window size after clamping; one record per minute.
    pub minutes: u32,
    /// The full document, trailing newline included.
    pub body: String,
}

impl ExportDocument {
    /// Media type for `Content-Type`.
    pub const fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Suggested attachment name, encoding the window size.
    pub fn filename(&self) -> String {
        format!("terra-nature-metrics-{}min.{}", self.minutes, self.format)
    }
}

/// Resolve the raw `minutes` request value into `[1, 1440]`.
///
/// Absent or empty means [`DEFAULT_MINUTES`]. Otherwise the leading integer
/// is read (leading whitespace skipped, optional sign, then digits, so
/// `"12abc"` is 12). No digits, zero, or negative clamp to 1; anything
/// above 1440 clamps to 1440. Clamping is silent.
pub fn clamp_minutes(raw: Option<&str>) -> u32 {
    match raw {
        None | Some("") => DEFAULT_MINUTES,
        Some(text) => leading_integer(text).map_or(MIN_MINUTES, clamp_window),
    }
}

fn clamp_window(requested: i64) -> u32 {
    let bounded = requested.clamp(i64::from(MIN_MINUTES), i64::from(MAX_MINUTES));
    u32::try_from(bounded).unwrap_or(MIN_MINUTES)
}

/// Parse an optionally signed run of leading decimal digits, saturating.
fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, trimmed.get(1..).unwrap_or_default()),
        Some(b'+') => (false, trimmed.get(1..).unwrap_or_default()),
        _ => (false, trimmed),
    };

    let mut digits = rest.bytes().take_while(u8::is_ascii_digit).peekable();
    digits.peek()?;

    let magnitude = digits.fold(0_i64, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(i64::from(digit.saturating_sub(b'0')))
    });
    Some(if negative { magnitude.saturating_neg() } else { magnitude })
}

/// Build the records for the `minutes` buckets ending at `now`, oldest first.
pub fn collect_records(
    synth: &Synthesizer,
    now: DateTime<Utc>,
    minutes: u32,
) -> Result<Vec<HistoricalRecord>, SynthesisError> {
    let mut records = (0..minutes)
        .map(|offset| synth.record_at(now, i64::from(offset)))
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|a, b| a.ts.cmp(&b.ts));
    Ok(records)
}

/// Export the window ending now.
pub fn export(
    synth: &Synthesizer,
    format: ExportFormat,
    minutes: u32,
) -> Result<ExportDocument, ExportError> {
    export_at(synth, Utc::now(), format, minutes)
}

/// Export the window ending at `now`. `minutes` is clamped into `[1, 1440]`.
pub fn export_at(
    synth: &Synthesizer,
    now: DateTime<Utc>,
    format: ExportFormat,
    minutes: u32,
) -> Result<ExportDocument, ExportError> {
    let minutes = minutes.clamp(MIN_MINUTES, MAX_MINUTES);
    let records = collect_records(synth, now, minutes)?;

    let body = match format {
        ExportFormat::Csv => render_csv(&records)?,
        ExportFormat::Jsonl => render_jsonl(&records)?,
    };

    debug!(%format, minutes, bytes = body.len(), "export rendered");

    Ok(ExportDocument {
        format,
        minutes,
        body,
    })
}

/// Header line plus one unquoted line per record, `\n` terminated.
///
/// No field can contain a comma, so no quoting is needed.
pub fn render_csv(records: &[HistoricalRecord]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for record in records {
        let ts = format_millis(&record.ts);
        let energy = record.energy_kwh.to_string();
        let heat = record.heat_kwh.to_string();
        writer.write_record([
            ts.as_str(),
            record.device.as_str(),
            energy.as_str(),
            heat.as_str(),
            record.proof_id.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

/// One JSON object per line, `\n` terminated.
pub fn render_jsonl(records: &[HistoricalRecord]) -> Result<String, ExportError> {
    let mut body = String::new();
    for record in records {
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
            .single()
            .unwrap_or_default()
            + TimeDelta::milliseconds(589)
    }

    fn export_fixed(format: ExportFormat, minutes: u32) -> ExportDocument {
        match export_at(&Synthesizer::default(), fixed_now(), format, minutes) {
            Ok(doc) => doc,
            Err(e) => panic!("export failed: {e}"),
        }
    }

    #[test]
    fn clamp_defaults_and_bounds() {
        assert_eq!(clamp_minutes(None), 30);
        assert_eq!(clamp_minutes(Some("")), 30);
        assert_eq!(clamp_minutes(Some("0")), 1);
        assert_eq!(clamp_minutes(Some("-7")), 1);
        assert_eq!(clamp_minutes(Some("abc")), 1);
        assert_eq!(clamp_minutes(Some("5000")), 1440);
        assert_eq!(clamp_minutes(Some("1440")), 1440);
        assert_eq!(clamp_minutes(Some("1")), 1);
        assert_eq!(clamp_minutes(Some("45")), 45);
    }

    #[test]
    fn clamp_reads_leading_integer() {
        assert_eq!(clamp_minutes(Some("12abc")), 12);
        assert_eq!(clamp_minutes(Some("  7")), 7);
        assert_eq!(clamp_minutes(Some("+9")), 9);
        assert_eq!(clamp_minutes(Some("3.9")), 3);
        assert_eq!(clamp_minutes(Some("-")), 1);
        assert_eq!(clamp_minutes(Some("99999999999999999999999")), 1440);
        assert_eq!(clamp_minutes(Some("-99999999999999999999999")), 1);
    }

    #[test]
    fn csv_shape_for_three_minutes() {
        let doc = export_fixed(ExportFormat::Csv, 3);
        assert!(doc.body.ends_with('\n'));
        let lines: Vec<&str> = doc.body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines.first().copied(), Some("timestamp,device,energy_kWh,heat_kWh,proof_id"));
        assert_eq!(
            lines.get(1).copied(),
            Some("2025-03-14T09:24:00.000Z,asic-rack-01,11.788,7.679,8512717367e59d33a7c12e5ecb14120ca41603686dc4f887d6c0410a75edb975")
        );
        assert_eq!(
            lines.get(2).copied(),
            Some("2025-03-14T09:25:00.000Z,asic-rack-01,13.173,8.87,6dd27ce17c0cd98988ec5e680265b751d0599c0b69f9c7df280fb5c1a39e6ddf")
        );
        assert_eq!(
            lines.get(3).copied(),
            Some("2025-03-14T09:26:00.000Z,asic-rack-01,11.686,8.623,cc15c20510f6152555d7bff5f1b37d47befd59a5aa33532e8f1c906870a91e4c")
        );
        assert!(!doc.body.contains('"'));
        assert!(!doc.body.contains('\r'));
    }

    #[test]
    fn jsonl_shape_for_three_minutes() {
        let doc = export_fixed(ExportFormat::Jsonl, 3);
        assert!(doc.body.ends_with('\n'));
        let lines: Vec<&str> = doc.body.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap_or_default();
            let mut keys: Vec<&str> = value
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            keys.sort_unstable();
            assert_eq!(keys, ["device", "energy_kWh", "heat_kWh", "proof_id", "ts"]);
        }
    }

    #[test]
    fn whole_numbers_render_per_format() {
        let ts = fixed_now();
        let record = HistoricalRecord {
            ts,
            device: "asic-rack-01".to_owned(),
            energy_kwh: 13.0,
            heat_kwh: 8.87,
            proof_id: crate::noise::fingerprint(&terra_types::sample::canonical_payload(&ts, "asic-rack-01", 13.0, 8.87)),
        };
        let records = [record];

        let csv = render_csv(&records).unwrap_or_default();
        assert!(csv.contains(",asic-rack-01,13,8.87,"), "{csv}");
        assert!(records.iter().all(|r| r.canonical_payload().ends_with("|13|8.87")));

        // serde_json keeps the fractional part on whole floats.
        let jsonl = render_jsonl(&records).unwrap_or_default();
        assert!(jsonl.contains("\"energy_kWh\":13.0,"), "{jsonl}");
        assert!(jsonl.contains("\"heat_kWh\":8.87,"), "{jsonl}");
    }

    #[test]
    fn records_are_oldest_first() {
        let records = collect_records(&Synthesizer::default(), fixed_now(), 90).unwrap_or_default();
        assert_eq!(records.len(), 90);
        assert!(records.windows(2).all(|pair| match pair {
            [a, b] => a.ts < b.ts,
            _ => true,
        }));
    }

    #[test]
    fn export_clamps_out_of_range_windows() {
        assert_eq!(export_fixed(ExportFormat::Jsonl, 0).minutes, 1);
        assert_eq!(export_fixed(ExportFormat::Jsonl, 0).body.lines().count(), 1);
        let full = export_fixed(ExportFormat::Csv, 5000);
        assert_eq!(full.minutes, 1440);
        assert_eq!(full.body.lines().count(), 1441);
    }

    #[test]
    fn export_is_reproducible_within_a_minute() {
        let a = export_fixed(ExportFormat::Csv, 10);
        let b = export_at(
            &Synthesizer::default(),
            fixed_now() + TimeDelta::seconds(5),
            ExportFormat::Csv,
            10,
        )
        .ok();
        assert_eq!(Some(a), b);
    }

    #[test]
    fn filename_and_media_type() {
        let csv = export_fixed(ExportFormat::Csv, 15);
        assert_eq!(csv.filename(), "terra-nature-metrics-15min.csv");
        assert_eq!(csv.content_type(), "text/csv");
        let jsonl = export_fixed(ExportFormat::Jsonl, 2);
        assert_eq!(jsonl.filename(), "terra-nature-metrics-2min.jsonl");
        assert_eq!(jsonl.content_type(), "application/jsonl");
    }

    #[test]
    fn failed_synthesis_yields_no_document() {
        let synth = Synthesizer::new(crate::synth::DeviceProfile {
            base_heat_kwh: f64::INFINITY,
            ..crate::synth::DeviceProfile::default()
        });
        let result = export_at(&synth, fixed_now(), ExportFormat::Csv, 3);
        assert!(matches!(result, Err(ExportError::Synthesis(_))));
    }
}
