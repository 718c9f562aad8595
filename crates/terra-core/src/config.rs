//! Configuration loading and typed config structures for the telemetry service.
//!
//! The canonical configuration lives in `terra-config.yaml`. Every field
//! has a default, so an empty or missing file yields a working service
//! that streams at 1 Hz for 120 seconds per connection.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `terra-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelemetryConfig {
    /// Identity and baselines of the simulated device.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Live stream timing.
    #[serde(default)]
    pub stream: StreamConfig,

    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TelemetryConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `TERRA_HOST` overrides `server.host`
    /// - `TERRA_PORT` overrides `server.port`
    /// - `TERRA_DEVICE_ID` overrides `device.id`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or a value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the result fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TERRA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TERRA_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Invalid {
                reason: format!("TERRA_PORT={port}: {e}"),
            })?;
        }
        if let Some(device_id) = lookup("TERRA_DEVICE_ID") {
            self.device.id = device_id;
        }
        Ok(())
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };

        if self.device.id.trim().is_empty() {
            return invalid("device.id must not be empty");
        }
        if !(self.device.base_energy_kwh.is_finite() && self.device.base_energy_kwh > 0.0) {
            return invalid("device.base_energy_kwh must be a positive number");
        }
        if !(self.device.base_heat_kwh.is_finite() && self.device.base_heat_kwh > 0.0) {
            return invalid("device.base_heat_kwh must be a positive number");
        }
        if self.stream.tick_interval_ms == 0 {
            return invalid("stream.tick_interval_ms must be at least 1");
        }
        if self.stream.idle_timeout_secs == 0 {
            return invalid("stream.idle_timeout_secs must be at least 1");
        }
        if self.stream.channel_capacity == 0 {
            return invalid("stream.channel_capacity must be at least 1");
        }
        Ok(())
    }
}

/// Simulated device identity and baselines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceConfig {
    /// Fixed device identifier.
    #[serde(default = "default_device_id")]
    pub id: String,

    /// Energy baseline in kWh.
    #[serde(default = "default_base_energy_kwh")]
    pub base_energy_kwh: f64,

    /// Heat baseline in kWh.
    #[serde(default = "default_base_heat_kwh")]
    pub base_heat_kwh: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: default_device_id(),
            base_energy_kwh: default_base_energy_kwh(),
            base_heat_kwh: default_base_heat_kwh(),
        }
    }
}

/// Live stream timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    /// Milliseconds between metric events.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Hard cap on a connection's lifetime, in seconds.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Buffered events per connection before ticks wait on the transport.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// HTTP listener address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn default_device_id() -> String {
    String::from("asic-rack-01")
}

const fn default_base_energy_kwh() -> f64 {
    12.5
}

const fn default_base_heat_kwh() -> f64 {
    8.3
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_idle_timeout_secs() -> u64 {
    120
}

const fn default_channel_capacity() -> usize {
    16
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_without_env(yaml: &str) -> Result<TelemetryConfig, ConfigError> {
        let config: TelemetryConfig = if yaml.trim().is_empty() {
            TelemetryConfig::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn default_config_is_valid() {
        let config = TelemetryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device.id, "asic-rack-01");
        assert_eq!(config.stream.tick_interval_ms, 1000);
        assert_eq!(config.stream.idle_timeout_secs, 120);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_without_env("").ok();
        assert_eq!(config, Some(TelemetryConfig::default()));
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
device:
  id: "bench-07"
  base_energy_kwh: 20.0
  base_heat_kwh: 10.5

stream:
  tick_interval_ms: 250
  idle_timeout_secs: 30
  channel_capacity: 4

server:
  host: "127.0.0.1"
  port: 8088

logging:
  level: "debug"
  format: json
"#;
        let Ok(config) = parse_without_env(yaml) else {
            panic!("config should parse");
        };
        assert_eq!(config.device.id, "bench-07");
        assert_eq!(config.stream.tick_interval_ms, 250);
        assert_eq!(config.stream.channel_capacity, 4);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let Ok(config) = parse_without_env("stream:\n  idle_timeout_secs: 10\n") else {
            panic!("config should parse");
        };
        assert_eq!(config.stream.idle_timeout_secs, 10);
        assert_eq!(config.stream.tick_interval_ms, 1000);
        assert_eq!(config.device, DeviceConfig::default());
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let result = parse_without_env("stream:\n  tick_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_non_positive_baseline() {
        let result = parse_without_env("device:\n  base_heat_kwh: -1.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let result = parse_without_env("stream: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn overrides_replace_fields() {
        let mut config = TelemetryConfig::default();
        let result = config.apply_overrides(|key| match key {
            "TERRA_HOST" => Some(String::from("10.0.0.5")),
            "TERRA_PORT" => Some(String::from("9100")),
            "TERRA_DEVICE_ID" => Some(String::from("rack-02")),
            _ => None,
        });
        assert!(result.is_ok());
        assert_eq!(config.server.host, "10.0.0.5");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.device.id, "rack-02");
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = TelemetryConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "TERRA_PORT").then(|| String::from("eighty"))
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
