//! Terra Nature telemetry service binary.
//!
//! Wires configuration, logging, and the HTTP server together, then serves
//! until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `terra-config.yaml` (or `TERRA_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the synthesizer and stream settings from config
//! 4. Serve the API until shutdown is requested

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use terra_core::TelemetryConfig;
use terra_core::config::{LogFormat, LoggingConfig};
use terra_observer::{AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "terra-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot
/// bind or fails while serving.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config is loaded before logging so `logging.level` can apply.
    let (config, config_path) = load_config()?;
    init_logging(&config.logging);

    info!("terra-server starting");
    match config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        device_id = config.device.id,
        base_energy_kwh = config.device.base_energy_kwh,
        base_heat_kwh = config.device.base_heat_kwh,
        tick_interval_ms = config.stream.tick_interval_ms,
        idle_timeout_secs = config.stream.idle_timeout_secs,
        "Device profile and stream timing"
    );

    let state = Arc::new(AppState::from_config(&config));
    let server_config = ServerConfig::from(&config.server);

    terra_observer::start_server(&server_config, state, shutdown_signal())
        .await
        .map_err(AppError::from)?;

    info!("terra-server stopped");
    Ok(())
}

/// Read the config file if present, otherwise defaults plus env overrides.
fn load_config() -> Result<(TelemetryConfig, Option<PathBuf>), AppError> {
    let path = std::env::var_os("TERRA_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = TelemetryConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = TelemetryConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, None))
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Resolve on `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
