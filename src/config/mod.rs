//! Configuration module for gungeon-telemetry
//!
//! This module handles the tracker's configuration:
//! - Loading and saving [`TelemetryConfig`] as TOML
//! - Defaults for every section, so a missing file or section is valid
//! - The platform data directory used for the default log location
//!
//! # Data Location
//!
//! When no log directory is configured, records are written under the
//! platform-appropriate data directory:
//! - **Linux**: `~/.local/share/gungeon-telemetry/out/`
//! - **macOS**: `~/Library/Application Support/gungeon-telemetry/out/`
//! - **Windows**: `%APPDATA%\gungeon-telemetry\out\`
//!
//! # Example
//!
//! ```ignore
//! use gungeon_telemetry::config::TelemetryConfig;
//!
//! let mut config = TelemetryConfig::load_or_default("telemetry.toml");
//! config.stream.enabled = true;
//! config.save("telemetry.toml")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "gungeon-telemetry";

/// Subdirectory of the app data dir holding record files
pub const OUTPUT_DIR: &str = "out";

/// Default run length of the headless runner in seconds
pub const DEFAULT_DEMO_SECONDS: u64 = 10;

// ==================== Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Default directory for record files
pub fn default_log_dir() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(OUTPUT_DIR))
}

/// Create `dir` if it does not exist
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            TelemetryError::Config(format!("Failed to create directory {:?}: {}", dir, e))
        })?;
    }
    Ok(())
}

/// File name for one pipeline instance's record log
///
/// `events_<UTC yyyyMMdd_HHmmss>.jsonl`
pub fn event_log_file_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("events_{}.jsonl", now.format("%Y%m%d_%H%M%S"))
}

// ==================== Telemetry Config ====================

/// Complete tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// How long the headless runner drives its synthetic scene
    pub demo_seconds: u64,

    pub sampling: SamplingSettings,
    pub delivery: DeliverySettings,
    pub stream: StreamSettings,
    pub logging: LoggingSettings,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            demo_seconds: DEFAULT_DEMO_SECONDS,
            sampling: SamplingSettings::default(),
            delivery: DeliverySettings::default(),
            stream: StreamSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl TelemetryConfig {
    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            TelemetryError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values that would stall or disable a component silently
    pub fn validate(&self) -> Result<()> {
        if self.sampling.interval_ms == 0 {
            return Err(TelemetryError::Config(
                "sampling.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.delivery.queue_capacity == 0 {
            return Err(TelemetryError::Config(
                "delivery.queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.delivery.idle_poll_ms == 0 {
            return Err(TelemetryError::Config(
                "delivery.idle_poll_ms must be greater than zero".to_string(),
            ));
        }
        if self.stream.queue_capacity == 0 {
            return Err(TelemetryError::Config(
                "stream.queue_capacity must be greater than zero".to_string(),
            ));
        }
        if let Some(endpoint) = &self.delivery.http_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(TelemetryError::Config(format!(
                    "delivery.http_endpoint must be an http(s) URL, got {:?}",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

// ==================== Tests ====================
