//! Per-component settings sections
//!
//! Each section of [`TelemetryConfig`](super::TelemetryConfig) is a plain
//! serde struct with its own defaults, so a partial TOML file only needs to
//! mention the values it overrides.
//!
//! # Main Types
//!
//! - [`SamplingSettings`] - Tick accumulator interval
//! - [`DeliverySettings`] - Durable log, HTTP push and worker timing
//! - [`StreamSettings`] - Loopback streaming server
//! - [`LoggingSettings`] - Diagnostic log filter and file output

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default sampling interval in milliseconds (5 Hz)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 200;

/// Default capacity of the delivery queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 2048;

/// Default timeout for one HTTP push in milliseconds
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 500;

/// Default streaming server port (loopback only)
pub const DEFAULT_STREAM_PORT: u16 = 18475;

/// Streaming protocol schema version
pub const STREAM_SCHEMA_VERSION: u32 = 1;

/// Game identifier sent in the stream handshake
pub const DEFAULT_GAME_NAME: &str = "Enter the Gungeon";

/// Default diagnostic log filter
pub const DEFAULT_LOG_LEVEL: &str = "info,gungeon_telemetry=debug";

// ==================== Sampling ====================

/// Sampling rate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Minimum accumulated tick time between two samples
    pub interval_ms: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
        }
    }
}

impl SamplingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ==================== Delivery ====================

/// Durable log and HTTP push pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Whether the file/HTTP pipeline runs at all
    pub enabled: bool,

    /// Directory the `events_*.jsonl` file is created in
    ///
    /// `None` resolves to `<data_dir>/gungeon-telemetry/out`.
    pub log_dir: Option<PathBuf>,

    /// Optional best-effort HTTP push target
    pub http_endpoint: Option<String>,

    /// Maximum number of pending records
    pub queue_capacity: usize,

    /// Timeout for one HTTP push
    pub http_timeout_ms: u64,

    /// Worker sleep when the queue is empty
    pub idle_poll_ms: u64,

    /// Bounded wait for the worker to exit on stop
    pub stop_grace_ms: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: None,
            http_endpoint: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            idle_poll_ms: 10,
            stop_grace_ms: 500,
        }
    }
}

impl DeliverySettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Configured log directory, or the default under the app data dir
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(super::default_log_dir)
    }
}

// ==================== Stream ====================

/// Streaming server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub enabled: bool,

    /// Loopback port; 0 binds an ephemeral port
    pub port: u16,

    /// Schema version announced in the handshake
    pub schema_version: u32,

    /// Game identifier announced in the handshake
    pub game: String,

    /// Maximum number of unsent lines
    pub queue_capacity: usize,

    /// Socket write timeout; a timed out write drops the client
    pub write_timeout_ms: u64,

    /// Bounded wait for the server thread to exit on shutdown
    pub stop_grace_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_STREAM_PORT,
            schema_version: STREAM_SCHEMA_VERSION,
            game: DEFAULT_GAME_NAME.to_string(),
            queue_capacity: 256,
            write_timeout_ms: 500,
            stop_grace_ms: 1000,
        }
    }
}

impl StreamSettings {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

// ==================== Logging ====================

/// Diagnostic logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub level: String,

    /// Also write a daily rolling log file into the log directory
    pub file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: false,
        }
    }
}
