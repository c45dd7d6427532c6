//! Error handling for gungeon-telemetry
//!
//! This module defines the crate error type and a Result alias. Only the
//! setup and I/O edges return these errors: attribute lookups on the sampling
//! path report misses as `None` and never construct a [`TelemetryError`].

use thiserror::Error;

/// Main error type for telemetry operations
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// IO errors (log files, sockets)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP push errors (transport failure or non-success status)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse errors
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML write errors
    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Delivery pipeline state errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Streaming server errors
    #[error("Stream error: {0}")]
    Stream(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TelemetryError>,
    },
}

impl TelemetryError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TelemetryError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        TelemetryError::Http(err.to_string())
    }
}

/// Result type alias for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<TelemetryError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
