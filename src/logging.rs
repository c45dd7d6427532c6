//! Diagnostic logging setup
//!
//! Installs a `tracing` subscriber: an [`EnvFilter`] taken from `RUST_LOG`
//! (falling back to the configured directive), a console `fmt` layer, and an
//! optional daily rolling file layer written through a non-blocking worker.
//!
//! The returned [`WorkerGuard`] flushes the file writer when dropped, so its
//! owner decides how long file logging lives. Installing a subscriber when
//! one is already set is not an error; the existing one stays in place.

use crate::config::{LoggingSettings, DEFAULT_LOG_LEVEL};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rolling diagnostic log
pub const LOG_FILE_PREFIX: &str = "gungeon-telemetry.log";

/// Build the level filter, preferring `RUST_LOG`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(level).unwrap_or_else(|e| {
            eprintln!("Invalid log filter {:?} ({}), using {}", level, e, DEFAULT_LOG_LEVEL);
            EnvFilter::new(DEFAULT_LOG_LEVEL)
        })
    })
}

/// Install the global subscriber
///
/// Returns the file writer guard when file logging was requested, a log
/// directory was given and this call installed the subscriber.
pub fn init_logging(settings: &LoggingSettings, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let mut guard = None;
    let file_layer = match (settings.file, log_dir) {
        (true, Some(dir)) => match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .build(dir)
        {
            Ok(appender) => {
                let (writer, g) = tracing_appender::non_blocking(appender);
                guard = Some(g);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
            }
            Err(e) => {
                eprintln!("Failed to open diagnostic log in {:?}: {}", dir, e);
                None
            }
        },
        _ => None,
    };

    let installed = tracing_subscriber::registry()
        .with(build_filter(&settings.level))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => {
            tracing::debug!("Logging initialized");
            guard
        }
        Err(e) => {
            tracing::debug!("Keeping existing subscriber: {}", e);
            None
        }
    }
}
