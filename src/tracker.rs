//! Host-facing tracker
//!
//! [`Tracker`] is the only type a host integration needs. It maps the host's
//! lifecycle hooks onto the capture and delivery components:
//!
//! | Host hook        | Tracker call            |
//! |------------------|-------------------------|
//! | plugin load      | [`Tracker::init`]       |
//! | per-frame update | [`Tracker::on_tick`]    |
//! | operator hotkey  | [`Tracker::mark`]       |
//! | quit / unload    | [`Tracker::shutdown`]   |
//!
//! `on_tick` and `mark` run on the host's frame loop. They never block and
//! never return an error: a failed or panicking sample skips that tick.
//!
//! # Example
//!
//! ```ignore
//! use gungeon_telemetry::{Tracker, TelemetryConfig};
//!
//! let mut tracker = Tracker::new(TelemetryConfig::default());
//! tracker.init()?;
//!
//! // every frame
//! tracker.on_tick(&game_root, frame_delta);
//!
//! tracker.shutdown();
//! ```

use crate::capture::{SampleClock, Sampler, Subject};
use crate::config::{ensure_dir, TelemetryConfig};
use crate::delivery::{DeliveryPipeline, DeliveryStats};
use crate::error::Result;
use crate::stream::{StreamServer, StreamStats};
use crate::types::{Marker, Record};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;

/// Lifecycle facade over sampling, delivery and streaming
pub struct Tracker {
    config: TelemetryConfig,
    clock: SampleClock,
    sampler: Sampler,
    started: Instant,
    pipeline: Option<DeliveryPipeline>,
    stream: Option<StreamServer>,
    log_guard: Option<WorkerGuard>,
    initialized: bool,
    shut_down: bool,
    skipped_ticks: u64,
}

impl Tracker {
    /// Create an uninitialized tracker; nothing runs until [`Self::init`]
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            clock: SampleClock::new(config.sampling.interval()),
            config,
            sampler: Sampler::new(),
            started: Instant::now(),
            pipeline: None,
            stream: None,
            log_guard: None,
            initialized: false,
            shut_down: false,
            skipped_ticks: 0,
        }
    }

    /// Use this pipeline instead of building one from the config
    pub fn with_pipeline(mut self, pipeline: DeliveryPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Validate the config, install logging and start the sinks
    ///
    /// Only an invalid configuration is an error. A sink that fails to
    /// start is logged and the tracker runs without it. Repeated calls are
    /// no-ops.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.config.validate()?;

        let log_dir = self.config.delivery.resolved_log_dir();
        let file_log_dir = if self.config.logging.file {
            log_dir.as_deref().filter(|dir| ensure_dir(dir).is_ok())
        } else {
            None
        };
        self.log_guard = crate::logging::init_logging(&self.config.logging, file_log_dir);

        tracing::info!(
            "Telemetry starting (interval {:?}, delivery {}, stream {})",
            self.config.sampling.interval(),
            self.config.delivery.enabled,
            self.config.stream.enabled
        );

        if self.pipeline.is_none() && self.config.delivery.enabled {
            match DeliveryPipeline::from_settings(&self.config.delivery) {
                Ok(pipeline) => self.pipeline = Some(pipeline),
                Err(e) => tracing::error!("Delivery pipeline unavailable: {}", e),
            }
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            if let Err(e) = pipeline.start() {
                tracing::error!("Failed to start delivery worker: {}", e);
                self.pipeline = None;
            }
        }

        if self.config.stream.enabled {
            match StreamServer::start(&self.config.stream) {
                Ok(server) => self.stream = Some(server),
                Err(e) => {
                    tracing::error!("Streaming disabled for this session: {}", e)
                }
            }
        }

        self.started = Instant::now();
        self.initialized = true;
        Ok(())
    }

    /// Advance the sample clock by one frame; samples when due
    ///
    /// Returns the sequence of the snapshot taken on this tick.
    pub fn on_tick(&mut self, root: &dyn Subject, dt: Duration) -> Option<u64> {
        if !self.initialized || self.shut_down || !self.clock.advance(dt) {
            return None;
        }

        let realtime = self.realtime();
        let sampler = &mut self.sampler;
        let snapshot = match catch_unwind(AssertUnwindSafe(|| sampler.sample(root, realtime))) {
            Ok(snapshot) => snapshot,
            Err(_) => {
                self.skipped_ticks += 1;
                tracing::warn!("Sampling panicked, tick skipped");
                return None;
            }
        };

        let sequence = snapshot.sequence;
        if let Some(stream) = &self.stream {
            stream.publish(&snapshot);
        }
        if let Some(pipeline) = &self.pipeline {
            pipeline.enqueue(&Record::Snapshot(snapshot));
        }
        Some(sequence)
    }

    /// Record an operator marker in the durable log
    pub fn mark(&self, label: impl Into<String>) {
        if self.shut_down {
            return;
        }
        let marker = Marker {
            sequence: self.sampler.last_sequence(),
            realtime: self.realtime(),
            label: label.into(),
        };
        tracing::debug!("Marker #{}: {}", marker.sequence, marker.label);
        if let Some(pipeline) = &self.pipeline {
            pipeline.enqueue(&Record::Marker(marker));
        }
    }

    /// Stop every sink and release the log writer; idempotent
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(mut stream) = self.stream.take() {
            stream.shutdown();
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.stop();
            let stats = pipeline.stats();
            tracing::info!(
                "Telemetry stopped: {} written, {} dropped, {} push failures",
                stats.written,
                stats.dropped,
                stats.push_failed
            );
        }
        self.log_guard = None;
    }

    /// Seconds since [`Self::init`] on the monotonic clock
    pub fn realtime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Sequence of the most recent snapshot
    pub fn last_sequence(&self) -> u64 {
        self.sampler.last_sequence()
    }

    /// Last stable location label
    pub fn location(&self) -> &str {
        self.sampler.location()
    }

    /// Ticks lost to a panicking sample
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    pub fn pipeline(&self) -> Option<&DeliveryPipeline> {
        self.pipeline.as_ref()
    }

    pub fn delivery_stats(&self) -> Option<DeliveryStats> {
        self.pipeline.as_ref().map(DeliveryPipeline::stats)
    }

    pub fn stream(&self) -> Option<&StreamServer> {
        self.stream.as_ref()
    }

    pub fn stream_stats(&self) -> Option<StreamStats> {
        self.stream.as_ref().map(StreamServer::stats)
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
