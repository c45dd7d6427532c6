//! # gungeon-telemetry: in-process game state telemetry
//!
//! Samples live state from a running game (player position, health,
//! inventory, enemies, current floor) at a fixed rate and delivers it to
//! external consumers without ever blocking or crashing the host's frame
//! loop.
//!
//! ## Architecture
//!
//! - **Capture**: a host adapter implements [`Subject`]; the [`Sampler`]
//!   resolves attributes through ordered candidate-name lists and builds
//!   immutable [`Snapshot`]s
//! - **Delivery**: a bounded drop-oldest queue drained by a worker thread
//!   into an append-only JSONL file and an optional HTTP push target
//! - **Streaming**: a loopback TCP server forwarding snapshots to one live
//!   client after a handshake
//! - **Tracker**: the lifecycle facade wiring the above to host hooks
//!
//! ## Output Location
//!
//! Record files default to the platform data directory under
//! `gungeon-telemetry/out`:
//!
//! - **Linux**: `~/.local/share/gungeon-telemetry/out/`
//! - **macOS**: `~/Library/Application Support/gungeon-telemetry/out/`
//! - **Windows**: `%APPDATA%\gungeon-telemetry\out\`
//!
//! ## Example
//!
//! ```ignore
//! use gungeon_telemetry::{MapSubject, TelemetryConfig, Tracker};
//! use std::time::Duration;
//!
//! let mut tracker = Tracker::new(TelemetryConfig::load_or_default("telemetry.toml"));
//! tracker.init()?;
//!
//! let root = MapSubject::new().with_property("ActiveSceneName", "tt_castle");
//! loop {
//!     tracker.on_tick(&root, Duration::from_millis(16));
//! }
//! ```

pub mod capture;
pub mod config;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod stream;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use capture::{MapSubject, Sampler, Subject, Value};
pub use config::TelemetryConfig;
pub use delivery::{DeliveryPipeline, DeliveryStats};
pub use error::{Result, TelemetryError};
pub use stream::StreamServer;
pub use tracker::Tracker;
pub use types::{Marker, Record, Snapshot};
