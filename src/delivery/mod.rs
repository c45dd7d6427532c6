//! Record delivery
//!
//! Everything between a sampled record and its destinations:
//!
//! - [`DropOldestQueue`] - bounded, non-blocking hand-off from the sampling context
//! - [`codec`] - newline-delimited JSON encoding of log lines
//! - [`FileSink`] / [`HttpSink`] - durable and best-effort sinks
//! - [`DeliveryPipeline`] - owns the worker thread that drains the queue

pub mod codec;
pub mod pipeline;
pub mod queue;
pub mod sinks;

pub use pipeline::{DeliveryPipeline, DeliveryStats, PipelineState};
pub use queue::DropOldestQueue;
pub use sinks::{FileSink, HttpSink, NetworkSink, RecordSink};
