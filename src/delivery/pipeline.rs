//! Delivery pipeline and worker thread
//!
//! [`DeliveryPipeline`] decouples the sampling context from blocking I/O.
//! The sampling context calls [`DeliveryPipeline::enqueue`], which encodes
//! the record and pushes it into a [`DropOldestQueue`]; a dedicated worker
//! thread pops records in order and writes each one to the durable sink,
//! then offers it to the optional network sink.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped
//! ```
//!
//! `stop` signals the worker, waits up to the configured grace period and
//! joins it, taking the sinks back so the pipeline can be restarted. A
//! worker that does not finish within the grace period is abandoned (it
//! still exits on its own once its in-flight write completes). Records
//! still queued at stop time are drained to the durable sink only.
//!
//! # Failure isolation
//!
//! Network push failures are counted and logged at debug level; they never
//! re-queue a record and never affect the durable write. A failed durable
//! write is counted and logged; the worker moves on to the next record.

use super::codec::encode_record;
use super::queue::DropOldestQueue;
use super::sinks::{FileSink, HttpSink, NetworkSink, RecordSink};
use crate::config::DeliverySettings;
use crate::error::{Result, TelemetryError};
use crate::types::Record;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Name of the delivery worker thread
pub const WORKER_THREAD_NAME: &str = "telemetry-delivery";

/// Pipeline lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Stopped,
    Running,
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Records accepted by `enqueue`
    pub enqueued: u64,
    /// Records evicted by queue overflow
    pub dropped: u64,
    /// Lines written to the durable sink
    pub written: u64,
    /// Lines accepted by the network sink
    pub pushed: u64,
    /// Network pushes that failed
    pub push_failed: u64,
    /// Durable writes that failed
    pub write_failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    written: AtomicU64,
    pushed: AtomicU64,
    push_failed: AtomicU64,
    write_failed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            pushed: self.pushed.load(Ordering::Relaxed),
            push_failed: self.push_failed.load(Ordering::Relaxed),
            write_failed: self.write_failed.load(Ordering::Relaxed),
        }
    }
}

/// Sinks owned by whichever side is currently running them
struct Sinks {
    durable: Box<dyn RecordSink>,
    network: Option<Box<dyn NetworkSink>>,
}

struct WorkerHandle {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    join: JoinHandle<Sinks>,
}

/// Bounded asynchronous delivery to a durable sink and an optional push target
pub struct DeliveryPipeline {
    queue: Arc<DropOldestQueue<String>>,
    counters: Arc<Counters>,
    idle_poll: Duration,
    stop_grace: Duration,
    log_path: Option<PathBuf>,
    /// `None` while the worker owns them, or after an abandoned stop
    sinks: Option<Sinks>,
    worker: Option<WorkerHandle>,
}

impl DeliveryPipeline {
    /// Create a stopped pipeline around explicit sinks
    pub fn new(
        settings: &DeliverySettings,
        durable: Box<dyn RecordSink>,
        network: Option<Box<dyn NetworkSink>>,
    ) -> Self {
        Self {
            queue: Arc::new(DropOldestQueue::new(settings.queue_capacity)),
            counters: Arc::new(Counters::default()),
            idle_poll: settings.idle_poll(),
            stop_grace: settings.stop_grace(),
            log_path: None,
            sinks: Some(Sinks { durable, network }),
            worker: None,
        }
    }

    /// Create a stopped pipeline with a fresh log file and the configured
    /// HTTP endpoint
    pub fn from_settings(settings: &DeliverySettings) -> Result<Self> {
        let dir = settings.resolved_log_dir().ok_or_else(|| {
            TelemetryError::Config("Could not determine a log directory".to_string())
        })?;
        let file = FileSink::create_in(&dir)?;
        let log_path = file.path().to_path_buf();

        let network: Option<Box<dyn NetworkSink>> = match &settings.http_endpoint {
            Some(endpoint) => {
                tracing::info!("HTTP push enabled to {}", endpoint);
                Some(Box::new(HttpSink::new(endpoint.clone(), settings.http_timeout())?))
            }
            None => None,
        };

        let mut pipeline = Self::new(settings, Box::new(file), network);
        pipeline.log_path = Some(log_path);
        Ok(pipeline)
    }

    /// Path of the durable log, when created by [`Self::from_settings`]
    pub fn log_path(&self) -> Option<&std::path::Path> {
        self.log_path.as_deref()
    }

    pub fn state(&self) -> PipelineState {
        if self.worker.is_some() {
            PipelineState::Running
        } else {
            PipelineState::Stopped
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    /// Records currently waiting for the worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Encode and queue a record without blocking
    ///
    /// Accepted in any state; records queued while stopped are delivered
    /// once the worker starts. An encoding failure drops the record.
    pub fn enqueue(&self, record: &Record) {
        let line = match encode_record(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Dropping record that failed to encode: {}", e);
                return;
            }
        };
        Counters::bump(&self.counters.enqueued);
        if self.queue.push(line).is_some() {
            Counters::bump(&self.counters.dropped);
        }
    }

    /// Start the worker thread; a no-op while running
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let sinks = self.sinks.take().ok_or_else(|| {
            TelemetryError::Pipeline(
                "sinks are still held by an abandoned worker".to_string(),
            )
        })?;

        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let worker = Worker {
            queue: self.queue.clone(),
            counters: self.counters.clone(),
            idle_poll: self.idle_poll,
            stop_rx,
            done_tx,
            sinks,
        };

        let join = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())?;

        self.worker = Some(WorkerHandle {
            stop_tx,
            done_rx,
            join,
        });
        tracing::info!("Delivery pipeline started");
        Ok(())
    }

    /// Stop the worker, waiting at most the grace period; idempotent
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        let _ = handle.stop_tx.try_send(());
        match handle.done_rx.recv_timeout(self.stop_grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match handle.join.join() {
                Ok(sinks) => {
                    self.sinks = Some(sinks);
                    tracing::info!("Delivery pipeline stopped");
                }
                Err(_) => tracing::error!("Delivery worker panicked"),
            },
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Delivery worker did not stop within {:?}, abandoning it",
                    self.stop_grace
                );
            }
        }
    }
}

impl Drop for DeliveryPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DeliveryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryPipeline")
            .field("state", &self.state())
            .field("pending", &self.pending())
            .field("log_path", &self.log_path)
            .finish()
    }
}

struct Worker {
    queue: Arc<DropOldestQueue<String>>,
    counters: Arc<Counters>,
    idle_poll: Duration,
    stop_rx: Receiver<()>,
    done_tx: Sender<()>,
    sinks: Sinks,
}

impl Worker {
    fn run(mut self) -> Sinks {
        tracing::debug!("Delivery worker running");

        loop {
            match self.stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
            match self.queue.pop() {
                Some(line) => self.deliver(&line, true),
                None => match self.stop_rx.recv_timeout(self.idle_poll) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                },
            }
        }

        let mut drained = 0usize;
        while let Some(line) = self.queue.pop() {
            self.deliver(&line, false);
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!("Drained {} records to the durable sink", drained);
        }

        let _ = self.done_tx.send(());
        self.sinks
    }

    fn deliver(&mut self, line: &str, push: bool) {
        match self.sinks.durable.write_line(line) {
            Ok(()) => Counters::bump(&self.counters.written),
            Err(e) => {
                Counters::bump(&self.counters.write_failed);
                tracing::warn!("Durable write failed: {}", e);
            }
        }

        if !push {
            return;
        }
        if let Some(network) = self.sinks.network.as_mut() {
            match network.push(line) {
                Ok(()) => Counters::bump(&self.counters.pushed),
                Err(e) => {
                    Counters::bump(&self.counters.push_failed);
                    tracing::debug!("Network push failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::sinks::MockNetworkSink;
    use crate::types::{Marker, Snapshot};
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct MemorySink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordSink for MemorySink {
        fn write_line(&mut self, line: &str) -> Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn write_line(&mut self, _line: &str) -> Result<()> {
            Err(TelemetryError::Io(std::io::Error::other("disk full")))
        }
    }

    fn settings(capacity: usize) -> DeliverySettings {
        DeliverySettings {
            queue_capacity: capacity,
            idle_poll_ms: 1,
            stop_grace_ms: 2000,
            ..Default::default()
        }
    }

    fn sequences(lines: &[String]) -> Vec<u64> {
        lines
            .iter()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["sequence"].as_u64().unwrap()
            })
            .collect()
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_overflow_keeps_newest_in_order() {
        let sink = MemorySink::default();
        let mut pipeline = DeliveryPipeline::new(&settings(4), Box::new(sink.clone()), None);

        for seq in 1..=10 {
            pipeline.enqueue(&Snapshot::empty(seq, seq as f64).into());
        }
        assert_eq!(pipeline.pending(), 4);

        pipeline.start().unwrap();
        pipeline.stop();

        let lines = sink.lines.lock().unwrap().clone();
        assert_eq!(sequences(&lines), vec![7, 8, 9, 10]);
        let stats = pipeline.stats();
        assert_eq!(stats.enqueued, 10);
        assert_eq!(stats.dropped, 6);
        assert_eq!(stats.written, 4);
    }

    #[test]
    fn test_failing_push_does_not_disturb_durable_writes() {
        let sink = MemorySink::default();
        let mut network = MockNetworkSink::new();
        network
            .expect_push()
            .returning(|_| Err(TelemetryError::Http("timed out".to_string())));

        let mut pipeline =
            DeliveryPipeline::new(&settings(64), Box::new(sink.clone()), Some(Box::new(network)));
        pipeline.start().unwrap();
        for seq in 1..=20 {
            pipeline.enqueue(&Snapshot::empty(seq, 0.0).into());
        }
        wait_for(|| sink.lines.lock().unwrap().len() == 20);
        pipeline.stop();

        let lines = sink.lines.lock().unwrap().clone();
        assert_eq!(sequences(&lines), (1..=20).collect::<Vec<_>>());
        let stats = pipeline.stats();
        assert_eq!(stats.written, 20);
        assert_eq!(stats.pushed, 0);
        assert!(stats.push_failed >= 1);
    }

    #[test]
    fn test_push_receives_same_line_as_durable_log() {
        let sink = MemorySink::default();
        let pushed = Arc::new(Mutex::new(Vec::new()));
        let pushed2 = pushed.clone();
        let mut network = MockNetworkSink::new();
        network.expect_push().returning(move |line| {
            pushed2.lock().unwrap().push(line.to_string());
            Ok(())
        });

        let mut pipeline =
            DeliveryPipeline::new(&settings(8), Box::new(sink.clone()), Some(Box::new(network)));
        pipeline.start().unwrap();
        let marker = Marker {
            sequence: 0,
            realtime: 0.25,
            label: "start".to_string(),
        };
        pipeline.enqueue(&marker.into());
        wait_for(|| pushed.lock().unwrap().len() == 1);
        pipeline.stop();

        assert_eq!(*pushed.lock().unwrap(), *sink.lines.lock().unwrap());
        assert_eq!(pipeline.stats().pushed, 1);
    }

    #[test]
    fn test_stop_is_idempotent_and_restartable() {
        let sink = MemorySink::default();
        let mut pipeline = DeliveryPipeline::new(&settings(8), Box::new(sink.clone()), None);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        pipeline.stop();

        pipeline.start().unwrap();
        pipeline.start().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Running);
        pipeline.stop();
        pipeline.stop();
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        pipeline.enqueue(&Snapshot::empty(1, 0.0).into());
        pipeline.start().unwrap();
        pipeline.stop();
        assert_eq!(sink.lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_durable_failure_is_counted_not_fatal() {
        let mut pipeline = DeliveryPipeline::new(&settings(8), Box::new(FailingSink), None);
        pipeline.enqueue(&Snapshot::empty(1, 0.0).into());
        pipeline.enqueue(&Snapshot::empty(2, 0.0).into());
        pipeline.start().unwrap();
        pipeline.stop();
        assert_eq!(pipeline.stats().write_failed, 2);
        assert_eq!(pipeline.stats().written, 0);
    }

    #[test]
    fn test_stop_drains_without_pushing() {
        let sink = MemorySink::default();
        let mut network = MockNetworkSink::new();
        network.expect_push().never();

        let mut pipeline =
            DeliveryPipeline::new(&settings(8), Box::new(sink.clone()), Some(Box::new(network)));
        // stop requested before the worker sees any record
        for seq in 1..=3 {
            pipeline.enqueue(&Snapshot::empty(seq, 0.0).into());
        }
        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, _done_rx) = bounded(1);
        stop_tx.send(()).unwrap();
        let worker = Worker {
            queue: pipeline.queue.clone(),
            counters: pipeline.counters.clone(),
            idle_poll: Duration::from_millis(1),
            stop_rx,
            done_tx,
            sinks: pipeline.sinks.take().unwrap(),
        };
        let sinks = worker.run();
        assert_eq!(sink.lines.lock().unwrap().len(), 3);
        drop(sinks);
    }
}
