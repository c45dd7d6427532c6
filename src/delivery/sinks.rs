//! Delivery sinks
//!
//! Sinks are the blocking I/O end of the pipeline and only ever run on the
//! delivery worker thread.
//!
//! - [`RecordSink`] - durable, append-only line sink ([`FileSink`])
//! - [`NetworkSink`] - best-effort push target ([`HttpSink`])
//!
//! Both take an already-encoded line so the durable log and the push body are
//! byte-identical.

use crate::error::{Result, ResultExt, TelemetryError};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Durable append-only sink
pub trait RecordSink: Send {
    /// Append one line; the sink adds the newline and flushes
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Best-effort network push target
#[cfg_attr(test, mockall::automock)]
pub trait NetworkSink: Send {
    /// Deliver one line; any error is logged and discarded by the caller
    fn push(&mut self, line: &str) -> Result<()>;
}

// ==================== File Sink ====================

/// Newline-delimited JSON file, flushed after every line
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open `path` in append mode, creating it if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open record log {:?}", path))?;
        tracing::info!("Record log opened at {:?}", path);
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Create a fresh `events_<stamp>.jsonl` file inside `dir`
    pub fn create_in(dir: &Path) -> Result<Self> {
        crate::config::ensure_dir(dir)?;
        let name = crate::config::event_log_file_name(chrono::Utc::now());
        Self::open(dir.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

// ==================== HTTP Sink ====================

/// One POST per line with a short bounded timeout
#[derive(Debug)]
pub struct HttpSink {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        // push targets are local collectors; environment proxies are ignored
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl NetworkSink for HttpSink {
    fn push(&mut self, line: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(line.to_owned())
            .send()?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TelemetryError::Http(format!(
                "{} responded {}",
                self.endpoint, status
            )))
        }
    }
}
