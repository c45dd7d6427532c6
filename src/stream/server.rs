//! Single-client TCP streaming server
//!
//! [`StreamServer`] listens on a loopback port and forwards every published
//! snapshot to at most one connected client. All socket work happens on a
//! dedicated thread; [`StreamServer::publish`] only encodes the snapshot and
//! pushes the line into a bounded drop-oldest backlog.
//!
//! # Connection state
//!
//! ```text
//! Listening --accept--> Connected --write failure--> Listening
//!               ^            |
//!               +-- accept --+  (a new client replaces the current one)
//! ```
//!
//! On accept, any previous client is shut down, the backlog is cleared and
//! the handshake is written before any snapshot.

use super::protocol::{encode_snapshot, Handshake};
use crate::config::StreamSettings;
use crate::delivery::DropOldestQueue;
use crate::error::{Result, TelemetryError};
use crate::types::Snapshot;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::io::{ErrorKind, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Name of the stream server thread
pub const SERVER_THREAD_NAME: &str = "telemetry-stream";

/// Poll interval of the accept/send loop
const LOOP_INTERVAL: Duration = Duration::from_millis(10);

/// Whether a client is currently attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Listening,
    Connected,
}

/// Point-in-time copy of the server counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Clients accepted
    pub connections: u64,
    /// Lines written, handshakes included
    pub messages_sent: u64,
    /// Writes that failed and dropped the client
    pub send_failures: u64,
}

#[derive(Debug)]
struct Shared {
    backlog: DropOldestQueue<String>,
    connected: AtomicBool,
    connections: AtomicU64,
    messages_sent: AtomicU64,
    send_failures: AtomicU64,
}

struct ServerHandle {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    join: JoinHandle<()>,
}

/// Loopback streaming server
pub struct StreamServer {
    shared: Arc<Shared>,
    local_addr: SocketAddr,
    stop_grace: Duration,
    handle: Option<ServerHandle>,
}

impl StreamServer {
    /// Bind the loopback port and start the server thread
    pub fn start(settings: &StreamSettings) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, settings.port)).map_err(|e| {
            TelemetryError::Stream(format!("Failed to bind port {}: {}", settings.port, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            backlog: DropOldestQueue::new(settings.queue_capacity),
            connected: AtomicBool::new(false),
            connections: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        });

        let mut handshake = Handshake::from_settings(settings).encode()?;
        handshake.push('\n');

        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let server_loop = ServerLoop {
            listener,
            shared: shared.clone(),
            handshake,
            write_timeout: settings.write_timeout(),
            client: None,
            stop_rx,
            done_tx,
        };

        let join = std::thread::Builder::new()
            .name(SERVER_THREAD_NAME.to_string())
            .spawn(move || server_loop.run())?;

        tracing::info!("Stream server listening on {}", local_addr);
        Ok(Self {
            shared,
            local_addr,
            stop_grace: settings.stop_grace(),
            handle: Some(ServerHandle {
                stop_tx,
                done_rx,
                join,
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ConnectionState {
        if self.shared.connected.load(Ordering::Acquire) {
            ConnectionState::Connected
        } else {
            ConnectionState::Listening
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            connections: self.shared.connections.load(Ordering::Relaxed),
            messages_sent: self.shared.messages_sent.load(Ordering::Relaxed),
            send_failures: self.shared.send_failures.load(Ordering::Relaxed),
        }
    }

    /// Queue a snapshot for the connected client; never blocks
    ///
    /// Without a client the snapshot is discarded before encoding.
    pub fn publish(&self, snapshot: &Snapshot) {
        if self.handle.is_none() || !self.shared.connected.load(Ordering::Acquire) {
            return;
        }
        match encode_snapshot(snapshot) {
            Ok(mut line) => {
                line.push('\n');
                self.shared.backlog.push(line);
            }
            Err(e) => tracing::warn!("Dropping snapshot that failed to encode: {}", e),
        }
    }

    /// Stop the server thread, close the listener and any client; idempotent
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        let _ = handle.stop_tx.try_send(());
        match handle.done_rx.recv_timeout(self.stop_grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join.join().is_err() {
                    tracing::error!("Stream server thread panicked");
                }
                tracing::info!("Stream server stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Stream server did not stop within {:?}, abandoning it",
                    self.stop_grace
                );
            }
        }
        self.shared.connected.store(false, Ordering::Release);
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for StreamServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish()
    }
}

struct ServerLoop {
    listener: TcpListener,
    shared: Arc<Shared>,
    handshake: String,
    write_timeout: Duration,
    client: Option<TcpStream>,
    stop_rx: Receiver<()>,
    done_tx: Sender<()>,
}

impl ServerLoop {
    fn run(mut self) {
        loop {
            match self.stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            self.accept_pending();
            self.flush_backlog();

            match self.stop_rx.recv_timeout(LOOP_INTERVAL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        self.close_client();
        let _ = self.done_tx.send(());
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => self.on_accept(stream, addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Stream accept failed: {}", e);
                    break;
                }
            }
        }
    }

    fn on_accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Some(previous) = self.client.take() {
            tracing::info!("Replacing stream client with {}", addr);
            let _ = previous.shutdown(Shutdown::Both);
        }
        self.shared.backlog.clear();

        let configured = stream
            .set_nonblocking(false)
            .and_then(|()| stream.set_nodelay(true))
            .and_then(|()| stream.set_write_timeout(Some(self.write_timeout)));
        if let Err(e) = configured {
            tracing::warn!("Failed to configure stream client {}: {}", addr, e);
            self.shared.connected.store(false, Ordering::Release);
            return;
        }

        self.shared.connections.fetch_add(1, Ordering::Relaxed);
        self.shared.connected.store(true, Ordering::Release);
        self.client = Some(stream);
        tracing::info!("Stream client connected from {}", addr);

        let handshake = std::mem::take(&mut self.handshake);
        self.send(&handshake);
        self.handshake = handshake;
    }

    fn flush_backlog(&mut self) {
        while self.client.is_some() {
            let Some(line) = self.shared.backlog.pop() else {
                break;
            };
            self.send(&line);
        }
    }

    fn send(&mut self, line: &str) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        match client.write_all(line.as_bytes()).and_then(|()| client.flush()) {
            Ok(()) => {
                self.shared.messages_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.shared.send_failures.fetch_add(1, Ordering::Relaxed);
                tracing::info!("Stream client write failed, back to listening: {}", e);
                self.close_client();
            }
        }
    }

    fn close_client(&mut self) {
        if let Some(client) = self.client.take() {
            let _ = client.shutdown(Shutdown::Both);
        }
        self.shared.connected.store(false, Ordering::Release);
        self.shared.backlog.clear();
    }
}
