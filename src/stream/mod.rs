//! Loopback streaming to a single live client
//!
//! An alternative network sink to the HTTP push: a consumer connects once
//! and receives a handshake followed by every sampled snapshot.

pub mod protocol;
pub mod server;

pub use protocol::{encode_snapshot, Handshake, EMITTER_VERSION};
pub use server::{ConnectionState, StreamServer, StreamStats};
