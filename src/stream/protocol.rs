//! Streaming protocol messages
//!
//! Newline-delimited JSON over one TCP connection. The first message after
//! accept is always a [`Handshake`]; every following message is a snapshot:
//!
//! ```text
//! {"message_type":"handshake","schema_version":1,"plugin_version":"0.1.0","game":"Enter the Gungeon"}
//! {"message_type":"snapshot","sequence":1,"realtime":0.2,"level_name":null,"player":{...},"enemies":[],"projectiles":[],"room":null}
//! ```

use crate::config::StreamSettings;
use crate::error::Result;
use crate::types::{EnemyState, PlayerState, ProjectileState, RoomState, Snapshot};
use serde::{Deserialize, Serialize};

pub const HANDSHAKE_TYPE: &str = "handshake";
pub const SNAPSHOT_TYPE: &str = "snapshot";

/// Version reported as `plugin_version`
pub const EMITTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// First message sent to every client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub message_type: String,
    pub schema_version: u32,
    pub plugin_version: String,
    pub game: String,
}

impl Handshake {
    pub fn from_settings(settings: &StreamSettings) -> Self {
        Self {
            message_type: HANDSHAKE_TYPE.to_string(),
            schema_version: settings.schema_version,
            plugin_version: EMITTER_VERSION.to_string(),
            game: settings.game.clone(),
        }
    }

    /// Encode as one line (without the trailing newline)
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Serialize)]
struct SnapshotMessage<'a> {
    message_type: &'static str,
    sequence: u64,
    realtime: f64,
    level_name: Option<&'a str>,
    player: &'a PlayerState,
    enemies: &'a [EnemyState],
    projectiles: &'a [ProjectileState],
    room: Option<&'a RoomState>,
}

/// Encode a snapshot as one stream line (without the trailing newline)
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String> {
    let message = SnapshotMessage {
        message_type: SNAPSHOT_TYPE,
        sequence: snapshot.sequence,
        realtime: snapshot.realtime,
        level_name: snapshot.level_name(),
        player: &snapshot.player,
        enemies: &snapshot.enemies,
        projectiles: &snapshot.projectiles,
        room: snapshot.room.as_ref(),
    };
    Ok(serde_json::to_string(&message)?)
}
