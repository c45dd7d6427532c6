//! Core data types for gungeon-telemetry
//!
//! This module contains the records produced by the sampler and consumed by
//! the delivery sinks.
//!
//! # Main Types
//!
//! - [`ScalarKind`] / [`Scalar`] - The closed set of scalar kinds an attribute can be coerced to
//! - [`Vec2`] - A two-axis value, serialized as `[x, y]`
//! - [`Snapshot`] - One sampled observation of the host state
//! - [`Marker`] - A discrete operator-triggered event
//! - [`Record`] - Either of the above, as merged into the delivery queue
//!
//! # Sentinels
//!
//! The wire format is schema-stable: every field is always present. A scalar
//! that could not be resolved is written as [`ABSENT`] (`-1`) rather than
//! omitted, and an unresolved location is [`UNKNOWN_LOCATION`].

use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

/// Sentinel for an absent floating point field
pub const ABSENT: f64 = -1.0;

/// Sentinel for an absent integer field
pub const ABSENT_INT: i64 = -1;

/// Location label used until a stable location has been observed
pub const UNKNOWN_LOCATION: &str = "unknown";

/// Scalar kinds an attribute can be coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 string
    Str,
}

/// A coerced scalar value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Numeric view of the scalar (strings are not converted here)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Str(_) => None,
        }
    }

    /// Integer view of the scalar
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Float(v) => Some(*v as i64),
            Scalar::Str(_) => None,
        }
    }

    /// Consume into a string if this is a string scalar
    pub fn into_string(self) -> Option<String> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The kind of this scalar
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }
}

/// Two-axis value (position, velocity, direction)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Vec2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Serialize for Vec2 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.x)?;
        tup.serialize_element(&self.y)?;
        tup.end()
    }
}

fn vec_or_zero<S: Serializer>(v: &Option<Vec2>, serializer: S) -> Result<S::Ok, S::Error> {
    v.unwrap_or(Vec2::ZERO).serialize(serializer)
}

/// Player state resolved from the primary player subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerState {
    /// Unit center, `None` when unresolved
    #[serde(serialize_with = "vec_or_zero")]
    pub position: Option<Vec2>,
    #[serde(serialize_with = "vec_or_zero")]
    pub velocity: Option<Vec2>,
    pub health: f64,
    pub max_health: f64,
    pub armor: f64,
    /// Facing angle in degrees, normalized to `[0, 360)`
    pub looking_angle: f64,
    pub blanks: i64,
    pub money: i64,
    pub keys: i64,
    pub is_dodge_rolling: bool,
    pub current_gun_id: i64,
    pub current_gun_ammo: i64,
    pub active_item_id: i64,
    pub passive_item_ids: Vec<i64>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: None,
            velocity: None,
            health: ABSENT,
            max_health: ABSENT,
            armor: ABSENT,
            looking_angle: ABSENT,
            blanks: ABSENT_INT,
            money: ABSENT_INT,
            keys: ABSENT_INT,
            is_dodge_rolling: false,
            current_gun_id: ABSENT_INT,
            current_gun_ammo: ABSENT_INT,
            active_item_id: ABSENT_INT,
            passive_item_ids: Vec::new(),
        }
    }
}

/// A live enemy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyState {
    pub guid: String,
    pub position: Vec2,
    pub health: f64,
    pub max_health: f64,
    pub is_boss: bool,
    pub distance_to_player: f64,
}

/// A projectile in flight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileState {
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f64,
    pub is_enemy: bool,
}

/// The room the player currently occupies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomState {
    pub room_name: String,
    pub base_position: [i64; 2],
    pub dimensions: [i64; 2],
    pub is_boss_room: bool,
    pub enemies_remaining: i64,
    pub player_relative_position: Vec2,
}

/// One sampled observation
///
/// Created by the sampler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Starts at 1, incremented once per sample
    pub sequence: u64,
    /// Monotonic seconds since the tracker started
    pub realtime: f64,
    /// Canonical location label, [`UNKNOWN_LOCATION`] until one is observed
    pub location: String,
    pub player: PlayerState,
    pub enemies: Vec<EnemyState>,
    pub projectiles: Vec<ProjectileState>,
    pub room: Option<RoomState>,
}

impl Snapshot {
    /// A snapshot with every field absent
    pub fn empty(sequence: u64, realtime: f64) -> Self {
        Self {
            sequence,
            realtime,
            location: UNKNOWN_LOCATION.to_string(),
            player: PlayerState::default(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            room: None,
        }
    }

    /// Location as an optional label (`None` for the unknown sentinel)
    pub fn level_name(&self) -> Option<&str> {
        if self.location == UNKNOWN_LOCATION {
            None
        } else {
            Some(&self.location)
        }
    }
}

/// An operator-triggered event
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Sequence of the most recent snapshot at the time of marking
    pub sequence: u64,
    pub realtime: f64,
    pub label: String,
}

/// A record as merged into the delivery queue
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Snapshot(Snapshot),
    Marker(Marker),
}

impl From<Snapshot> for Record {
    fn from(s: Snapshot) -> Self {
        Record::Snapshot(s)
    }
}

impl From<Marker> for Record {
    fn from(m: Marker) -> Self {
        Record::Marker(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_defaults_are_sentinels() {
        let p = PlayerState::default();
        assert_eq!(p.health, ABSENT);
        assert_eq!(p.max_health, ABSENT);
        assert_eq!(p.keys, ABSENT_INT);
        assert!(p.position.is_none());
    }

    #[test]
    fn test_vec2_serializes_as_array() {
        let json = serde_json::to_string(&Vec2::new(1.5, -2.0)).unwrap();
        assert_eq!(json, "[1.5,-2.0]");
    }

    #[test]
    fn test_absent_position_serializes_as_zero() {
        let json = serde_json::to_value(PlayerState::default()).unwrap();
        assert_eq!(json["position"], serde_json::json!([0.0, 0.0]));
        assert_eq!(json["health"], serde_json::json!(-1.0));
    }

    #[test]
    fn test_level_name_hides_unknown() {
        let mut s = Snapshot::empty(1, 0.0);
        assert_eq!(s.level_name(), None);
        s.location = "Forge".to_string();
        assert_eq!(s.level_name(), Some("Forge"));
    }

    #[test]
    fn test_scalar_views() {
        assert_eq!(Scalar::Int(3).as_f64(), Some(3.0));
        assert_eq!(Scalar::Float(3.9).as_i64(), Some(3));
        assert_eq!(Scalar::Str("x".into()).as_f64(), None);
        assert_eq!(Scalar::Str("x".into()).into_string(), Some("x".to_string()));
    }
}
