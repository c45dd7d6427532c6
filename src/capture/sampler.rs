//! Snapshot sampling
//!
//! The [`Sampler`] turns the host's root subject into an immutable
//! [`Snapshot`]. It runs on the host's per-frame tick, so it never blocks,
//! never fails, and keeps all of its memoization local: one
//! [`AttributeSlot`] per logical attribute, reused across ticks.
//!
//! # Rate limiting
//!
//! [`SampleClock`] accumulates frame deltas and fires once the accumulated
//! time reaches the sampling interval. Each firing deducts exactly one
//! interval, so a burst of slow frames never produces more than one sample
//! per tick.
//!
//! # Location
//!
//! [`LocationTracker`] resolves the current location through three tiers of
//! candidates (floor names, the dungeon container's name, the active scene
//! name). Transient labels such as "Loading ..." are skipped and the last
//! stable label is kept, so the location never regresses to "unknown" once
//! a real value has been seen.

use super::canonical::{canonicalize, is_transient};
use super::resolver::{coerce, lookup_path, AttributeSlot};
use super::subject::{Subject, Value};
use crate::types::{
    EnemyState, PlayerState, ProjectileState, RoomState, ScalarKind, Snapshot, Vec2, ABSENT,
    ABSENT_INT, UNKNOWN_LOCATION,
};
use std::sync::Arc;
use std::time::Duration;

/// Default sampling interval (5 Hz)
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

mod names {
    //! Candidate name lists, in priority order.

    pub const PLAYER: &[&str] = &["PrimaryPlayer", "primaryPlayer", "Player"];

    pub const LOCATION: &[&str] = &[
        "Dungeon.DungeonFloorName",
        "Dungeon.DungeonShortName",
        "LastLoadedLevelDefinition.dungeonSceneName",
        "Dungeon.tileIndices.tilesetId",
    ];
    pub const LOCATION_CONTAINER: &[&str] = &["Dungeon.gameObject.name", "Dungeon.name"];
    pub const LOCATION_CONTEXT: &[&str] = &["ActiveScene.name", "ActiveSceneName"];

    pub const POSITION: &[&str] = &["specRigidbody.UnitCenter", "CenterPosition", "transform.position"];
    pub const VELOCITY: &[&str] = &["Velocity", "specRigidbody.Velocity"];
    pub const HEALTH: &[&str] = &["healthHaver.currentHealth", "healthHaver.CurrentHealth", "Health"];
    pub const MAX_HEALTH: &[&str] = &[
        "healthHaver.maximumHealth",
        "healthHaver.MaxHealth",
        "healthHaver.AdjustedMaxHealth",
        "MaxHealth",
    ];
    pub const ARMOR: &[&str] = &["healthHaver.Armor", "Armor"];
    pub const ANGLE: &[&str] = &["m_currentGunAngle", "CurrentGunAngle", "FacingAngle"];
    pub const BLANKS: &[&str] = &["Blanks", "blanks"];
    pub const MONEY: &[&str] = &["carriedConsumables.Currency", "Currency", "money"];
    pub const KEYS: &[&str] = &["carriedConsumables.KeyBullets", "KeyBullets", "keys"];
    pub const DODGE: &[&str] = &["IsDodgeRolling", "isDodgeRolling"];
    pub const GUN_ID: &[&str] = &["CurrentGun.PickupObjectId", "CurrentGunId"];
    pub const GUN_AMMO: &[&str] = &["CurrentGun.CurrentAmmo", "CurrentGun.ammo"];
    pub const ACTIVE_ITEMS: &[&str] = &["activeItems", "ActiveItems"];
    pub const PASSIVE_ITEMS: &[&str] = &["passiveItems", "PassiveItems"];
    pub const PICKUP_ID: &[&str] = &["PickupObjectId"];

    pub const ENEMIES: &[&str] = &["AllEnemies", "StaticReferenceManager.AllEnemies"];
    pub const ENEMY_GUID: &[&str] = &["EnemyGuid", "guid"];
    pub const ENEMY_DEAD: &[&str] = &["healthHaver.IsDead", "IsDead"];
    pub const ENEMY_BOSS: &[&str] = &["healthHaver.IsBoss", "IsBoss"];

    pub const PROJECTILES: &[&str] = &["AllProjectiles", "StaticReferenceManager.AllProjectiles"];
    pub const PROJECTILE_POSITION: &[&str] = &["specRigidbody.UnitCenter", "Position"];
    pub const PROJECTILE_DIRECTION: &[&str] = &["Direction", "direction"];
    pub const PROJECTILE_SPEED: &[&str] = &["Speed", "baseData.speed"];
    pub const PROJECTILE_ENEMY: &[&str] = &["IsEnemyOwned", "isEnemy"];

    pub const ROOM: &[&str] = &["CurrentRoom", "currentRoom"];
    pub const ROOM_NAME: &[&str] = &["RoomName", "area.PrototypeRoomName"];
    pub const ROOM_BASE: &[&str] = &["area.basePosition"];
    pub const ROOM_DIMENSIONS: &[&str] = &["area.dimensions"];
    pub const ROOM_CATEGORY: &[&str] = &["area.PrototypeRoomCategory"];
    pub const ROOM_ENEMIES: &[&str] = &["ActiveEnemyCount", "activeEnemies"];
}

/// Normalize an angle in degrees into `[0, 360)`
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Frame-time accumulator deciding when to sample
#[derive(Debug, Clone)]
pub struct SampleClock {
    interval: Duration,
    accumulated: Duration,
}

impl SampleClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time accumulated towards the next sample
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Add a frame delta; returns true when a sample is due
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.accumulated = self.accumulated.saturating_add(dt);
        if self.accumulated >= self.interval {
            self.accumulated -= self.interval;
            true
        } else {
            false
        }
    }
}

impl Default for SampleClock {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

/// Memoized location resolution with a last-known-stable label
#[derive(Debug, Clone)]
pub struct LocationTracker {
    cached: Option<&'static str>,
    stable: String,
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationTracker {
    pub fn new() -> Self {
        Self {
            cached: None,
            stable: UNKNOWN_LOCATION.to_string(),
        }
    }

    /// Last stable label (the unknown sentinel before any is observed)
    pub fn stable(&self) -> &str {
        &self.stable
    }

    /// Candidate path that produced the stable label most recently
    pub fn cached(&self) -> Option<&str> {
        self.cached
    }

    fn tiers() -> impl Iterator<Item = &'static str> {
        names::LOCATION
            .iter()
            .chain(names::LOCATION_CONTAINER)
            .chain(names::LOCATION_CONTEXT)
            .copied()
    }

    fn read(subject: &dyn Subject, path: &str) -> Option<String> {
        let raw = lookup_path(subject, path)?;
        let raw = coerce(&raw, ScalarKind::Str)?.into_string()?;
        let label = canonicalize(&raw);
        if is_transient(&label) {
            None
        } else {
            Some(label)
        }
    }

    /// Resolve the current location, falling back to the last stable label
    pub fn resolve(&mut self, subject: &dyn Subject) -> String {
        if let Some(path) = self.cached {
            if let Some(label) = Self::read(subject, path) {
                self.stable.clone_from(&label);
                return label;
            }
        }

        let failed = self.cached.take();
        for path in Self::tiers() {
            if Some(path) == failed {
                continue;
            }
            if let Some(label) = Self::read(subject, path) {
                tracing::debug!("Location resolved via {}: {}", path, label);
                self.cached = Some(path);
                self.stable.clone_from(&label);
                return label;
            }
        }

        self.stable.clone()
    }
}

#[derive(Debug, Default)]
struct PlayerSlots {
    position: AttributeSlot,
    velocity: AttributeSlot,
    health: AttributeSlot,
    max_health: AttributeSlot,
    armor: AttributeSlot,
    angle: AttributeSlot,
    blanks: AttributeSlot,
    money: AttributeSlot,
    keys: AttributeSlot,
    dodge: AttributeSlot,
    gun_id: AttributeSlot,
    gun_ammo: AttributeSlot,
    active_items: AttributeSlot,
    passive_items: AttributeSlot,
}

impl PlayerSlots {
    fn sample(&mut self, player: &dyn Subject) -> PlayerState {
        PlayerState {
            position: self.position.resolve_vec2(player, names::POSITION),
            velocity: self.velocity.resolve_vec2(player, names::VELOCITY),
            health: self.health.resolve_f64(player, names::HEALTH).unwrap_or(ABSENT),
            max_health: self
                .max_health
                .resolve_f64(player, names::MAX_HEALTH)
                .unwrap_or(ABSENT),
            armor: self.armor.resolve_f64(player, names::ARMOR).unwrap_or(ABSENT),
            looking_angle: self
                .angle
                .resolve_f64(player, names::ANGLE)
                .filter(|a| a.is_finite())
                .map(normalize_degrees)
                .unwrap_or(ABSENT),
            blanks: self.blanks.resolve_i64(player, names::BLANKS).unwrap_or(ABSENT_INT),
            money: self.money.resolve_i64(player, names::MONEY).unwrap_or(ABSENT_INT),
            keys: self.keys.resolve_i64(player, names::KEYS).unwrap_or(ABSENT_INT),
            is_dodge_rolling: self.dodge.resolve_bool(player, names::DODGE).unwrap_or(false),
            current_gun_id: self.gun_id.resolve_i64(player, names::GUN_ID).unwrap_or(ABSENT_INT),
            current_gun_ammo: self
                .gun_ammo
                .resolve_i64(player, names::GUN_AMMO)
                .unwrap_or(ABSENT_INT),
            active_item_id: self
                .active_items
                .resolve_with(player, names::ACTIVE_ITEMS, |v| match v {
                    Value::List(items) => Some(items.first().and_then(pickup_id)),
                    _ => None,
                })
                .flatten()
                .unwrap_or(ABSENT_INT),
            passive_item_ids: self
                .passive_items
                .resolve_with(player, names::PASSIVE_ITEMS, |v| match v {
                    Value::List(items) => Some(
                        items
                            .iter()
                            .filter_map(pickup_id)
                            .filter(|id| *id >= 0)
                            .collect(),
                    ),
                    _ => None,
                })
                .unwrap_or_default(),
        }
    }
}

fn pickup_id(item: &Value) -> Option<i64> {
    let obj = item.as_object()?;
    super::resolver::resolve(obj.as_ref(), names::PICKUP_ID, ScalarKind::Int)?.as_i64()
}

#[derive(Debug, Default)]
struct EnemySlots {
    guid: AttributeSlot,
    dead: AttributeSlot,
    boss: AttributeSlot,
    position: AttributeSlot,
    health: AttributeSlot,
    max_health: AttributeSlot,
}

impl EnemySlots {
    fn sample(&mut self, enemy: &dyn Subject, player_pos: Vec2) -> Option<EnemyState> {
        if self.dead.resolve_bool(enemy, names::ENEMY_DEAD).unwrap_or(false) {
            return None;
        }
        let position = self
            .position
            .resolve_vec2(enemy, names::POSITION)
            .unwrap_or(Vec2::ZERO);
        Some(EnemyState {
            guid: self.guid.resolve_string(enemy, names::ENEMY_GUID).unwrap_or_default(),
            position,
            health: self.health.resolve_f64(enemy, names::HEALTH).unwrap_or(ABSENT),
            max_health: self
                .max_health
                .resolve_f64(enemy, names::MAX_HEALTH)
                .unwrap_or(ABSENT),
            is_boss: self.boss.resolve_bool(enemy, names::ENEMY_BOSS).unwrap_or(false),
            distance_to_player: player_pos.distance(&position),
        })
    }
}

#[derive(Debug, Default)]
struct ProjectileSlots {
    position: AttributeSlot,
    direction: AttributeSlot,
    speed: AttributeSlot,
    is_enemy: AttributeSlot,
}

impl ProjectileSlots {
    fn sample(&mut self, projectile: &dyn Subject) -> Option<ProjectileState> {
        // a projectile without a body is not tracked
        let position = self
            .position
            .resolve_vec2(projectile, names::PROJECTILE_POSITION)?;
        Some(ProjectileState {
            position,
            direction: self
                .direction
                .resolve_vec2(projectile, names::PROJECTILE_DIRECTION)
                .unwrap_or(Vec2::ZERO),
            speed: self
                .speed
                .resolve_f64(projectile, names::PROJECTILE_SPEED)
                .unwrap_or(ABSENT),
            is_enemy: self
                .is_enemy
                .resolve_bool(projectile, names::PROJECTILE_ENEMY)
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, Default)]
struct RoomSlots {
    name: AttributeSlot,
    base: AttributeSlot,
    dimensions: AttributeSlot,
    category: AttributeSlot,
    enemies: AttributeSlot,
}

impl RoomSlots {
    fn sample(&mut self, room: &dyn Subject, player_pos: Vec2) -> RoomState {
        let base = self.base.resolve_vec2(room, names::ROOM_BASE).unwrap_or(Vec2::ZERO);
        let dims = self
            .dimensions
            .resolve_vec2(room, names::ROOM_DIMENSIONS)
            .unwrap_or(Vec2::ZERO);
        RoomState {
            room_name: self.name.resolve_string(room, names::ROOM_NAME).unwrap_or_default(),
            base_position: [base.x as i64, base.y as i64],
            dimensions: [dims.x as i64, dims.y as i64],
            is_boss_room: self
                .category
                .resolve_string(room, names::ROOM_CATEGORY)
                .map(|c| c.eq_ignore_ascii_case("BOSS"))
                .unwrap_or(false),
            enemies_remaining: self
                .enemies
                .resolve_with(room, names::ROOM_ENEMIES, |v| match v {
                    Value::List(items) => Some(items.len() as i64),
                    other => coerce(&other, ScalarKind::Int)?.as_i64(),
                })
                .unwrap_or(ABSENT_INT),
            player_relative_position: Vec2::new(
                player_pos.x - base.x.trunc(),
                player_pos.y - base.y.trunc(),
            ),
        }
    }
}

fn objects(value: Value) -> Option<Vec<Arc<dyn Subject>>> {
    match value {
        Value::List(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(o) => Some(o),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Builds snapshots from the host's root subject
#[derive(Debug, Default)]
pub struct Sampler {
    last_sequence: u64,
    location: LocationTracker,
    player_slot: AttributeSlot,
    player: PlayerSlots,
    enemies_slot: AttributeSlot,
    enemy: EnemySlots,
    projectiles_slot: AttributeSlot,
    projectile: ProjectileSlots,
    room_slot: AttributeSlot,
    room: RoomSlots,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence of the most recent snapshot (0 before the first sample)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Last stable location label
    pub fn location(&self) -> &str {
        self.location.stable()
    }

    /// Assemble one snapshot
    ///
    /// Every attribute is resolved independently; a miss leaves that field
    /// at its sentinel. This never fails.
    pub fn sample(&mut self, root: &dyn Subject, realtime: f64) -> Snapshot {
        let mut snapshot = Snapshot::empty(self.last_sequence + 1, realtime);
        snapshot.location = self.location.resolve(root);

        let player = self
            .player_slot
            .resolve_with(root, names::PLAYER, |v| match v {
                Value::Object(o) => Some(o),
                _ => None,
            });

        let player_pos = match &player {
            Some(p) => {
                snapshot.player = self.player.sample(p.as_ref());
                snapshot.player.position.unwrap_or(Vec2::ZERO)
            }
            None => Vec2::ZERO,
        };

        if let Some(enemies) = self.enemies_slot.resolve_with(root, names::ENEMIES, objects) {
            snapshot.enemies = enemies
                .iter()
                .filter_map(|e| self.enemy.sample(e.as_ref(), player_pos))
                .collect();
        }

        if let Some(projectiles) = self
            .projectiles_slot
            .resolve_with(root, names::PROJECTILES, objects)
        {
            snapshot.projectiles = projectiles
                .iter()
                .filter_map(|p| self.projectile.sample(p.as_ref()))
                .collect();
        }

        if let Some(p) = &player {
            let room = self.room_slot.resolve_with(p.as_ref(), names::ROOM, |v| match v {
                Value::Object(o) => Some(o),
                _ => None,
            });
            snapshot.room = room.map(|r| self.room.sample(r.as_ref(), player_pos));
        }

        // committed only once the snapshot is complete
        self.last_sequence = snapshot.sequence;
        tracing::trace!(
            "Sampled #{} at {:.3}s in {}",
            snapshot.sequence,
            snapshot.realtime,
            snapshot.location
        );
        snapshot
    }
}
