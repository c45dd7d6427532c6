//! Test data builders for subject graphs

use gungeon_telemetry::capture::Value;
use gungeon_telemetry::types::Vec2;
use gungeon_telemetry::MapSubject;

/// Builder for a player subject
pub struct PlayerBuilder {
    subject: MapSubject,
    health: MapSubject,
}

impl Default for PlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerBuilder {
    pub fn new() -> Self {
        Self {
            subject: MapSubject::new(),
            health: MapSubject::new(),
        }
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.subject.set_property("CenterPosition", Vec2::new(x, y));
        self
    }

    pub fn velocity(mut self, x: f64, y: f64) -> Self {
        self.subject.set_property("Velocity", Vec2::new(x, y));
        self
    }

    pub fn health(mut self, current: f32, max: f32) -> Self {
        self.health.set_field("currentHealth", current);
        self.health.set_field("maximumHealth", max);
        self
    }

    pub fn angle(mut self, degrees: f32) -> Self {
        self.subject.set_field("m_currentGunAngle", degrees);
        self
    }

    pub fn blanks(mut self, n: i32) -> Self {
        self.subject.set_property("Blanks", n);
        self
    }

    pub fn money(mut self, n: i32) -> Self {
        self.subject.set_property("Currency", n);
        self
    }

    pub fn keys(mut self, n: i32) -> Self {
        self.subject.set_property("KeyBullets", n);
        self
    }

    pub fn room(mut self, room: MapSubject) -> Self {
        self.subject.set_property("CurrentRoom", room);
        self
    }

    pub fn build(mut self) -> MapSubject {
        if !self.health.is_empty() {
            self.subject.set_property("healthHaver", self.health);
        }
        self.subject
    }
}

/// Builder for the root subject of a scene
#[derive(Default)]
pub struct SceneBuilder {
    root: MapSubject,
    enemies: Vec<Value>,
    projectiles: Vec<Value>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Floor name read from `Dungeon.DungeonFloorName`
    pub fn floor(mut self, name: &str) -> Self {
        self.root.set_property(
            "Dungeon",
            MapSubject::new().with_property("DungeonFloorName", name),
        );
        self
    }

    /// Active scene name, the last location fallback
    pub fn scene(mut self, name: &str) -> Self {
        self.root.set_property("ActiveSceneName", name);
        self
    }

    pub fn player(mut self, player: PlayerBuilder) -> Self {
        self.root.set_property("PrimaryPlayer", player.build());
        self
    }

    pub fn enemy(mut self, guid: &str, x: f64, y: f64, dead: bool) -> Self {
        self.enemies.push(
            MapSubject::new()
                .with_property("EnemyGuid", guid)
                .with_property("CenterPosition", Vec2::new(x, y))
                .with_property("IsDead", dead)
                .into(),
        );
        self
    }

    pub fn projectile(mut self, x: f64, y: f64, enemy_owned: bool) -> Self {
        self.projectiles.push(
            MapSubject::new()
                .with_property("Position", Vec2::new(x, y))
                .with_property("Direction", Vec2::new(1.0, 0.0))
                .with_property("Speed", 12.5f32)
                .with_property("IsEnemyOwned", enemy_owned)
                .into(),
        );
        self
    }

    pub fn build(mut self) -> MapSubject {
        if !self.enemies.is_empty() {
            self.root.set_property("AllEnemies", Value::List(self.enemies));
        }
        if !self.projectiles.is_empty() {
            self.root
                .set_property("AllProjectiles", Value::List(self.projectiles));
        }
        self.root
    }
}

/// A room subject with the given base position and category
pub fn room(name: &str, base: (f64, f64), category: &str, enemies: i32) -> MapSubject {
    let area = MapSubject::new()
        .with_field("basePosition", Vec2::new(base.0, base.1))
        .with_field("dimensions", Vec2::new(20.0, 16.0))
        .with_property("PrototypeRoomCategory", category);
    MapSubject::new()
        .with_property("RoomName", name)
        .with_property("area", area)
        .with_property("ActiveEnemyCount", enemies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gungeon_telemetry::Subject;

    #[test]
    fn test_scene_builder() {
        let scene = SceneBuilder::new()
            .floor("tt_castle")
            .player(PlayerBuilder::new().position(1.0, 2.0).room(room("A", (0.0, 0.0), "NORMAL", 0)))
            .enemy("a", 0.0, 0.0, false)
            .build();
        assert!(scene.try_get("Dungeon").is_some());
        assert!(scene.try_get("PrimaryPlayer").is_some());
        assert!(scene.try_get("AllEnemies").is_some());
        assert!(scene.try_get("AllProjectiles").is_none());
    }
}
