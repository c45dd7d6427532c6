//! Headless telemetry runner
//!
//! Drives a synthetic scene through the [`Tracker`] at roughly 60 frames per
//! second, exercising the durable log, the optional HTTP push and the stream
//! server without a game attached.
//!
//! ```text
//! gungeon-telemetry [config.toml]
//! ```

use anyhow::Context;
use gungeon_telemetry::{
    capture::Value, config::TelemetryConfig, types::Vec2, MapSubject, Tracker,
};
use std::time::{Duration, Instant};

/// Frame length of the synthetic host loop
const FRAME: Duration = Duration::from_micros(16_667);

/// Floors the synthetic player walks through, with a loading screen between each
const FLOORS: &[&str] = &["tt_castle", "tt_sewer", "tt5", "tt_mines", "tt_catacombs", "tt_forge"];

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => TelemetryConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => TelemetryConfig::default(),
    };
    let run_for = Duration::from_secs(config.demo_seconds);

    let mut tracker = Tracker::new(config);
    tracker.init().context("Failed to start telemetry")?;

    tracing::info!("Running synthetic scene for {:?}", run_for);
    if let Some(path) = tracker.pipeline().and_then(|p| p.log_path()) {
        tracing::info!("Writing records to {:?}", path);
    }
    if let Some(server) = tracker.stream() {
        tracing::info!("Stream clients can connect to {}", server.local_addr());
    }

    let mut scene = DemoScene::default();
    let deadline = Instant::now() + run_for;
    let mut frames = 0u64;
    while Instant::now() < deadline {
        let root = scene.step(FRAME.as_secs_f64());
        tracker.on_tick(&root, FRAME);

        frames += 1;
        if frames % 600 == 0 {
            tracker.mark(format!("frame {}", frames));
        }
        std::thread::sleep(FRAME);
    }

    tracker.shutdown();

    if let Some(stats) = tracker.delivery_stats() {
        tracing::info!(
            "Delivery: {} enqueued, {} written, {} dropped, {} pushed, {} push failures",
            stats.enqueued,
            stats.written,
            stats.dropped,
            stats.pushed,
            stats.push_failed
        );
    }
    tracing::info!(
        "Done after {} frames, last snapshot #{} in {}",
        frames,
        tracker.last_sequence(),
        tracker.location()
    );
    Ok(())
}

/// A player circling a room while floors change every few seconds
#[derive(Debug, Default)]
struct DemoScene {
    time: f64,
}

impl DemoScene {
    const FLOOR_SECONDS: f64 = 4.0;
    const LOADING_SECONDS: f64 = 0.5;

    fn step(&mut self, dt: f64) -> MapSubject {
        self.time += dt;
        let t = self.time;

        let phase = t % Self::FLOOR_SECONDS;
        let floor_index = (t / Self::FLOOR_SECONDS) as usize % FLOORS.len();
        let floor_name = if phase < Self::LOADING_SECONDS {
            "Loading Dungeon"
        } else {
            FLOORS[floor_index]
        };

        let position = Vec2::new(20.0 + 5.0 * t.cos(), 30.0 + 5.0 * t.sin());
        let velocity = Vec2::new(-5.0 * t.sin(), 5.0 * t.cos());
        let health = (6.0 - (t / 3.0).floor() * 0.5).max(0.5);

        let health_haver = MapSubject::new()
            .with_field("currentHealth", health as f32)
            .with_field("maximumHealth", 6.0f32)
            .with_property("Armor", 1.0f32);
        let consumables = MapSubject::new()
            .with_property("Currency", (t * 2.0) as i32)
            .with_property("KeyBullets", 1);
        let gun = MapSubject::new()
            .with_property("PickupObjectId", 86)
            .with_property("CurrentAmmo", 100 - (t as i32 % 100));
        let room = MapSubject::new()
            .with_property("RoomName", "Demo Chamber")
            .with_property(
                "area",
                MapSubject::new()
                    .with_field("basePosition", Vec2::new(10.0, 20.0))
                    .with_field("dimensions", Vec2::new(24.0, 20.0))
                    .with_property("PrototypeRoomCategory", "NORMAL"),
            )
            .with_property("ActiveEnemyCount", 2);

        let player = MapSubject::new()
            .with_property("CenterPosition", position)
            .with_property("Velocity", velocity)
            .with_property("healthHaver", health_haver)
            .with_property("carriedConsumables", consumables)
            .with_property("Blanks", 2)
            .with_field("m_currentGunAngle", ((t * 90.0) % 720.0 - 360.0) as f32)
            .with_property("IsDodgeRolling", phase.fract() < 0.1)
            .with_property("CurrentGun", gun)
            .with_property(
                "passiveItems",
                Value::List(vec![MapSubject::new().with_property("PickupObjectId", 120).into()]),
            )
            .with_property("CurrentRoom", room);

        let enemies: Vec<Value> = (0..2)
            .map(|i| {
                let angle = t + i as f64 * std::f64::consts::PI;
                MapSubject::new()
                    .with_property("EnemyGuid", format!("demo-enemy-{}", i))
                    .with_property(
                        "CenterPosition",
                        Vec2::new(22.0 + 3.0 * angle.cos(), 30.0 + 3.0 * angle.sin()),
                    )
                    .with_property(
                        "healthHaver",
                        MapSubject::new()
                            .with_field("currentHealth", 15.0f32)
                            .with_field("maximumHealth", 15.0f32),
                    )
                    .into()
            })
            .collect();

        MapSubject::new()
            .with_property("Dungeon", MapSubject::new().with_property("DungeonFloorName", floor_name))
            .with_property("PrimaryPlayer", player)
            .with_property("AllEnemies", Value::List(enemies))
    }
}
