//! Benchmarks for the per-tick hot path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gungeon_telemetry::capture::{canonicalize, Value};
use gungeon_telemetry::delivery::DropOldestQueue;
use gungeon_telemetry::types::Vec2;
use gungeon_telemetry::{MapSubject, Sampler};

fn scene(enemies: usize) -> MapSubject {
    let player = MapSubject::new()
        .with_property("CenterPosition", Vec2::new(20.0, 30.0))
        .with_property("Velocity", Vec2::new(1.0, 0.5))
        .with_property(
            "healthHaver",
            MapSubject::new()
                .with_field("currentHealth", 3.0f32)
                .with_field("maximumHealth", 4.0f32),
        )
        .with_property(
            "carriedConsumables",
            MapSubject::new()
                .with_property("Currency", 42)
                .with_property("KeyBullets", 2),
        )
        .with_field("m_currentGunAngle", -45.0f32);

    let enemies: Vec<Value> = (0..enemies)
        .map(|i| {
            MapSubject::new()
                .with_property("EnemyGuid", format!("enemy-{}", i))
                .with_property("CenterPosition", Vec2::new(i as f64, 10.0))
                .into()
        })
        .collect();

    MapSubject::new()
        .with_property(
            "Dungeon",
            MapSubject::new().with_property("DungeonFloorName", "tt_forge"),
        )
        .with_property("PrimaryPlayer", player)
        .with_property("AllEnemies", Value::List(enemies))
}

fn bench_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalize");

    for raw in ["tt_castle", "#CATHEDRAL_SHORTNAME", "<b>tt_unmapped_floor</b>"] {
        group.bench_with_input(BenchmarkId::from_parameter(raw), raw, |b, raw| {
            b.iter(|| canonicalize(black_box(raw)));
        });
    }

    group.finish();
}

fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample");

    for enemies in [0usize, 10, 100].iter() {
        let root = scene(*enemies);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("enemies", enemies), &root, |b, root| {
            let mut sampler = Sampler::new();
            let mut t = 0.0;
            b.iter(|| {
                t += 0.2;
                black_box(sampler.sample(root, t))
            });
        });
    }

    group.finish();
}

fn bench_queue_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("drop_oldest_push");

    for capacity in [256usize, 2048].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            capacity,
            |b, &capacity| {
                let queue = DropOldestQueue::new(capacity);
                let mut i = 0u64;
                b.iter(|| {
                    black_box(queue.push(i));
                    i = i.wrapping_add(1);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_canonicalize, bench_sample, bench_queue_push);
criterion_main!(benches);
