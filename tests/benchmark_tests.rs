//! Performance benchmarks for critical simulation systems

use server::catalog::Catalog;
use server::combat;
use server::config::RoomConfig;
use server::entity::{Tower, Unit, UnitStats};
use server::physics::{self, Body, Bounds, Vector2};
use server::protocol::{decode_client_message, encode_server_message, game_tick};
use server::room::{PlayerBinding, RecordingTransport, Room};
use shared::PlayerSlot;
use std::sync::Arc;
use std::time::Instant;

fn stats() -> UnitStats {
    UnitStats {
        current_hp: 500.0,
        max_hp: 500.0,
        damage: 20.0,
        attack_speed: 1.0,
        range: 0.5,
        aggro_range: 5.5,
        move_speed: 1.5,
    }
}

/// A tight crowd of units from both sides around the river.
fn crowd(count: u32) -> Vec<Unit> {
    (0..count)
        .map(|i| {
            let owner = if i % 2 == 0 {
                PlayerSlot::One
            } else {
                PlayerSlot::Two
            };
            let x = 5.0 + (i % 20) as f32;
            let y = 18.0 + (i / 20) as f32 * 0.8;
            Unit::new(7 + i, owner, "bench", Vector2::new(x, y), 0.5, stats())
        })
        .collect()
}

/// Benchmarks pairwise circle separation
#[test]
fn benchmark_separation() {
    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let mut a = Body::new(Vector2::new(10.0, 10.0), 0.5, 1.0);
        let mut b = Body::new(Vector2::new(10.6, 10.0), 0.5, 1.0);
        physics::separate_pair(&mut a, &mut b);
    }

    let duration = start.elapsed();
    println!(
        "Pair separation: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks a full physics step over a crowded map
#[test]
fn benchmark_physics_step() {
    let mut units = crowd(60);
    for unit in &mut units {
        unit.body.steering_target = Some(Vector2::new(15.0, 20.0));
    }

    let bounds = Bounds::default();
    let iterations = 1000;
    let start = Instant::now();

    for _ in 0..iterations {
        physics::step(&mut units, 0.05, &bounds);
    }

    let duration = start.elapsed();
    println!(
        "Physics step: {} units × {} ticks in {:?} ({:.2} μs/tick)",
        units.len(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks the combat resolver with everyone in aggro range
#[test]
fn benchmark_combat_resolve() {
    let mut towers = Tower::standard_layout();
    let iterations = 1000;
    let start = Instant::now();

    for tick in 0..iterations {
        let mut units = crowd(60);
        combat::resolve(&mut units, &mut towers, tick as u64 * 50);
    }

    let duration = start.elapsed();
    println!(
        "Combat resolve: 60 units × {} ticks in {:?}",
        iterations, duration
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Stress test running a room with both players spamming cards
#[test]
fn stress_test_room_ticks() {
    let transport = RecordingTransport::new();
    let catalog = Arc::new(Catalog::builtin());
    let deck = catalog.default_deck().to_vec();
    let mut room = Room::new(
        1,
        RoomConfig {
            mana_regen_per_second: 10.0,
            ..RoomConfig::default()
        },
        catalog,
        Box::new(transport.clone()),
    );
    room.add_player(PlayerSlot::One, PlayerBinding::new("alice", deck.clone()))
        .unwrap();
    room.add_player(PlayerSlot::Two, PlayerBinding::new("bob", deck))
        .unwrap();
    room.start(0);

    let ticks = 2000u64;
    let start = Instant::now();

    for tick in 1..=ticks {
        if tick % 10 == 0 {
            let card = (tick / 10 % 8) as i64;
            let x = 3.0 + (tick % 24) as f32;
            let _ = room.handle_spawn_request(PlayerSlot::One, card, x, 12.0);
            let _ = room.handle_spawn_request(PlayerSlot::Two, card, 30.0 - x, 28.0);
        }
        if !room.tick(tick * 50) {
            break;
        }
        if tick % 100 == 0 {
            transport.clear();
        }
    }

    let duration = start.elapsed();
    println!(
        "Room: {} ticks in {:?}, {} units alive at the end",
        room.tick_count(),
        duration,
        room.units().len()
    );

    // Should complete in under 10 seconds
    assert!(duration.as_millis() < 10_000);
}

/// Benchmarks snapshot encoding and inbound decoding
#[test]
fn benchmark_codec() {
    let transport = RecordingTransport::new();
    let catalog = Arc::new(Catalog::builtin());
    let deck = catalog.default_deck().to_vec();
    let mut room = Room::new(1, RoomConfig::default(), catalog, Box::new(transport));
    room.add_player(PlayerSlot::One, PlayerBinding::new("alice", deck.clone()))
        .unwrap();
    room.add_player(PlayerSlot::Two, PlayerBinding::new("bob", deck))
        .unwrap();
    for i in 0..40 {
        let x = 1.0 + (i % 28) as f32;
        room.spawn_unit(PlayerSlot::One, "knight", x, 10.0, &[]).unwrap();
    }

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = encode_server_message(&game_tick(&room)).unwrap();
        assert!(!bytes.is_empty());
        let command = decode_client_message(br#"{"type":"SPAWN_CARD","cardIndex":3,"x":12.5,"y":8}"#);
        assert!(command.is_ok());
    }

    let duration = start.elapsed();
    println!(
        "Codec: {} snapshot encodes + decodes in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 10 seconds
    assert!(duration.as_millis() < 10_000);
}
