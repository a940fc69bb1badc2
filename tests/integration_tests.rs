//! Integration tests for the lane battle server
//!
//! These tests drive the simulation core, the codec, the session directory and
//! the real UDP server together.

use assert_approx_eq::assert_approx_eq;
use server::catalog::Catalog;
use server::config::{RoomConfig, ServerConfig};
use server::entity::{Target, UnitState};
use server::room::{Delivery, PlayerBinding, RecordingTransport, Room, StopReason};
use shared::{ErrorCode, PlayerSlot, ServerMessage};
use std::sync::Arc;
use std::time::Duration;

/// Catalog with units tuned for deterministic scenarios.
fn scenario_catalog() -> Arc<Catalog> {
    let json = r#"{
        "units": [
            {"id": "scout", "cost": 2, "hp": 300, "damage": 10, "attackSpeed": 1,
             "range": 0.5, "aggroRange": 10, "moveSpeed": 1, "radius": 0.5},
            {"id": "dummy", "cost": 1, "hp": 50, "damage": 0, "attackSpeed": 1,
             "range": 0.5, "aggroRange": 0.1, "moveSpeed": 0.5, "radius": 0.5},
            {"id": "wrecker", "cost": 9, "hp": 1000, "damage": 5000, "attackSpeed": 1,
             "range": 0.5, "aggroRange": 3, "moveSpeed": 1, "radius": 0.5}
        ],
        "items": [{"id": "plate", "weight": 1.5, "modifiers": {"hp": 100}}],
        "decks": [{"id": "scenario", "cards": [
            {"unitId": "scout"},
            {"unitId": "scout", "equipment": ["plate"]},
            {"unitId": "dummy"}
        ]}],
        "defaultDeck": "scenario"
    }"#;
    Arc::new(Catalog::from_json_str(json).unwrap())
}

fn started_room(catalog: Arc<Catalog>) -> (Room, RecordingTransport) {
    let transport = RecordingTransport::new();
    let deck = catalog.default_deck().to_vec();
    let mut room = Room::new(
        1,
        RoomConfig::default(),
        catalog,
        Box::new(transport.clone()),
    );
    room.add_player(PlayerSlot::One, PlayerBinding::new("alice", deck.clone()))
        .unwrap();
    room.add_player(PlayerSlot::Two, PlayerBinding::new("bob", deck))
        .unwrap();
    assert!(room.start(0));
    (room, transport)
}

fn last_game_tick(transport: &RecordingTransport) -> ServerMessage {
    transport
        .deliveries()
        .into_iter()
        .rev()
        .find_map(|delivery| match delivery {
            Delivery::Broadcast(message @ ServerMessage::GameTick { .. }) => Some(message),
            _ => None,
        })
        .expect("no game tick was broadcast")
}

/// MATCH RULE TESTS
mod room_tests {
    use super::*;

    #[test]
    fn mana_after_one_second_of_ticks() {
        let (mut room, transport) = started_room(scenario_catalog());

        for tick in 1..=20 {
            room.tick(tick * 50);
        }

        assert_approx_eq!(room.mana(PlayerSlot::One), 6.0, 1e-4);
        match last_game_tick(&transport) {
            ServerMessage::GameTick { mana1, mana2, .. } => {
                assert_eq!(mana1, 6.0);
                assert_eq!(mana2, 6.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn valid_spawn_charges_base_cost_plus_equipment() {
        let (mut room, _) = started_room(scenario_catalog());

        let id = tokio_test::assert_ok!(room.handle_spawn_request(PlayerSlot::One, 1, 12.0, 8.0));

        assert_approx_eq!(room.mana(PlayerSlot::One), 5.0 - 3.5);
        let unit = room.unit(id).unwrap();
        assert_eq!(unit.stats.max_hp, 400.0);
        assert_eq!(unit.state, UnitState::Idle);
    }

    #[test]
    fn spawn_in_enemy_half_changes_nothing() {
        let (mut room, transport) = started_room(scenario_catalog());
        transport.clear();

        let result = room.handle_spawn_request(PlayerSlot::One, 0, 10.0, 30.0);

        assert_eq!(result.unwrap_err().code(), ErrorCode::InvalidPosition);
        assert_eq!(room.mana(PlayerSlot::One), 5.0);
        assert!(room.units().is_empty());
        assert_eq!(
            transport.deliveries(),
            vec![Delivery::ToPlayer(
                "alice".to_string(),
                ServerMessage::error(
                    ErrorCode::InvalidPosition,
                    "position (10, 30) is outside your deploy zone"
                )
            )]
        );
    }

    #[test]
    fn enemy_entering_aggro_range_preempts_tower() {
        let (mut room, _) = started_room(scenario_catalog());

        let scout = room
            .spawn_unit(PlayerSlot::One, "scout", 10.0, 15.0, &[])
            .unwrap();
        room.tick(50);
        assert!(matches!(
            room.unit(scout).unwrap().target,
            Some(Target::Tower(_))
        ));

        let dummy = room
            .spawn_unit(PlayerSlot::Two, "dummy", 10.0, 25.0, &[])
            .unwrap();
        room.tick(100);

        assert_eq!(room.unit(scout).unwrap().target, Some(Target::Unit(dummy)));
        assert_eq!(room.unit(scout).unwrap().state, UnitState::Moving);
    }

    #[test]
    fn killed_unit_is_absent_from_snapshot() {
        let (mut room, transport) = started_room(scenario_catalog());

        room.spawn_unit(PlayerSlot::One, "wrecker", 10.0, 20.0, &[])
            .unwrap();
        let victim = room
            .spawn_unit(PlayerSlot::Two, "dummy", 10.0, 21.2, &[])
            .unwrap();
        room.tick(50);

        assert!(room.unit(victim).is_none());
        match last_game_tick(&transport) {
            ServerMessage::GameTick { entities, .. } => {
                assert!(entities.iter().all(|e| e.id != victim));
                assert_eq!(entities.len(), 1);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn core_destruction_ends_match_immediately() {
        let (mut room, transport) = started_room(scenario_catalog());

        room.spawn_unit(PlayerSlot::One, "wrecker", 15.0, 35.3, &[])
            .unwrap();
        assert!(room.tick(50));

        assert!(!room.is_running());
        assert_eq!(
            room.outcome(),
            Some(StopReason::CoreDestroyed {
                winner: PlayerSlot::One
            })
        );
        match transport.deliveries().last() {
            Some(Delivery::Broadcast(ServerMessage::MatchEnd { winner_id, reason })) => {
                assert_eq!(winner_id.as_deref(), Some("alice"));
                assert_eq!(reason, "core_destroyed");
            }
            other => panic!("expected MATCH_END, got {:?}", other),
        }
        match last_game_tick(&transport) {
            ServerMessage::GameTick { towers, .. } => {
                assert!(towers.iter().any(|t| t.id == 6 && t.hp == 0));
            }
            _ => unreachable!(),
        }

        assert!(!room.tick(100));
    }

    #[test]
    fn identical_inputs_produce_identical_snapshots() {
        let run = || {
            let (mut room, transport) = started_room(Arc::new(Catalog::builtin()));
            room.handle_spawn_request(PlayerSlot::One, 0, 14.0, 14.0).unwrap();
            room.handle_spawn_request(PlayerSlot::One, 3, 14.2, 14.1).unwrap();
            room.handle_spawn_request(PlayerSlot::Two, 1, 15.0, 26.0).unwrap();
            for tick in 1..=200 {
                room.tick(tick * 50);
            }
            last_game_tick(&transport)
        };

        assert_eq!(run(), run());
    }
}

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;
    use server::error::GameError;
    use server::protocol::{decode_client_message, encode_server_message, game_tick};

    #[test]
    fn game_tick_wire_shape() {
        let (mut room, _) = started_room(scenario_catalog());
        room.spawn_unit(PlayerSlot::One, "scout", 10.123, 5.0, &[])
            .unwrap();
        room.tick(50);

        let bytes = encode_server_message(&game_tick(&room)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "GAME_TICK");
        assert_eq!(value["tick"], 1);
        assert_eq!(value["towers"].as_array().unwrap().len(), 6);
        let entity = &value["entities"][0];
        assert_eq!(entity["id"], 7);
        assert_eq!(entity["hp"], 300);
        assert!(entity.get("unitId").is_none());
    }

    #[test]
    fn malformed_input_maps_to_invalid_message() {
        for datagram in [
            &b"not json"[..],
            br#"{"type":"LAUNCH"}"#,
            br#"{"type":"SPAWN_CARD","x":1,"y":2}"#,
        ] {
            let error = GameError::from(decode_client_message(datagram).unwrap_err());
            match error.to_message() {
                ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidMessage),
                other => panic!("Unexpected message {:?}", other),
            }
        }
    }
}

/// END-TO-END SERVER TESTS
mod server_tests {
    use super::*;
    use client::game::MirrorState;
    use server::network::Server;
    use shared::ClientMessage;
    use std::net::SocketAddr;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    async fn send(socket: &UdpSocket, server: SocketAddr, message: &ClientMessage) {
        let data = serde_json::to_vec(message).unwrap();
        socket.send_to(&data, server).await.unwrap();
    }

    /// Reads messages until one matches, skipping the rest.
    async fn wait_for<F>(socket: &UdpSocket, mut matches: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        let mut buffer = [0u8; 65536];
        timeout(Duration::from_secs(5), async {
            loop {
                let (len, _) = socket.recv_from(&mut buffer).await.unwrap();
                let message: ServerMessage = serde_json::from_slice(&buffer[..len]).unwrap();
                if matches(&message) {
                    return message;
                }
            }
        })
        .await
        .expect("timed out waiting for server message")
    }

    async fn start_server() -> SocketAddr {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };
        let mut server = Server::new(config, RoomConfig::default(), Arc::new(Catalog::builtin()))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        addr
    }

    #[tokio::test]
    async fn invalid_datagram_gets_error_reply() {
        let server = start_server().await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        socket.send_to(b"{\"type\":", server).await.unwrap();

        let reply = wait_for(&socket, |_| true).await;
        assert!(matches!(
            reply,
            ServerMessage::Error {
                code: ErrorCode::InvalidMessage,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn queue_before_login_is_rejected() {
        let server = start_server().await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        send(&socket, server, &ClientMessage::QueueJoin { deck_id: None }).await;

        let reply = wait_for(&socket, |_| true).await;
        assert!(matches!(
            reply,
            ServerMessage::Error {
                code: ErrorCode::PlayerNotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn two_clients_play_a_match() {
        let server = start_server().await;
        let alice = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bob = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        for (socket, id) in [(&alice, "alice"), (&bob, "bob")] {
            send(
                socket,
                server,
                &ClientMessage::Login {
                    player_id: id.to_string(),
                },
            )
            .await;
            match wait_for(socket, |_| true).await {
                ServerMessage::LoginSuccess { player, deck } => {
                    assert_eq!(player.id, id);
                    assert_eq!(deck.len(), 8);
                }
                other => panic!("Unexpected reply {:?}", other),
            }
            send(socket, server, &ClientMessage::QueueJoin { deck_id: None }).await;
        }

        let start = wait_for(&bob, |m| matches!(m, ServerMessage::MatchStart { .. })).await;
        let mut mirror = MirrorState::new();
        mirror.apply(&start);
        assert_eq!(mirror.slot, Some(PlayerSlot::Two));

        let start = wait_for(&alice, |m| matches!(m, ServerMessage::MatchStart { .. })).await;
        match start {
            ServerMessage::MatchStart {
                you,
                opponent,
                slot,
                tick_rate,
                ..
            } => {
                assert_eq!(you, "alice");
                assert_eq!(opponent, "bob");
                assert_eq!(slot, PlayerSlot::One);
                assert_eq!(tick_rate, 20);
            }
            _ => unreachable!(),
        }

        send(
            &alice,
            server,
            &ClientMessage::SpawnCard {
                card_index: 0,
                x: 10.0,
                y: 10.0,
            },
        )
        .await;

        let spawned =
            wait_for(&bob, |m| matches!(m, ServerMessage::EntitySpawned { .. })).await;
        mirror.apply(&spawned);
        assert_eq!(mirror.units_of(PlayerSlot::One).count(), 1);
        match spawned {
            ServerMessage::EntitySpawned { entity } => {
                assert_eq!(entity.owner, PlayerSlot::One);
                assert_eq!(entity.unit_id, "knight");
            }
            _ => unreachable!(),
        }

        send(&alice, server, &ClientMessage::Disconnect {}).await;
        let end = wait_for(&bob, |m| matches!(m, ServerMessage::MatchEnd { .. })).await;
        assert_eq!(
            end,
            ServerMessage::MatchEnd {
                winner_id: Some("bob".to_string()),
                reason: "forfeit".to_string()
            }
        );
    }
}
