//! Wire codec: validates inbound datagrams and builds compact outbound payloads.
//!
//! Inbound datagrams are checked structurally (JSON object, known `type`,
//! required fields present) before they are typed, so each failure produces a
//! specific [`ProtocolError`] instead of a generic parse error.

use crate::entity::{Tower, Unit};
use crate::room::Room;
use crate::utils::wire_hp;
use serde_json::Value;
use shared::{round_to, ClientMessage, EntityState, PlayerSlot, ServerMessage, TowerState};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("unknown message type '{0}'")]
    UnknownKind(String),
    #[error("{kind} is missing required field '{field}'")]
    MissingField { kind: String, field: String },
}

/// Decodes and validates one inbound datagram.
pub fn decode_client_message(bytes: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ProtocolError::Malformed("expected a JSON object".to_string()))?;

    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => {
            return Err(ProtocolError::Malformed(
                "'type' must be a string".to_string(),
            ))
        }
        None => {
            return Err(ProtocolError::MissingField {
                kind: "message".to_string(),
                field: "type".to_string(),
            })
        }
    };

    if !ClientMessage::KINDS.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownKind(kind));
    }

    for field in ClientMessage::required_fields(&kind) {
        if object.get(*field).map_or(true, Value::is_null) {
            return Err(ProtocolError::MissingField {
                kind,
                field: field.to_string(),
            });
        }
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

pub fn encode_server_message(message: &ServerMessage) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}

pub fn entity_state(unit: &Unit) -> EntityState {
    let position = unit.position();
    EntityState {
        id: unit.id,
        x: round_to(position.x, 2),
        y: round_to(position.y, 2),
        hp: wire_hp(unit.stats.current_hp),
        state: unit.state.code(),
    }
}

pub fn tower_state(tower: &Tower) -> TowerState {
    TowerState {
        id: tower.id,
        hp: wire_hp(tower.hp),
    }
}

/// The recurring per-tick payload for a room.
pub fn game_tick(room: &Room) -> ServerMessage {
    ServerMessage::GameTick {
        tick: room.tick_count(),
        mana1: round_to(room.mana(PlayerSlot::One), 1),
        mana2: round_to(room.mana(PlayerSlot::Two), 1),
        entities: room.units().iter().map(entity_state).collect(),
        towers: room.towers().iter().map(tower_state).collect(),
    }
}

/// One-shot metadata for a freshly spawned unit.
pub fn entity_spawned(unit: &Unit) -> ServerMessage {
    ServerMessage::EntitySpawned {
        entity: unit.spawned_entity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{UnitState, UnitStats};
    use crate::physics::Vector2;

    #[test]
    fn test_decode_valid_messages() {
        assert_eq!(
            decode_client_message(br#"{"type":"LOGIN","playerId":"p1"}"#),
            Ok(ClientMessage::Login {
                player_id: "p1".to_string()
            })
        );
        assert_eq!(
            decode_client_message(br#"{"type":"QUEUE_JOIN","deckId":"armored"}"#),
            Ok(ClientMessage::QueueJoin {
                deck_id: Some("armored".to_string())
            })
        );
        assert_eq!(
            decode_client_message(br#"{"type":"QUEUE_LEAVE"}"#),
            Ok(ClientMessage::QueueLeave {})
        );
        assert_eq!(
            decode_client_message(br#"{"type":"SPAWN_CARD","cardIndex":-1,"x":3,"y":4.5}"#),
            Ok(ClientMessage::SpawnCard {
                card_index: -1,
                x: 3.0,
                y: 4.5
            })
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_client_message(b"\xff\x00garbage"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_client_message(b"[1,2,3]"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_client_message(br#"{"type":7}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_unknown_kind() {
        assert_eq!(
            decode_client_message(br#"{"type":"TELEPORT","x":1}"#),
            Err(ProtocolError::UnknownKind("TELEPORT".to_string()))
        );
    }

    #[test]
    fn test_decode_missing_fields() {
        assert_eq!(
            decode_client_message(br#"{"playerId":"p1"}"#),
            Err(ProtocolError::MissingField {
                kind: "message".to_string(),
                field: "type".to_string()
            })
        );
        assert_eq!(
            decode_client_message(br#"{"type":"SPAWN_CARD","cardIndex":1,"x":3}"#),
            Err(ProtocolError::MissingField {
                kind: "SPAWN_CARD".to_string(),
                field: "y".to_string()
            })
        );
        assert_eq!(
            decode_client_message(br#"{"type":"LOGIN","playerId":null}"#),
            Err(ProtocolError::MissingField {
                kind: "LOGIN".to_string(),
                field: "playerId".to_string()
            })
        );
    }

    #[test]
    fn test_decode_wrong_field_type() {
        assert!(matches!(
            decode_client_message(br#"{"type":"SPAWN_CARD","cardIndex":"two","x":3,"y":4}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_entity_state_rounding() {
        let mut unit = Unit::new(
            12,
            PlayerSlot::Two,
            "archer",
            Vector2::new(4.12345, 27.005001),
            0.4,
            UnitStats {
                current_hp: 249.2,
                max_hp: 250.0,
                damage: 50.0,
                attack_speed: 1.1,
                range: 5.0,
                aggro_range: 6.5,
                move_speed: 1.5,
            },
        );
        unit.state = UnitState::Cooldown;

        let state = entity_state(&unit);
        assert_eq!(state.id, 12);
        assert_eq!(state.x, 4.12);
        assert_eq!(state.y, 27.01);
        assert_eq!(state.hp, 250);
        assert_eq!(state.state, 3);
    }

    #[test]
    fn test_encode_produces_tagged_json() {
        let bytes = encode_server_message(&ServerMessage::QueueJoined { position: 1 }).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "QUEUE_JOINED");
        assert_eq!(value["position"], 1);
    }
}
