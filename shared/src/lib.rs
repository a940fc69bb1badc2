//! Wire protocol and map constants shared by the server and the bot client.
//!
//! Every datagram carries one JSON object tagged by `type`. Inbound kinds are
//! [`ClientMessage`], outbound kinds are [`ServerMessage`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub const TICK_RATE: u32 = 20;
pub const MAP_WIDTH: f32 = 30.0;
pub const MAP_HEIGHT: f32 = 40.0;
pub const MAX_MANA: f32 = 10.0;
pub const STARTING_MANA: f32 = 5.0;
pub const MAX_DECK_SIZE: usize = 8;

/// One of the two seats in a match.
///
/// Serialized as the player number (`1` or `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::One, PlayerSlot::Two];

    /// Zero-based index for per-player arrays.
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn opponent(self) -> PlayerSlot {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    /// The half of the map this player may deploy into.
    pub fn deploy_zone(self) -> DeployZone {
        match self {
            PlayerSlot::One => DeployZone {
                min_y: 0.0,
                max_y: 15.0,
            },
            PlayerSlot::Two => DeployZone {
                min_y: 25.0,
                max_y: MAP_HEIGHT,
            },
        }
    }
}

impl From<PlayerSlot> for u8 {
    fn from(slot: PlayerSlot) -> Self {
        slot.number()
    }
}

impl TryFrom<u8> for PlayerSlot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PlayerSlot::One),
            2 => Ok(PlayerSlot::Two),
            other => Err(format!("invalid player slot {}", other)),
        }
    }
}

/// Horizontal band of the map, spanning the full map width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeployZone {
    pub min_y: f32,
    pub max_y: f32,
}

impl DeployZone {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x.is_finite()
            && y.is_finite()
            && (0.0..=MAP_WIDTH).contains(&x)
            && (self.min_y..=self.max_y).contains(&y)
    }
}

/// Rounds to a fixed number of decimal places for compact payloads.
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

/// A deck entry: a unit from the catalog plus the items equipped on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDefinition {
    pub unit_id: String,
    #[serde(default)]
    pub equipment: Vec<String>,
}

impl CardDefinition {
    pub fn new(unit_id: &str, equipment: &[&str]) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            equipment: equipment.iter().map(|item| item.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
}

/// Static per-unit data, sent once when the unit appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnedEntity {
    pub id: u32,
    pub owner: PlayerSlot,
    pub unit_id: String,
    pub max_hp: u32,
    pub x: f32,
    pub y: f32,
}

/// Per-tick unit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub state: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerState {
    pub id: u32,
    pub hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InsufficientMana,
    InvalidPosition,
    InvalidCardIndex,
    CardNotFound,
    GameNotRunning,
    PlayerNotFound,
    RoomNotFound,
    InvalidMessage,
    DeckNotFound,
    AlreadyInMatch,
    SlotTaken,
    DeckTooLarge,
    ServerFull,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InsufficientMana => "INSUFFICIENT_MANA",
            ErrorCode::InvalidPosition => "INVALID_POSITION",
            ErrorCode::InvalidCardIndex => "INVALID_CARD_INDEX",
            ErrorCode::CardNotFound => "CARD_NOT_FOUND",
            ErrorCode::GameNotRunning => "GAME_NOT_RUNNING",
            ErrorCode::PlayerNotFound => "PLAYER_NOT_FOUND",
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::DeckNotFound => "DECK_NOT_FOUND",
            ErrorCode::AlreadyInMatch => "ALREADY_IN_MATCH",
            ErrorCode::SlotTaken => "SLOT_TAKEN",
            ErrorCode::DeckTooLarge => "DECK_TOO_LARGE",
            ErrorCode::ServerFull => "SERVER_FULL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Login {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    QueueJoin {
        #[serde(rename = "deckId", default, skip_serializing_if = "Option::is_none")]
        deck_id: Option<String>,
    },
    QueueLeave {},
    SpawnCard {
        #[serde(rename = "cardIndex")]
        card_index: i64,
        x: f32,
        y: f32,
    },
    Heartbeat {},
    Disconnect {},
}

impl ClientMessage {
    /// Every inbound `type` tag the server understands.
    pub const KINDS: [&'static str; 6] = [
        "LOGIN",
        "QUEUE_JOIN",
        "QUEUE_LEAVE",
        "SPAWN_CARD",
        "HEARTBEAT",
        "DISCONNECT",
    ];

    /// Fields that must be present for a given `type` tag.
    pub fn required_fields(kind: &str) -> &'static [&'static str] {
        match kind {
            "LOGIN" => &["playerId"],
            "SPAWN_CARD" => &["cardIndex", "x", "y"],
            _ => &[],
        }
    }
}

/// Messages emitted by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    LoginSuccess {
        player: PlayerInfo,
        deck: Vec<CardDefinition>,
    },
    QueueJoined {
        position: usize,
    },
    QueueLeft {},
    MatchStart {
        #[serde(rename = "roomId")]
        room_id: u32,
        you: String,
        opponent: String,
        slot: PlayerSlot,
        #[serde(rename = "tickRate")]
        tick_rate: u32,
    },
    EntitySpawned {
        entity: SpawnedEntity,
    },
    GameTick {
        tick: u64,
        mana1: f32,
        mana2: f32,
        entities: Vec<EntityState>,
        towers: Vec<TowerState>,
    },
    MatchEnd {
        #[serde(rename = "winnerId")]
        winner_id: Option<String>,
        reason: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_slot_numbers_and_opponents() {
        assert_eq!(PlayerSlot::One.number(), 1);
        assert_eq!(PlayerSlot::Two.number(), 2);
        assert_eq!(PlayerSlot::One.opponent(), PlayerSlot::Two);
        assert_eq!(PlayerSlot::Two.opponent(), PlayerSlot::One);
        assert!(PlayerSlot::try_from(3).is_err());
    }

    #[test]
    fn test_deploy_zones() {
        let zone1 = PlayerSlot::One.deploy_zone();
        let zone2 = PlayerSlot::Two.deploy_zone();

        assert!(zone1.contains(10.0, 0.0));
        assert!(zone1.contains(10.0, 15.0));
        assert!(!zone1.contains(10.0, 30.0));
        assert!(!zone1.contains(-0.1, 5.0));
        assert!(!zone1.contains(f32::NAN, 5.0));

        assert!(zone2.contains(30.0, 25.0));
        assert!(zone2.contains(0.0, 40.0));
        assert!(!zone2.contains(15.0, 20.0));
    }

    #[test]
    fn test_round_to() {
        assert_approx_eq!(round_to(5.04999, 1), 5.0);
        assert_approx_eq!(round_to(5.05001, 1), 5.1);
        assert_approx_eq!(round_to(12.3456, 2), 12.35);
    }

    #[test]
    fn test_client_message_wire_shape() {
        let login: ClientMessage =
            serde_json::from_str(r#"{"type":"LOGIN","playerId":"alice"}"#).unwrap();
        assert_eq!(
            login,
            ClientMessage::Login {
                player_id: "alice".to_string()
            }
        );

        let join: ClientMessage = serde_json::from_str(r#"{"type":"QUEUE_JOIN"}"#).unwrap();
        assert_eq!(join, ClientMessage::QueueJoin { deck_id: None });

        let spawn: ClientMessage =
            serde_json::from_str(r#"{"type":"SPAWN_CARD","cardIndex":2,"x":10.5,"y":4}"#)
                .unwrap();
        assert_eq!(
            spawn,
            ClientMessage::SpawnCard {
                card_index: 2,
                x: 10.5,
                y: 4.0
            }
        );
    }

    #[test]
    fn test_server_message_wire_shape() {
        let tick = ServerMessage::GameTick {
            tick: 7,
            mana1: 5.5,
            mana2: 6.0,
            entities: vec![EntityState {
                id: 9,
                x: 1.25,
                y: 2.5,
                hp: 100,
                state: 1,
            }],
            towers: vec![TowerState { id: 1, hp: 1400 }],
        };
        let value = serde_json::to_value(&tick).unwrap();
        assert_eq!(value["type"], "GAME_TICK");
        assert_eq!(value["entities"][0]["state"], 1);
        assert_eq!(value["towers"][0]["hp"], 1400);

        let start = ServerMessage::MatchStart {
            room_id: 3,
            you: "a".to_string(),
            opponent: "b".to_string(),
            slot: PlayerSlot::Two,
            tick_rate: TICK_RATE,
        };
        let value = serde_json::to_value(&start).unwrap();
        assert_eq!(value["roomId"], 3);
        assert_eq!(value["slot"], 2);
        assert_eq!(value["tickRate"], 20);
    }

    #[test]
    fn test_error_message_shape() {
        let error = ServerMessage::error(ErrorCode::InsufficientMana, "need 4.0 mana");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["code"], "INSUFFICIENT_MANA");
        assert_eq!(ErrorCode::RoomNotFound.to_string(), "ROOM_NOT_FOUND");
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(ClientMessage::required_fields("LOGIN"), &["playerId"]);
        assert_eq!(
            ClientMessage::required_fields("SPAWN_CARD"),
            &["cardIndex", "x", "y"]
        );
        assert!(ClientMessage::required_fields("QUEUE_LEAVE").is_empty());
    }
}
