//! Errors reported back to players.
//!
//! Every variant maps to one wire [`ErrorCode`]. None of them is fatal: the
//! connection stays open and the client can correct the command.

use crate::protocol::ProtocolError;
use shared::{ErrorCode, ServerMessage};
use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("card index {index} is outside a deck of {deck_size} cards")]
    InvalidCardIndex { index: i64, deck_size: usize },

    #[error("position ({x}, {y}) is outside your deploy zone")]
    InvalidPosition { x: f32, y: f32 },

    #[error("unit '{0}' is not in the catalog")]
    CardNotFound(String),

    #[error("need {required:.1} mana, have {available:.1}")]
    InsufficientMana { required: f32, available: f32 },

    #[error("the match is not running")]
    GameNotRunning,

    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("no room for player {0}")]
    RoomNotFound(String),

    #[error("deck not found: {0}")]
    DeckNotFound(String),

    #[error("player {0} is already in a match")]
    AlreadyInMatch(String),

    #[error("player slot {0} is already filled")]
    SlotTaken(u8),

    #[error("deck has {size} cards, the limit is {max}")]
    DeckTooLarge { size: usize, max: usize },

    #[error("server is full")]
    ServerFull,

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ProtocolError),
}

impl GameError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GameError::InvalidCardIndex { .. } => ErrorCode::InvalidCardIndex,
            GameError::InvalidPosition { .. } => ErrorCode::InvalidPosition,
            GameError::CardNotFound(_) => ErrorCode::CardNotFound,
            GameError::InsufficientMana { .. } => ErrorCode::InsufficientMana,
            GameError::GameNotRunning => ErrorCode::GameNotRunning,
            GameError::PlayerNotFound(_) => ErrorCode::PlayerNotFound,
            GameError::RoomNotFound(_) => ErrorCode::RoomNotFound,
            GameError::DeckNotFound(_) => ErrorCode::DeckNotFound,
            GameError::AlreadyInMatch(_) => ErrorCode::AlreadyInMatch,
            GameError::SlotTaken(_) => ErrorCode::SlotTaken,
            GameError::DeckTooLarge { .. } => ErrorCode::DeckTooLarge,
            GameError::ServerFull => ErrorCode::ServerFull,
            GameError::InvalidMessage(_) => ErrorCode::InvalidMessage,
        }
    }

    /// Builds the outbound `ERROR` message.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::error(self.code(), self.to_string())
    }
}
