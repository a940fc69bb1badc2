//! Client-side mirror of a match, rebuilt purely from server messages.

use log::{info, warn};
use shared::{CardDefinition, ErrorCode, PlayerSlot, ServerMessage};
use std::collections::HashMap;

/// A unit as the client knows it: static data from `ENTITY_SPAWNED`, live
/// data from the latest `GAME_TICK`.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorUnit {
    pub id: u32,
    pub owner: PlayerSlot,
    pub unit_id: String,
    pub max_hp: u32,
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub state: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub winner_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct MirrorState {
    pub player_id: Option<String>,
    pub deck: Vec<CardDefinition>,
    pub room_id: Option<u32>,
    pub slot: Option<PlayerSlot>,
    pub opponent: Option<String>,
    pub tick: u64,
    pub mana: [f32; 2],
    pub units: HashMap<u32, MirrorUnit>,
    pub towers: HashMap<u32, u32>,
    pub result: Option<MatchResult>,
    pub last_error: Option<ErrorCode>,
}

impl MirrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_match(&self) -> bool {
        self.room_id.is_some() && self.result.is_none()
    }

    pub fn my_mana(&self) -> Option<f32> {
        self.slot.map(|slot| self.mana[slot.index()])
    }

    pub fn units_of(&self, owner: PlayerSlot) -> impl Iterator<Item = &MirrorUnit> {
        self.units.values().filter(move |u| u.owner == owner)
    }

    /// Folds one server message into the mirror.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::LoginSuccess { player, deck } => {
                info!("Logged in as {}", player.id);
                self.player_id = Some(player.id.clone());
                self.deck = deck.clone();
            }

            ServerMessage::QueueJoined { position } => {
                info!("Queued at position {}", position);
            }

            ServerMessage::QueueLeft {} => {
                info!("Left the queue");
            }

            ServerMessage::MatchStart {
                room_id,
                opponent,
                slot,
                ..
            } => {
                info!("Match {} started against {} as slot {}", room_id, opponent, slot.number());
                self.room_id = Some(*room_id);
                self.slot = Some(*slot);
                self.opponent = Some(opponent.clone());
                self.tick = 0;
                self.units.clear();
                self.towers.clear();
                self.result = None;
            }

            ServerMessage::EntitySpawned { entity } => {
                self.units.insert(
                    entity.id,
                    MirrorUnit {
                        id: entity.id,
                        owner: entity.owner,
                        unit_id: entity.unit_id.clone(),
                        max_hp: entity.max_hp,
                        x: entity.x,
                        y: entity.y,
                        hp: entity.max_hp,
                        state: 0,
                    },
                );
            }

            ServerMessage::GameTick {
                tick,
                mana1,
                mana2,
                entities,
                towers,
            } => {
                // Datagrams can arrive out of order; keep the newest snapshot.
                if *tick <= self.tick {
                    return;
                }
                self.tick = *tick;
                self.mana = [*mana1, *mana2];

                let mut seen = Vec::with_capacity(entities.len());
                for entity in entities {
                    seen.push(entity.id);
                    if let Some(unit) = self.units.get_mut(&entity.id) {
                        unit.x = entity.x;
                        unit.y = entity.y;
                        unit.hp = entity.hp;
                        unit.state = entity.state;
                    }
                }
                self.units.retain(|id, _| seen.contains(id));

                for tower in towers {
                    self.towers.insert(tower.id, tower.hp);
                }
            }

            ServerMessage::MatchEnd { winner_id, reason } => {
                info!("Match ended ({}), winner: {:?}", reason, winner_id);
                self.result = Some(MatchResult {
                    winner_id: winner_id.clone(),
                    reason: reason.clone(),
                });
            }

            ServerMessage::Error { code, message } => {
                warn!("Server rejected command: {} ({})", code, message);
                self.last_error = Some(*code);
            }
        }
    }
}
