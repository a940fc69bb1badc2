//! Session directory: logged-in players, the matchmaking queue and the rooms
//! they end up in.
//!
//! The directory is owned by the network loop and driven one command at a
//! time. Pairing is strictly first-in first-out: the two longest-waiting
//! players are put into a room as soon as they are both queued.

use crate::catalog::Catalog;
use crate::config::RoomConfig;
use crate::error::{GameError, Result};
use crate::protocol::ProtocolError;
use crate::room::{
    spawn_room, PlayerBinding, RecordingTransport, Room, RoomCommand, RoomEvent, RoomHandle,
    RoomId, StopReason, Transport,
};
use log::info;
use shared::{CardDefinition, PlayerInfo, PlayerSlot, ServerMessage};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound seam of the directory: direct replies to players, and a
/// transport for each room it creates.
pub trait Outbox: Send + Sync {
    fn send_to(&self, player_id: &str, message: &ServerMessage);
    fn room_transport(&self, players: [String; 2]) -> Box<dyn Transport>;
}

impl Outbox for RecordingTransport {
    fn send_to(&self, player_id: &str, message: &ServerMessage) {
        Transport::send_to(self, player_id, message);
    }

    fn room_transport(&self, _players: [String; 2]) -> Box<dyn Transport> {
        Box::new(self.clone())
    }
}

#[derive(Debug)]
struct QueuedPlayer {
    player_id: String,
    deck: Vec<CardDefinition>,
}

pub struct SessionDirectory {
    catalog: Arc<Catalog>,
    room_config: RoomConfig,
    outbox: Box<dyn Outbox>,
    room_events: mpsc::UnboundedSender<RoomEvent>,
    logged_in: HashSet<String>,
    queue: VecDeque<QueuedPlayer>,
    rooms: HashMap<RoomId, RoomHandle>,
    player_rooms: HashMap<String, RoomId>,
    next_room_id: RoomId,
}

impl SessionDirectory {
    pub fn new(
        catalog: Arc<Catalog>,
        room_config: RoomConfig,
        outbox: Box<dyn Outbox>,
        room_events: mpsc::UnboundedSender<RoomEvent>,
    ) -> Self {
        Self {
            catalog,
            room_config,
            outbox,
            room_events,
            logged_in: HashSet::new(),
            queue: VecDeque::new(),
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            next_room_id: 1,
        }
    }

    /// Registers a player and returns the `LOGIN_SUCCESS` reply.
    ///
    /// Logging in again under the same id is allowed and changes nothing.
    pub fn login(&mut self, player_id: &str) -> Result<ServerMessage> {
        if player_id.trim().is_empty() {
            return Err(ProtocolError::Malformed("playerId must not be empty".to_string()).into());
        }

        if self.logged_in.insert(player_id.to_string()) {
            info!("Player {} logged in", player_id);
        }

        Ok(ServerMessage::LoginSuccess {
            player: PlayerInfo {
                id: player_id.to_string(),
            },
            deck: self.catalog.default_deck().to_vec(),
        })
    }

    pub fn is_logged_in(&self, player_id: &str) -> bool {
        self.logged_in.contains(player_id)
    }

    /// Queues a player with the chosen deck and pairs the queue head.
    ///
    /// Returns the player's 1-based queue position as reported in
    /// `QUEUE_JOINED`.
    pub fn join_queue(&mut self, player_id: &str, deck_id: Option<&str>) -> Result<usize> {
        if !self.is_logged_in(player_id) {
            return Err(GameError::PlayerNotFound(player_id.to_string()));
        }
        if self.player_rooms.contains_key(player_id) {
            return Err(GameError::AlreadyInMatch(player_id.to_string()));
        }

        let deck = self
            .catalog
            .deck(deck_id)
            .ok_or_else(|| GameError::DeckNotFound(deck_id.unwrap_or_default().to_string()))?
            .cards
            .clone();

        let position = match self.queue_position(player_id) {
            Some(position) => {
                self.queue[position - 1].deck = deck;
                position
            }
            None => {
                self.queue.push_back(QueuedPlayer {
                    player_id: player_id.to_string(),
                    deck,
                });
                info!("Player {} queued at position {}", player_id, self.queue.len());
                self.queue.len()
            }
        };

        self.outbox
            .send_to(player_id, &ServerMessage::QueueJoined { position });
        self.pair_waiting_players()?;
        Ok(position)
    }

    /// Removes a player from the queue. Leaving when not queued is a no-op.
    pub fn leave_queue(&mut self, player_id: &str) -> Result<()> {
        if !self.is_logged_in(player_id) {
            return Err(GameError::PlayerNotFound(player_id.to_string()));
        }
        if let Some(position) = self.queue_position(player_id) {
            self.queue.remove(position - 1);
            info!("Player {} left the queue", player_id);
        }
        self.outbox.send_to(player_id, &ServerMessage::QueueLeft {});
        Ok(())
    }

    fn queue_position(&self, player_id: &str) -> Option<usize> {
        self.queue
            .iter()
            .position(|queued| queued.player_id == player_id)
            .map(|index| index + 1)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn pair_waiting_players(&mut self) -> Result<()> {
        while self.queue.len() >= 2 {
            let (Some(first), Some(second)) = (self.queue.pop_front(), self.queue.pop_front()) else {
                break;
            };
            self.create_room(first, second)?;
        }
        Ok(())
    }

    fn create_room(&mut self, first: QueuedPlayer, second: QueuedPlayer) -> Result<RoomId> {
        let room_id = self.next_room_id;
        self.next_room_id += 1;

        let players = [first.player_id.clone(), second.player_id.clone()];
        let transport = self.outbox.room_transport(players.clone());
        let mut room = Room::new(
            room_id,
            self.room_config.clone(),
            Arc::clone(&self.catalog),
            transport,
        );
        room.add_player(
            PlayerSlot::One,
            PlayerBinding::new(&first.player_id, first.deck),
        )?;
        room.add_player(
            PlayerSlot::Two,
            PlayerBinding::new(&second.player_id, second.deck),
        )?;

        info!(
            "Room {} created for {} vs {}",
            room_id, players[0], players[1]
        );

        for player_id in &players {
            self.player_rooms.insert(player_id.clone(), room_id);
        }
        self.rooms
            .insert(room_id, spawn_room(room, self.room_events.clone()));
        Ok(room_id)
    }

    pub fn room_of(&self, player_id: &str) -> Option<RoomId> {
        self.player_rooms.get(player_id).copied()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Forwards a card play to the player's room.
    pub fn route_spawn(&self, player_id: &str, card_index: i64, x: f32, y: f32) -> Result<()> {
        if !self.is_logged_in(player_id) {
            return Err(GameError::PlayerNotFound(player_id.to_string()));
        }
        let room = self
            .room_of(player_id)
            .and_then(|room_id| self.rooms.get(&room_id))
            .ok_or_else(|| GameError::RoomNotFound(player_id.to_string()))?;

        let delivered = room.send(RoomCommand::Spawn {
            player_id: player_id.to_string(),
            card_index,
            x,
            y,
        });
        if delivered {
            Ok(())
        } else {
            Err(GameError::GameNotRunning)
        }
    }

    /// Forgets a player. A match in progress is forfeited to the opponent.
    pub fn disconnect(&mut self, player_id: &str) {
        if let Some(position) = self.queue_position(player_id) {
            self.queue.remove(position - 1);
        }
        self.logged_in.remove(player_id);

        if let Some(room) = self
            .player_rooms
            .remove(player_id)
            .and_then(|room_id| self.rooms.get(&room_id))
        {
            let winner = if room.players[0] == player_id {
                PlayerSlot::Two
            } else {
                PlayerSlot::One
            };
            info!("Player {} left room {}, forfeiting", player_id, room.id);
            room.stop(StopReason::Forfeit { winner });
        }

        info!("Player {} disconnected", player_id);
    }

    /// Drops bookkeeping for a room whose task has exited.
    pub fn room_closed(&mut self, room_id: RoomId) {
        if let Some(room) = self.rooms.remove(&room_id) {
            for player_id in &room.players {
                if self.player_rooms.get(player_id) == Some(&room_id) {
                    self.player_rooms.remove(player_id);
                }
            }
            info!("Room {} closed", room_id);
        }
    }

    /// Stops every room and waits for their tasks to exit.
    pub async fn shutdown(&mut self) {
        self.queue.clear();
        self.player_rooms.clear();
        for (_, room) in self.rooms.drain() {
            room.stop(StopReason::Shutdown);
            room.join().await;
        }
    }
}
