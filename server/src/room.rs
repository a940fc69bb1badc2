//! One 2-player match: mana economy, towers, spawn validation, the tick
//! pipeline and the win condition.
//!
//! [`Room`] itself is synchronous and clock-agnostic: callers pass the current
//! time into [`Room::start`] and [`Room::tick`]. [`spawn_room`] wraps a room in
//! a tokio task that owns its timer, so ticks of one room never overlap and
//! rooms never share mutable state.

use crate::catalog::Catalog;
use crate::combat;
use crate::config::RoomConfig;
use crate::entity::{EntityId, Tower, TowerKind, Unit};
use crate::error::{GameError, Result};
use crate::physics::{self, Bounds, Vector2};
use crate::protocol;
use crate::utils::get_timestamp;
use log::{debug, info, warn};
use shared::{CardDefinition, PlayerSlot, ServerMessage, MAX_DECK_SIZE};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub type RoomId = u32;

/// Outbound seam of a room. Production wiring forwards to the network layer.
pub trait Transport: Send {
    /// Delivers to both players of the room.
    fn broadcast(&self, message: &ServerMessage);
    fn send_to(&self, player_id: &str, message: &ServerMessage);
}

/// What was delivered through a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Broadcast(ServerMessage),
    ToPlayer(String, ServerMessage),
}

/// In-memory transport that records every delivery. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    log: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages a given player received, broadcasts included.
    pub fn received_by(&self, player_id: &str) -> Vec<ServerMessage> {
        self.deliveries()
            .into_iter()
            .filter_map(|delivery| match delivery {
                Delivery::Broadcast(message) => Some(message),
                Delivery::ToPlayer(to, message) if to == player_id => Some(message),
                Delivery::ToPlayer(..) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn push(&self, delivery: Delivery) {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(delivery);
    }
}

impl Transport for RecordingTransport {
    fn broadcast(&self, message: &ServerMessage) {
        self.push(Delivery::Broadcast(message.clone()));
    }

    fn send_to(&self, player_id: &str, message: &ServerMessage) {
        self.push(Delivery::ToPlayer(player_id.to_string(), message.clone()));
    }
}

/// A player's identity and deck, fixed for the lifetime of the room.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerBinding {
    pub id: String,
    pub deck: Vec<CardDefinition>,
}

impl PlayerBinding {
    pub fn new(id: &str, deck: Vec<CardDefinition>) -> Self {
        Self {
            id: id.to_string(),
            deck,
        }
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CoreDestroyed { winner: PlayerSlot },
    TimeLimit { winner: PlayerSlot },
    Forfeit { winner: PlayerSlot },
    Shutdown,
}

impl StopReason {
    pub fn winner(&self) -> Option<PlayerSlot> {
        match *self {
            StopReason::CoreDestroyed { winner }
            | StopReason::TimeLimit { winner }
            | StopReason::Forfeit { winner } => Some(winner),
            StopReason::Shutdown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::CoreDestroyed { .. } => "core_destroyed",
            StopReason::TimeLimit { .. } => "time_limit",
            StopReason::Forfeit { .. } => "forfeit",
            StopReason::Shutdown => "shutdown",
        }
    }
}

pub struct Room {
    id: RoomId,
    config: RoomConfig,
    catalog: Arc<Catalog>,
    transport: Box<dyn Transport>,
    players: [Option<PlayerBinding>; 2],
    mana: [f32; 2],
    units: Vec<Unit>,
    towers: Vec<Tower>,
    bounds: Bounds,
    tick: u64,
    next_entity_id: EntityId,
    started_at_ms: Option<u64>,
    running: bool,
    outcome: Option<StopReason>,
}

impl Room {
    pub fn new(
        id: RoomId,
        config: RoomConfig,
        catalog: Arc<Catalog>,
        transport: Box<dyn Transport>,
    ) -> Self {
        let towers = Tower::standard_layout();
        let next_entity_id = towers.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let starting_mana = config.starting_mana.clamp(0.0, config.max_mana);

        Self {
            id,
            config,
            catalog,
            transport,
            players: [None, None],
            mana: [starting_mana; 2],
            units: Vec::new(),
            towers,
            bounds: Bounds::default(),
            tick: 0,
            next_entity_id,
            started_at_ms: None,
            running: false,
            outcome: None,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn mana(&self, slot: PlayerSlot) -> f32 {
        self.mana[slot.index()]
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&PlayerBinding> {
        self.players[slot.index()].as_ref()
    }

    pub fn slot_of(&self, player_id: &str) -> Option<PlayerSlot> {
        PlayerSlot::ALL
            .into_iter()
            .find(|slot| self.player(*slot).is_some_and(|p| p.id == player_id))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn outcome(&self) -> Option<StopReason> {
        self.outcome
    }

    pub fn add_player(&mut self, slot: PlayerSlot, binding: PlayerBinding) -> Result<()> {
        if binding.deck.len() > MAX_DECK_SIZE {
            return Err(GameError::DeckTooLarge {
                size: binding.deck.len(),
                max: MAX_DECK_SIZE,
            });
        }
        let seat = &mut self.players[slot.index()];
        if seat.is_some() {
            return Err(GameError::SlotTaken(slot.number()));
        }
        info!(
            "Room {}: player {} takes slot {}",
            self.id,
            binding.id,
            slot.number()
        );
        *seat = Some(binding);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.players.iter().all(Option::is_some)
    }

    /// Starts the match. Returns false if it was already running, already
    /// finished, or still missing a player.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.running || self.outcome.is_some() {
            return false;
        }
        if !self.is_ready() {
            warn!("Room {}: cannot start without two players", self.id);
            return false;
        }

        self.running = true;
        self.started_at_ms = Some(now_ms);
        info!("Room {}: match started", self.id);

        for slot in PlayerSlot::ALL {
            if let (Some(me), Some(opponent)) = (self.player(slot), self.player(slot.opponent())) {
                let message = ServerMessage::MatchStart {
                    room_id: self.id,
                    you: me.id.clone(),
                    opponent: opponent.id.clone(),
                    slot,
                    tick_rate: self.config.tick_rate,
                };
                self.transport.send_to(&me.id, &message);
            }
        }
        true
    }

    /// Ends the match and freezes its state. Only the first call has any effect.
    pub fn stop(&mut self, reason: StopReason) {
        if self.outcome.is_some() {
            return;
        }

        self.running = false;
        self.outcome = Some(reason);

        let winner_id = reason
            .winner()
            .and_then(|slot| self.player(slot))
            .map(|p| p.id.clone());

        info!(
            "Room {}: match ended after {} ticks ({}, winner {:?})",
            self.id,
            self.tick,
            reason.as_str(),
            winner_id
        );

        self.transport.broadcast(&ServerMessage::MatchEnd {
            winner_id,
            reason: reason.as_str().to_string(),
        });
    }

    /// Instantiates a unit from the catalog and announces it.
    ///
    /// Mana is not charged here; see [`Room::handle_spawn_request`].
    pub fn spawn_unit(
        &mut self,
        slot: PlayerSlot,
        unit_id: &str,
        x: f32,
        y: f32,
        equipment: &[String],
    ) -> Result<EntityId> {
        let template = self
            .catalog
            .unit(unit_id)
            .ok_or_else(|| GameError::CardNotFound(unit_id.to_string()))?;
        let stats = self.catalog.build_stats(template, equipment);

        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let unit = Unit::new(id, slot, unit_id, Vector2::new(x, y), template.radius, stats);
        self.transport.broadcast(&protocol::entity_spawned(&unit));
        debug!(
            "Room {}: slot {} spawned {} #{} at ({:.2}, {:.2})",
            self.id,
            slot.number(),
            unit_id,
            id,
            x,
            y
        );
        self.units.push(unit);
        Ok(id)
    }

    /// Validates a card play and spawns it. Rejections are reported to the
    /// requesting player only and leave the simulation untouched.
    pub fn handle_spawn_request(
        &mut self,
        slot: PlayerSlot,
        card_index: i64,
        x: f32,
        y: f32,
    ) -> Result<EntityId> {
        let result = self.try_spawn_request(slot, card_index, x, y);

        if let Err(error) = &result {
            warn!(
                "Room {}: rejected spawn from slot {}: {}",
                self.id,
                slot.number(),
                error
            );
            if let Some(player) = self.player(slot) {
                self.transport.send_to(&player.id, &error.to_message());
            }
        }
        result
    }

    fn try_spawn_request(
        &mut self,
        slot: PlayerSlot,
        card_index: i64,
        x: f32,
        y: f32,
    ) -> Result<EntityId> {
        if !self.running {
            return Err(GameError::GameNotRunning);
        }

        let player = self
            .player(slot)
            .ok_or_else(|| GameError::PlayerNotFound(format!("slot {}", slot.number())))?;

        let card = usize::try_from(card_index)
            .ok()
            .and_then(|index| player.deck.get(index))
            .cloned()
            .ok_or(GameError::InvalidCardIndex {
                index: card_index,
                deck_size: player.deck.len(),
            })?;

        if !slot.deploy_zone().contains(x, y) {
            return Err(GameError::InvalidPosition { x, y });
        }

        let template = self
            .catalog
            .unit(&card.unit_id)
            .ok_or_else(|| GameError::CardNotFound(card.unit_id.clone()))?;

        let cost = self.catalog.card_cost(template, &card.equipment);
        let available = self.mana(slot);
        if available < cost {
            return Err(GameError::InsufficientMana {
                required: cost,
                available,
            });
        }

        self.mana[slot.index()] = (available - cost).clamp(0.0, self.config.max_mana);
        self.spawn_unit(slot, &card.unit_id, x, y, &card.equipment)
    }

    /// Runs one simulation step. Returns false if the room is not running.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if !self.running {
            return false;
        }

        self.tick += 1;

        let regen = self.config.mana_per_tick();
        for mana in self.mana.iter_mut() {
            *mana = (*mana + regen).clamp(0.0, self.config.max_mana);
        }

        let attacks = combat::resolve(&mut self.units, &mut self.towers, now_ms);
        physics::step(&mut self.units, self.config.tick_delta(), &self.bounds);

        let before = self.units.len();
        self.units.retain(Unit::is_alive);
        let purged = before - self.units.len();

        let decision = self.evaluate_win_condition(now_ms);

        self.transport.broadcast(&protocol::game_tick(self));

        if self.tick % 100 == 0 || purged > 0 {
            debug!(
                "Room {}: tick {}, {} units, {} attacks, {} died",
                self.id,
                self.tick,
                self.units.len(),
                attacks.len(),
                purged
            );
        }

        if let Some(reason) = decision {
            self.stop(reason);
        }
        true
    }

    fn summed_tower_hp(&self, slot: PlayerSlot) -> f32 {
        self.towers
            .iter()
            .filter(|t| t.owner == slot)
            .map(|t| t.hp)
            .sum()
    }

    fn evaluate_win_condition(&self, now_ms: u64) -> Option<StopReason> {
        for tower in &self.towers {
            if tower.kind == TowerKind::Core && !tower.is_alive() {
                return Some(StopReason::CoreDestroyed {
                    winner: tower.owner.opponent(),
                });
            }
        }

        let started = self.started_at_ms?;
        let elapsed_ms = now_ms.saturating_sub(started);
        if elapsed_ms as u128 >= self.config.match_duration.as_millis() {
            let winner = if self.summed_tower_hp(PlayerSlot::Two) > self.summed_tower_hp(PlayerSlot::One)
            {
                PlayerSlot::Two
            } else {
                PlayerSlot::One
            };
            return Some(StopReason::TimeLimit { winner });
        }

        None
    }

    /// Applies one command delivered to the room's task.
    pub fn apply(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Spawn {
                player_id,
                card_index,
                x,
                y,
            } => match self.slot_of(&player_id) {
                Some(slot) => {
                    let _ = self.handle_spawn_request(slot, card_index, x, y);
                }
                None => {
                    let error = GameError::PlayerNotFound(player_id.clone());
                    self.transport.send_to(&player_id, &error.to_message());
                }
            },
            RoomCommand::Stop(reason) => self.stop(reason),
        }
    }
}

/// Commands routed into a running room between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    Spawn {
        player_id: String,
        card_index: i64,
        x: f32,
        y: f32,
    },
    Stop(StopReason),
}

/// Reported by a room's task when it exits.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Closed {
        room_id: RoomId,
        outcome: Option<StopReason>,
    },
}

/// Handle to a room running in its own task.
#[derive(Debug)]
pub struct RoomHandle {
    pub id: RoomId,
    pub players: [String; 2],
    commands: mpsc::UnboundedSender<RoomCommand>,
    task: JoinHandle<()>,
}

impl RoomHandle {
    /// Queues a command. Returns false if the room has already shut down.
    pub fn send(&self, command: RoomCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Asks the room to stop. Safe to call any number of times.
    pub fn stop(&self, reason: StopReason) {
        let _ = self.commands.send(RoomCommand::Stop(reason));
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the room's task to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Room {} task failed: {}", self.id, e);
        }
    }
}

/// Starts a ready room and drives it from a dedicated task.
///
/// Commands are applied as they arrive, always between two ticks, and every
/// command queued before a tick deadline is applied before that tick runs.
/// The task exits once the room stops, reporting [`RoomEvent::Closed`].
pub fn spawn_room(mut room: Room, events: mpsc::UnboundedSender<RoomEvent>) -> RoomHandle {
    let (commands, mut command_rx) = mpsc::unbounded_channel();
    let id = room.id();
    let players = [
        room.player(PlayerSlot::One).map(|p| p.id.clone()).unwrap_or_default(),
        room.player(PlayerSlot::Two).map(|p| p.id.clone()).unwrap_or_default(),
    ];
    let tick_interval = room.config().tick_interval();

    let task = tokio::spawn(async move {
        room.start(get_timestamp());

        let mut ticker = interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        while room.is_running() {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => room.apply(command),
                    None => room.stop(StopReason::Shutdown),
                },
                _ = ticker.tick() => {
                    while let Ok(command) = command_rx.try_recv() {
                        room.apply(command);
                        if !room.is_running() {
                            break;
                        }
                    }
                    if room.is_running() {
                        room.tick(get_timestamp());
                    }
                }
            }
        }

        if let Err(e) = events.send(RoomEvent::Closed {
            room_id: id,
            outcome: room.outcome(),
        }) {
            warn!("Room {}: failed to report closure: {}", id, e);
        }
    });

    RoomHandle {
        id,
        players,
        commands,
        task,
    }
}
