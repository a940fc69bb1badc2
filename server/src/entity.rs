//! Units, towers and the per-unit finite-state machine.

use crate::physics::{Body, Movable, Vector2};
use shared::{PlayerSlot, SpawnedEntity};

pub type EntityId = u32;

/// Combat and movement stats after equipment has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    pub current_hp: f32,
    pub max_hp: f32,
    pub damage: f32,
    /// Attacks per second.
    pub attack_speed: f32,
    /// Reach measured between circle edges.
    pub range: f32,
    /// Center distance within which enemy units take priority over towers.
    pub aggro_range: f32,
    pub move_speed: f32,
}

impl UnitStats {
    /// Milliseconds between two attacks.
    pub fn cooldown_ms(&self) -> f32 {
        1000.0 / self.attack_speed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    Idle,
    Moving,
    Attacking,
    Cooldown,
    Dead,
}

impl UnitState {
    /// Small integer code used in tick payloads.
    pub fn code(self) -> u8 {
        match self {
            UnitState::Idle => 0,
            UnitState::Moving => 1,
            UnitState::Attacking => 2,
            UnitState::Cooldown => 3,
            UnitState::Dead => 4,
        }
    }
}

/// Weak reference to something a unit can attack. Always re-resolved by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Unit(EntityId),
    Tower(EntityId),
}

/// What the FSM needs to know about the chosen target this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub target: Target,
    pub position: Vector2,
    pub radius: f32,
}

/// Outcome of a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Survived,
    Killed,
    AlreadyDead,
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: EntityId,
    pub owner: PlayerSlot,
    pub unit_id: String,
    pub body: Body,
    pub spawn_position: Vector2,
    pub stats: UnitStats,
    pub state: UnitState,
    pub target: Option<Target>,
    pub last_attack_ms: Option<u64>,
}

impl Unit {
    pub fn new(
        id: EntityId,
        owner: PlayerSlot,
        unit_id: &str,
        position: Vector2,
        radius: f32,
        stats: UnitStats,
    ) -> Self {
        Unit {
            id,
            owner,
            unit_id: unit_id.to_string(),
            body: Body::new(position, radius, stats.move_speed),
            spawn_position: position,
            stats,
            state: UnitState::Idle,
            target: None,
            last_attack_ms: None,
        }
    }

    pub fn position(&self) -> Vector2 {
        self.body.position
    }

    pub fn radius(&self) -> f32 {
        self.body.radius
    }

    pub fn is_alive(&self) -> bool {
        self.state != UnitState::Dead
    }

    /// Edge-to-edge distance is within the attack range.
    pub fn in_range(&self, position: Vector2, radius: f32) -> bool {
        self.position().distance(&position) - (self.radius() + radius) <= self.stats.range
    }

    pub fn cooldown_elapsed(&self, now_ms: u64) -> bool {
        match self.last_attack_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) as f32 >= self.stats.cooldown_ms(),
        }
    }

    /// Advances the state machine given this tick's target choice.
    pub fn update_state(&mut self, target: Option<TargetInfo>, now_ms: u64) {
        if !self.is_alive() {
            return;
        }

        let Some(info) = target else {
            self.target = None;
            self.body.steering_target = None;
            self.state = UnitState::Idle;
            return;
        };

        self.target = Some(info.target);

        if self.in_range(info.position, info.radius) {
            self.body.steering_target = None;
            self.state = if self.cooldown_elapsed(now_ms) {
                UnitState::Attacking
            } else {
                UnitState::Cooldown
            };
        } else {
            self.body.steering_target = Some(info.position);
            self.state = UnitState::Moving;
        }
    }

    /// Stamps an attack, re-arming the cooldown.
    pub fn record_attack(&mut self, now_ms: u64) {
        self.last_attack_ms = Some(now_ms);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.body.steering_target = None;
    }

    /// Subtracts HP, clamping at zero. Lethal damage moves the unit to DEAD once.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::AlreadyDead;
        }

        self.stats.current_hp = (self.stats.current_hp - amount.max(0.0)).max(0.0);

        if self.stats.current_hp <= 0.0 {
            self.state = UnitState::Dead;
            self.clear_target();
            DamageOutcome::Killed
        } else {
            DamageOutcome::Survived
        }
    }

    /// Immutable metadata sent once when the unit appears.
    pub fn spawned_entity(&self) -> SpawnedEntity {
        SpawnedEntity {
            id: self.id,
            owner: self.owner,
            unit_id: self.unit_id.clone(),
            max_hp: self.stats.max_hp.ceil() as u32,
            x: self.spawn_position.x,
            y: self.spawn_position.y,
        }
    }
}

impl Movable for Unit {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn is_active(&self) -> bool {
        self.is_alive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TowerKind {
    Side,
    Core,
}

/// A static objective. Only its health changes during a match.
#[derive(Debug, Clone)]
pub struct Tower {
    pub id: EntityId,
    pub owner: PlayerSlot,
    pub kind: TowerKind,
    pub position: Vector2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
}

impl Tower {
    pub const SIDE_HP: f32 = 1400.0;
    pub const CORE_HP: f32 = 2400.0;
    pub const SIDE_RADIUS: f32 = 1.0;
    pub const CORE_RADIUS: f32 = 1.5;

    pub fn new(id: EntityId, owner: PlayerSlot, kind: TowerKind, position: Vector2) -> Self {
        let (hp, radius) = match kind {
            TowerKind::Side => (Self::SIDE_HP, Self::SIDE_RADIUS),
            TowerKind::Core => (Self::CORE_HP, Self::CORE_RADIUS),
        };
        Tower {
            id,
            owner,
            kind,
            position,
            radius,
            hp,
            max_hp: hp,
        }
    }

    /// The six towers of a match: two sides and a core per player, ids 1 to 6.
    pub fn standard_layout() -> Vec<Tower> {
        let layout = [
            (PlayerSlot::One, TowerKind::Side, 7.0, 6.0),
            (PlayerSlot::One, TowerKind::Side, 23.0, 6.0),
            (PlayerSlot::One, TowerKind::Core, 15.0, 3.0),
            (PlayerSlot::Two, TowerKind::Side, 7.0, 34.0),
            (PlayerSlot::Two, TowerKind::Side, 23.0, 34.0),
            (PlayerSlot::Two, TowerKind::Core, 15.0, 37.0),
        ];

        layout
            .iter()
            .enumerate()
            .map(|(i, &(owner, kind, x, y))| {
                Tower::new(i as EntityId + 1, owner, kind, Vector2::new(x, y))
            })
            .collect()
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::AlreadyDead;
        }
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        if self.hp <= 0.0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Survived
        }
    }
}
