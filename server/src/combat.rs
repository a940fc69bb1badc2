//! Per-tick target acquisition and damage application.
//!
//! Units are visited in collection order. A unit killed earlier in the pass is
//! already DEAD when later units look for targets, so it is never picked again.

use crate::entity::{DamageOutcome, EntityId, Target, TargetInfo, Tower, Unit, UnitState};

/// One attack that landed this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackEvent {
    pub attacker: EntityId,
    pub target: Target,
    pub damage: f32,
    pub killed: bool,
}

/// Picks the target for `units[index]`.
///
/// Living enemy units inside the aggro range win over towers; otherwise the
/// nearest living enemy tower. Ties keep the first candidate found.
pub fn acquire_target(units: &[Unit], towers: &[Tower], index: usize) -> Option<TargetInfo> {
    let attacker = &units[index];
    let origin = attacker.position();

    let mut nearest_unit: Option<(f32, &Unit)> = None;
    for candidate in units
        .iter()
        .filter(|u| u.owner != attacker.owner && u.is_alive())
    {
        let distance = origin.distance(&candidate.position());
        if distance > attacker.stats.aggro_range {
            continue;
        }
        if nearest_unit.map_or(true, |(best, _)| distance < best) {
            nearest_unit = Some((distance, candidate));
        }
    }

    if let Some((_, unit)) = nearest_unit {
        return Some(TargetInfo {
            target: Target::Unit(unit.id),
            position: unit.position(),
            radius: unit.radius(),
        });
    }

    let mut nearest_tower: Option<(f32, &Tower)> = None;
    for tower in towers
        .iter()
        .filter(|t| t.owner != attacker.owner && t.is_alive())
    {
        let distance = origin.distance(&tower.position);
        if nearest_tower.map_or(true, |(best, _)| distance < best) {
            nearest_tower = Some((distance, tower));
        }
    }

    nearest_tower.map(|(_, tower)| TargetInfo {
        target: Target::Tower(tower.id),
        position: tower.position,
        radius: tower.radius,
    })
}

fn apply_damage(units: &mut [Unit], towers: &mut [Tower], target: Target, amount: f32) -> Option<DamageOutcome> {
    match target {
        Target::Unit(id) => units
            .iter_mut()
            .find(|u| u.id == id)
            .map(|u| u.take_damage(amount)),
        Target::Tower(id) => towers
            .iter_mut()
            .find(|t| t.id == id)
            .map(|t| t.take_damage(amount)),
    }
}

/// Runs one combat pass: every living unit re-acquires a target, advances its
/// state machine, and attacks if it ends up ATTACKING.
pub fn resolve(units: &mut [Unit], towers: &mut [Tower], now_ms: u64) -> Vec<AttackEvent> {
    let mut events = Vec::new();

    for index in 0..units.len() {
        if !units[index].is_alive() {
            continue;
        }

        let choice = acquire_target(units, towers, index);
        units[index].update_state(choice, now_ms);

        if units[index].state != UnitState::Attacking || !units[index].cooldown_elapsed(now_ms) {
            continue;
        }

        let Some(target) = units[index].target else {
            continue;
        };
        let damage = units[index].stats.damage;

        let Some(outcome) = apply_damage(units, towers, target, damage) else {
            // Target vanished since acquisition; re-acquire next tick.
            units[index].clear_target();
            continue;
        };

        let attacker = &mut units[index];
        attacker.record_attack(now_ms);

        let killed = outcome == DamageOutcome::Killed;
        if killed {
            attacker.clear_target();
        }

        events.push(AttackEvent {
            attacker: attacker.id,
            target,
            damage,
            killed,
        });
    }

    events
}
