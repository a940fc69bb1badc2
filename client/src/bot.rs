//! Card-playing strategy for the headless bot.

use crate::game::MirrorState;
use rand::Rng;
use shared::{ClientMessage, MAP_WIDTH};

/// Distance kept from the deploy zone edges when picking a position.
const EDGE_MARGIN: f32 = 1.0;

/// Plays a random card at a random spot in the bot's own deploy zone once
/// enough mana has built up. The server stays the judge of legality; a
/// rejected play simply costs the bot a turn.
pub struct RandomStrategy<R: Rng> {
    rng: R,
    mana_threshold: f32,
}

impl<R: Rng> RandomStrategy<R> {
    pub fn new(rng: R, mana_threshold: f32) -> Self {
        Self {
            rng,
            mana_threshold,
        }
    }

    pub fn choose_play(&mut self, state: &MirrorState) -> Option<ClientMessage> {
        if !state.in_match() || state.deck.is_empty() {
            return None;
        }
        let slot = state.slot?;
        if state.my_mana()? < self.mana_threshold {
            return None;
        }

        let zone = slot.deploy_zone();
        let card_index = self.rng.gen_range(0..state.deck.len()) as i64;
        let x = self.rng.gen_range(EDGE_MARGIN..=MAP_WIDTH - EDGE_MARGIN);
        let y = self
            .rng
            .gen_range(zone.min_y + EDGE_MARGIN..=zone.max_y - EDGE_MARGIN);

        Some(ClientMessage::SpawnCard { card_index, x, y })
    }
}
