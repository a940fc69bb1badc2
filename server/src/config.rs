//! Runtime configuration for the server and for each match.

use shared::{MAX_MANA, STARTING_MANA, TICK_RATE};
use std::time::Duration;

/// Per-match simulation settings. Shared by every room the server creates.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomConfig {
    /// Simulation steps per second.
    pub tick_rate: u32,
    pub starting_mana: f32,
    pub max_mana: f32,
    pub mana_regen_per_second: f32,
    /// Wall-clock limit after which the match is decided on tower health.
    pub match_duration: Duration,
}

impl RoomConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Seconds simulated by one tick.
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn mana_per_tick(&self) -> f32 {
        self.mana_regen_per_second / self.tick_rate.max(1) as f32
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            starting_mana: STARTING_MANA,
            max_mana: MAX_MANA,
            mana_regen_per_second: 1.0,
            match_duration: Duration::from_secs(180),
        }
    }
}

/// Process-wide networking settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    /// Connections silent for longer than this are dropped.
    pub client_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_clients: 64,
            client_timeout: Duration::from_secs(10),
        }
    }
}
