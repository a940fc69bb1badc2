//! # Bot Client Library
//!
//! A headless client for the lane battle server. It logs in, queues for a
//! match, mirrors the match from the server's messages and plays random
//! cards. There is no rendering; the bot exists to drive the protocol end to
//! end and to load-test the server.
//!
//! ## Module Organization
//!
//! - `game`: [`game::MirrorState`], the client's copy of the match built from
//!   `ENTITY_SPAWNED` and `GAME_TICK`
//! - `bot`: the card-playing strategy
//! - `network`: [`network::BotClient`], the UDP session loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{BotClient, BotConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig {
//!         player_id: "bot-1".to_string(),
//!         deck_id: None,
//!         play_interval: Duration::from_millis(1500),
//!         mana_threshold: 4.0,
//!         requeue: false,
//!     };
//!
//!     let mut bot = BotClient::new("127.0.0.1:8080", config).await?;
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod game;
pub mod network;
