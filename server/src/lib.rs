//! # Lane Battle Server Library
//!
//! Authoritative server for a two-player lane battle. Players log in, queue
//! with a deck, get paired first-come first-served, and then play cards that
//! spawn units into their half of a 30×40 map. The server simulates every
//! unit at a fixed tick rate and streams compact snapshots back.
//!
//! ## Simulation core
//!
//! - [`physics`]: steering, circle separation and map clamping
//! - [`entity`]: units, towers and the unit state machine
//! - [`combat`]: target acquisition and damage
//! - [`room`]: one match; mana, spawn validation, the tick pipeline and the
//!   win condition
//!
//! None of these modules perform I/O. A [`room::Room`] talks to the outside
//! only through the [`room::Transport`] trait it is constructed with.
//!
//! ## Around the core
//!
//! - [`protocol`]: JSON codec and inbound validation
//! - [`catalog`]: read-only unit/item definitions and decks
//! - [`directory`]: logins, the matchmaking queue and room routing
//! - [`client_manager`] and [`network`]: UDP connections and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::catalog::Catalog;
//! use server::config::{RoomConfig, ServerConfig};
//! use server::network::Server;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         ServerConfig::default(),
//!         RoomConfig::default(),
//!         Arc::new(Catalog::builtin()),
//!     )
//!     .await?;
//!
//!     // Runs until Ctrl+C, then ends every match with reason "shutdown".
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod directory;
pub mod entity;
pub mod error;
pub mod network;
pub mod physics;
pub mod protocol;
pub mod room;
pub mod utils;
