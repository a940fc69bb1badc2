//! Server network layer: UDP datagrams in, JSON messages out, and the main
//! loop tying connections to the session directory.
//!
//! Work is split across tasks the same way for every server instance:
//! - a receiver task reading datagrams off the socket,
//! - a sender task encoding outbound messages and resolving player ids to
//!   addresses,
//! - a timeout checker reaping silent connections,
//! - one task per running room (see [`crate::room::spawn_room`]).
//!
//! The main loop owns the [`SessionDirectory`] and is the only place that
//! mutates it.

use crate::catalog::Catalog;
use crate::client_manager::ClientManager;
use crate::config::{RoomConfig, ServerConfig};
use crate::directory::{Outbox, SessionDirectory};
use crate::error::{GameError, Result as GameResult};
use crate::protocol::{decode_client_message, encode_server_message};
use crate::room::{RoomEvent, Transport};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Largest datagram the server accepts.
const MAX_DATAGRAM_SIZE: usize = 4096;

/// Events delivered to the main loop.
#[derive(Debug)]
pub enum NetworkEvent {
    DatagramReceived {
        bytes: Vec<u8>,
        addr: SocketAddr,
    },
    ConnectionTimeout {
        connection_id: u32,
        player_id: Option<String>,
    },
}

/// Messages queued for the sender task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    ToAddr {
        addr: SocketAddr,
        message: ServerMessage,
    },
    ToPlayer {
        player_id: String,
        message: ServerMessage,
    },
    ToPlayers {
        player_ids: Vec<String>,
        message: ServerMessage,
    },
}

/// Room transport backed by the sender task.
pub struct RoomChannel {
    players: [String; 2],
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Transport for RoomChannel {
    fn broadcast(&self, message: &ServerMessage) {
        let outbound = Outbound::ToPlayers {
            player_ids: self.players.to_vec(),
            message: message.clone(),
        };
        if let Err(e) = self.outbound.send(outbound) {
            error!("Failed to queue broadcast: {}", e);
        }
    }

    fn send_to(&self, player_id: &str, message: &ServerMessage) {
        let outbound = Outbound::ToPlayer {
            player_id: player_id.to_string(),
            message: message.clone(),
        };
        if let Err(e) = self.outbound.send(outbound) {
            error!("Failed to queue message for {}: {}", player_id, e);
        }
    }
}

/// Directory outbox backed by the sender task.
#[derive(Clone)]
pub struct ChannelOutbox {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ChannelOutbox {
    pub fn new(outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { outbound }
    }
}

impl Outbox for ChannelOutbox {
    fn send_to(&self, player_id: &str, message: &ServerMessage) {
        let outbound = Outbound::ToPlayer {
            player_id: player_id.to_string(),
            message: message.clone(),
        };
        if let Err(e) = self.outbound.send(outbound) {
            error!("Failed to queue message for {}: {}", player_id, e);
        }
    }

    fn room_transport(&self, players: [String; 2]) -> Box<dyn Transport> {
        Box::new(RoomChannel {
            players,
            outbound: self.outbound.clone(),
        })
    }
}

pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    directory: SessionDirectory,

    // Communication channels
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Outbound>>,
    room_rx: mpsc::UnboundedReceiver<RoomEvent>,
}

impl Server {
    /// Binds the socket and wires the directory to the outbound queue.
    pub async fn new(
        config: ServerConfig,
        room_config: RoomConfig,
        catalog: Arc<Catalog>,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (room_tx, room_rx) = mpsc::unbounded_channel();

        let directory = SessionDirectory::new(
            catalog,
            room_config,
            Box::new(ChannelOutbox::new(outbound_tx.clone())),
            room_tx,
        );

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.max_clients,
                config.client_timeout,
            ))),
            directory,
            event_tx,
            event_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            room_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let event = NetworkEvent::DatagramReceived {
                            bytes: buffer[..len].to_vec(),
                            addr,
                        };
                        if let Err(e) = event_tx.send(event) {
                            error!("Failed to forward datagram to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn spawn_network_sender(&mut self) {
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            while let Some(outbound) = outbound_rx.recv().await {
                let (addrs, message) = match outbound {
                    Outbound::ToAddr { addr, message } => (vec![addr], message),
                    Outbound::ToPlayer { player_id, message } => {
                        let clients = clients.read().await;
                        (clients.addr_of_player(&player_id).into_iter().collect(), message)
                    }
                    Outbound::ToPlayers {
                        player_ids,
                        message,
                    } => {
                        let clients = clients.read().await;
                        let addrs = player_ids
                            .iter()
                            .filter_map(|player_id| clients.addr_of_player(player_id))
                            .collect();
                        (addrs, message)
                    }
                };

                if addrs.is_empty() {
                    continue;
                }

                let data = match encode_server_message(&message) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to encode message: {}", e);
                        continue;
                    }
                };

                for addr in addrs {
                    if let Err(e) = socket.send_to(&data, addr).await {
                        error!("Failed to send to {}: {}", addr, e);
                    }
                }
            }
        });
    }

    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients = clients.write().await;
                    clients.check_timeouts()
                };

                for connection in timed_out {
                    let event = NetworkEvent::ConnectionTimeout {
                        connection_id: connection.id,
                        player_id: connection.player_id,
                    };
                    if let Err(e) = event_tx.send(event) {
                        error!("Failed to report connection timeout: {}", e);
                        return;
                    }
                }
            }
        });
    }

    fn send_to_addr(&self, addr: SocketAddr, message: ServerMessage) {
        if let Err(e) = self.outbound_tx.send(Outbound::ToAddr { addr, message }) {
            error!("Failed to queue message for {}: {}", addr, e);
        }
    }

    async fn handle_datagram(&mut self, bytes: Vec<u8>, addr: SocketAddr) {
        let connection_id = {
            let mut clients = self.clients.write().await;
            clients.connect(addr)
        };

        let Some(connection_id) = connection_id else {
            warn!("Rejecting {}: server full", addr);
            self.send_to_addr(addr, GameError::ServerFull.to_message());
            return;
        };

        let message = match decode_client_message(&bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Invalid datagram from {}: {}", addr, e);
                self.send_to_addr(addr, GameError::from(e).to_message());
                return;
            }
        };

        if let Err(e) = self.handle_message(connection_id, addr, message).await {
            warn!("Command from {} failed: {}", addr, e);
            self.send_to_addr(addr, e.to_message());
        }
    }

    async fn bound_player(&self, connection_id: u32) -> GameResult<String> {
        let clients = self.clients.read().await;
        clients
            .player_of(connection_id)
            .map(str::to_string)
            .ok_or_else(|| GameError::PlayerNotFound(format!("connection {}", connection_id)))
    }

    async fn handle_message(
        &mut self,
        connection_id: u32,
        addr: SocketAddr,
        message: ClientMessage,
    ) -> GameResult<()> {
        match message {
            ClientMessage::Login { player_id } => {
                let reply = self.directory.login(&player_id)?;

                let previous = {
                    let mut clients = self.clients.write().await;
                    let previous = clients.player_of(connection_id).map(str::to_string);
                    clients.bind_player(connection_id, &player_id);
                    previous
                };
                if let Some(previous) = previous.filter(|p| *p != player_id) {
                    self.directory.disconnect(&previous);
                }

                self.send_to_addr(addr, reply);
            }

            ClientMessage::QueueJoin { deck_id } => {
                let player_id = self.bound_player(connection_id).await?;
                self.directory.join_queue(&player_id, deck_id.as_deref())?;
            }

            ClientMessage::QueueLeave {} => {
                let player_id = self.bound_player(connection_id).await?;
                self.directory.leave_queue(&player_id)?;
            }

            ClientMessage::SpawnCard { card_index, x, y } => {
                let player_id = self.bound_player(connection_id).await?;
                self.directory.route_spawn(&player_id, card_index, x, y)?;
            }

            ClientMessage::Heartbeat {} => {
                debug!("Heartbeat from {}", addr);
            }

            ClientMessage::Disconnect {} => {
                let removed = {
                    let mut clients = self.clients.write().await;
                    clients.remove(connection_id)
                };
                if let Some(player_id) = removed.and_then(|c| c.player_id) {
                    self.directory.disconnect(&player_id);
                }
            }
        }
        Ok(())
    }

    /// Runs the server until Ctrl+C, then stops every room.
    pub async fn run(&mut self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(NetworkEvent::DatagramReceived { bytes, addr }) => {
                            self.handle_datagram(bytes, addr).await;
                        }
                        Some(NetworkEvent::ConnectionTimeout { connection_id, player_id }) => {
                            info!("Connection {} timed out", connection_id);
                            if let Some(player_id) = player_id {
                                self.directory.disconnect(&player_id);
                            }
                        }
                        None => break,
                    }
                }

                Some(RoomEvent::Closed { room_id, outcome }) = self.room_rx.recv() => {
                    debug!("Room {} finished with {:?}", room_id, outcome);
                    self.directory.room_closed(room_id);
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.directory.shutdown().await;
        // Give the sender task a moment to flush the final MATCH_END messages.
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}
