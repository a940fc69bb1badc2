//! Connection tracking for the UDP server.
//!
//! A connection is identified by its socket address. Once the client logs in
//! the connection is bound to a player id, which is how rooms and the session
//! directory address players. Connections that stay silent past the timeout
//! are dropped.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One remote endpoint talking to the server.
#[derive(Debug)]
pub struct Connection {
    /// Server-assigned connection id
    pub id: u32,
    pub addr: SocketAddr,
    /// Last time any datagram arrived from this address
    pub last_seen: Instant,
    /// Player id bound by a successful login
    pub player_id: Option<String>,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            player_id: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

pub struct ClientManager {
    connections: HashMap<u32, Connection>,
    next_connection_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            connections: HashMap::new(),
            next_connection_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Returns the connection for `addr`, registering it if needed.
    ///
    /// `None` means the server is at capacity.
    pub fn connect(&mut self, addr: SocketAddr) -> Option<u32> {
        if let Some(id) = self.find_by_addr(addr) {
            if let Some(connection) = self.connections.get_mut(&id) {
                connection.touch();
            }
            return Some(id);
        }

        if self.connections.len() >= self.max_clients {
            return None;
        }

        let id = self.next_connection_id;
        self.next_connection_id += 1;

        info!("Connection {} opened from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr));
        Some(id)
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.connections
            .values()
            .find(|connection| connection.addr == addr)
            .map(|connection| connection.id)
    }

    pub fn get(&self, id: u32) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Binds a player id to a connection.
    ///
    /// A player logging in again from a new address takes over the binding;
    /// the id of the connection that lost it is returned.
    pub fn bind_player(&mut self, id: u32, player_id: &str) -> Option<u32> {
        let previous = self
            .connections
            .values_mut()
            .find(|c| c.id != id && c.player_id.as_deref() == Some(player_id))
            .map(|c| {
                c.player_id = None;
                c.id
            });

        if let Some(connection) = self.connections.get_mut(&id) {
            connection.player_id = Some(player_id.to_string());
        }
        previous
    }

    pub fn player_of(&self, id: u32) -> Option<&str> {
        self.connections
            .get(&id)
            .and_then(|connection| connection.player_id.as_deref())
    }

    pub fn addr_of_player(&self, player_id: &str) -> Option<SocketAddr> {
        self.connections
            .values()
            .find(|connection| connection.player_id.as_deref() == Some(player_id))
            .map(|connection| connection.addr)
    }

    pub fn remove(&mut self, id: u32) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        info!(
            "Connection {} closed ({})",
            connection.id,
            connection.player_id.as_deref().unwrap_or("anonymous")
        );
        Some(connection)
    }

    /// Drops every connection that went silent and returns them.
    pub fn check_timeouts(&mut self) -> Vec<Connection> {
        let timed_out: Vec<u32> = self
            .connections
            .values()
            .filter(|connection| connection.is_timed_out(self.timeout))
            .map(|connection| connection.id)
            .collect();

        timed_out
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
