use crate::bot::RandomStrategy;
use crate::game::MirrorState;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientMessage, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::interval;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Settings for one bot session.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub player_id: String,
    pub deck_id: Option<String>,
    pub play_interval: Duration,
    pub mana_threshold: f32,
    /// Queue again after a match instead of exiting.
    pub requeue: bool,
}

/// Headless client that logs in, queues, and plays random cards.
pub struct BotClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    config: BotConfig,
    state: MirrorState,
    strategy: RandomStrategy<StdRng>,
}

impl BotClient {
    pub async fn new(
        server_addr: &str,
        config: BotConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;
        let strategy = RandomStrategy::new(StdRng::from_entropy(), config.mana_threshold);

        Ok(BotClient {
            socket,
            server_addr,
            config,
            state: MirrorState::new(),
            strategy,
        })
    }

    pub fn state(&self) -> &MirrorState {
        &self.state
    }

    async fn send(&self, message: &ClientMessage) -> Result<(), Box<dyn std::error::Error>> {
        let data = serde_json::to_vec(message)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn queue_message(&self) -> ClientMessage {
        ClientMessage::QueueJoin {
            deck_id: self.config.deck_id.clone(),
        }
    }

    /// Returns true once the session is over.
    async fn handle_message(
        &mut self,
        message: ServerMessage,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        self.state.apply(&message);

        match message {
            ServerMessage::LoginSuccess { .. } => {
                self.send(&self.queue_message()).await?;
            }
            ServerMessage::MatchEnd { .. } => {
                if !self.config.requeue {
                    return Ok(true);
                }
                self.send(&self.queue_message()).await?;
            }
            _ => {}
        }
        Ok(false)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Logging in as {}", self.config.player_id);
        self.send(&ClientMessage::Login {
            player_id: self.config.player_id.clone(),
        })
        .await?;

        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
        let mut play_interval = interval(self.config.play_interval);
        let mut buffer = [0u8; 65536];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => match serde_json::from_slice::<ServerMessage>(&buffer[..len]) {
                            Ok(message) => {
                                if self.handle_message(message).await? {
                                    break;
                                }
                            }
                            Err(e) => warn!("Undecodable message from server: {}", e),
                        },
                        Err(e) => error!("Error receiving message: {}", e),
                    }
                }

                _ = heartbeat_interval.tick() => {
                    self.send(&ClientMessage::Heartbeat {}).await?;
                }

                _ = play_interval.tick() => {
                    if let Some(play) = self.strategy.choose_play(&self.state) {
                        self.send(&play).await?;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, leaving");
                    break;
                }
            }
        }

        self.send(&ClientMessage::Disconnect {}).await?;
        if let Some(result) = &self.state.result {
            info!(
                "Final result: {} ({})",
                result.winner_id.as_deref().unwrap_or("no winner"),
                result.reason
            );
        }
        Ok(())
    }
}
