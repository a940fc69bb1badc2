use clap::Parser;
use log::info;
use server::catalog::Catalog;
use server::config::{RoomConfig, ServerConfig};
use server::network::Server;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value = "20")]
    tick_rate: u32,

    /// Maximum number of simultaneous connections
    #[arg(short, long, default_value = "64")]
    max_clients: usize,

    /// Match length in seconds before tower health decides the winner
    #[arg(long, default_value = "180")]
    match_seconds: u64,

    /// Mana regenerated per second
    #[arg(long, default_value = "1.0")]
    mana_regen: f32,

    /// JSON catalog of units, items and decks (built-in catalog if omitted)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Seconds of silence before a connection is dropped
    #[arg(long, default_value = "10")]
    client_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => {
            info!("Loading catalog from {}", path.display());
            Catalog::load(path)?
        }
        None => Catalog::builtin(),
    };

    let room_config = RoomConfig {
        tick_rate: args.tick_rate,
        mana_regen_per_second: args.mana_regen,
        match_duration: Duration::from_secs(args.match_seconds),
        ..RoomConfig::default()
    };
    let server_config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.client_timeout_secs),
    };

    info!("Starting server on {}", server_config.bind_addr);
    info!(
        "Tick rate: {}Hz, match length: {}s, max clients: {}",
        room_config.tick_rate, args.match_seconds, server_config.max_clients
    );

    let mut server = Server::new(server_config, room_config, Arc::new(catalog)).await?;
    server.run().await?;

    Ok(())
}
