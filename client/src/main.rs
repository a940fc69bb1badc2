use clap::Parser;
use client::network::{BotClient, BotConfig};
use log::info;
use rand::Rng;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Player id to log in with (random if omitted)
    #[arg(short = 'p', long)]
    player_id: Option<String>,

    /// Deck to queue with (server default if omitted)
    #[arg(short = 'd', long)]
    deck: Option<String>,

    /// Milliseconds between play attempts
    #[arg(long, default_value = "1500")]
    play_interval_ms: u64,

    /// Mana the bot waits for before playing a card
    #[arg(long, default_value = "4.0")]
    mana_threshold: f32,

    /// Keep queueing for new matches
    #[arg(short = 'r', long)]
    requeue: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let player_id = args
        .player_id
        .unwrap_or_else(|| format!("bot-{:04}", rand::thread_rng().gen_range(0..10_000)));

    info!("Starting bot {}", player_id);
    info!("Connecting to: {}", args.server);

    let config = BotConfig {
        player_id,
        deck_id: args.deck,
        play_interval: Duration::from_millis(args.play_interval_ms.max(50)),
        mana_threshold: args.mana_threshold,
        requeue: args.requeue,
    };

    let mut bot = BotClient::new(&args.server, config).await?;
    bot.run().await?;

    Ok(())
}
