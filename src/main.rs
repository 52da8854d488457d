//! Strictly Chess - command-line driver
//!
//! Replays recorded broadcasts through a session and fires out-of-band
//! control requests.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use strictly_chess::{
    ClientConfig, GameControl, GameId, GameSession, HttpControl, LoopbackChannel, StandardRules,
};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_chess=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load(&cli.config)?;

    match cli.command {
        Command::Replay { file, game_id } => run_replay(following(config, game_id), file),
        Command::Resign { game_id } => {
            let config = following(config, game_id);
            HttpControl::new(config.server_url())
                .resign(config.game_id())
                .await?;
            println!("Resign requested for game {}", config.game_id());
            Ok(())
        }
        Command::Undo { game_id } => {
            let config = following(config, game_id);
            HttpControl::new(config.server_url())
                .undo(config.game_id())
                .await?;
            println!("Undo requested for game {}", config.game_id());
            Ok(())
        }
    }
}

/// Apply a `--game-id` override
fn following(config: ClientConfig, game_id: Option<GameId>) -> ClientConfig {
    match game_id {
        Some(game_id) => config.with_game_id(game_id),
        None => config,
    }
}

/// Feed recorded broadcasts through a loopback session and print the result
#[instrument(skip(config))]
fn run_replay(config: ClientConfig, file: std::path::PathBuf) -> Result<()> {
    let frames = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let (channel, injector, mut events) = LoopbackChannel::new();
    let mut session = GameSession::new(
        config.game_id().clone(),
        StandardRules::new(),
        channel,
        *config.time_control(),
    );
    session.start()?;
    session.pump(&mut events);

    let topic = session.topic();
    for (line_no, line) in frames.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !injector.deliver(&topic, line)? {
            warn!(line = line_no + 1, "Frame dropped, no subscription");
        }
        session.pump(&mut events);
    }
    info!(frames = frames.lines().count(), "Replay finished");

    let sync = session.sync();
    for (i, turn) in sync.history().turns().iter().enumerate() {
        let black = turn
            .black()
            .as_ref()
            .map(|b| b.label().as_str())
            .unwrap_or("...");
        let remaining = turn
            .annotation()
            .remaining()
            .map(|s| format!(" ({s}s)"))
            .unwrap_or_default();
        println!(
            "{:>3}. {:<6} {:<6} {}{}",
            i + 1,
            turn.white().label(),
            black,
            turn.annotation().label(),
            remaining
        );
    }
    let clocks = sync.clocks();
    println!("Clocks: white {}s, black {}s", clocks.white, clocks.black);
    println!("Status: {}", sync.status_line());
    match sync.outcome().message() {
        Some(message) => println!("Result: {message}"),
        None => println!("Result: in progress"),
    }

    // Dropping the session on an early return tears it down as well.
    session.close()?;
    Ok(())
}
