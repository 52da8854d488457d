//! Command-line interface for strictly_chess.

use clap::{Parser, Subcommand};
use strictly_chess::GameId;

/// Strictly Chess - real-time chess client core
#[derive(Parser, Debug)]
#[command(name = "strictly_chess")]
#[command(about = "Synchronizes a two-player chess game with its server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the client configuration file
    #[arg(long, global = true, default_value = "strictly_chess.toml")]
    pub config: std::path::PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay recorded server broadcasts (one JSON object per line)
    Replay {
        /// File with newline-delimited broadcasts
        #[arg(short, long)]
        file: std::path::PathBuf,

        /// Game to follow (defaults to the configured game)
        #[arg(long)]
        game_id: Option<GameId>,
    },

    /// Resign a game
    Resign {
        /// Game to resign (defaults to the configured game)
        #[arg(long)]
        game_id: Option<GameId>,
    },

    /// Ask the server to take back the last move
    Undo {
        /// Game to undo in (defaults to the configured game)
        #[arg(long)]
        game_id: Option<GameId>,
    },
}
