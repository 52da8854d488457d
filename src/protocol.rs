//! Wire shapes exchanged with the game server over the push channel.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use strictly_chess_rules::{Promotion, Square};
use tracing::{debug, instrument};

/// Destination for move requests.
pub const MOVE_DESTINATION: &str = "/app/move";

/// Server statuses that end a game.
pub const TERMINAL_STATUSES: [&str; 2] = ["COMPLETED", "FINISHED"];

/// Identifier of a game on the server (numeric or opaque).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameId {
    /// Numeric id, as the server assigns them.
    Number(u64),
    /// Any other id.
    Text(String),
}

impl GameId {
    /// Topic carrying this game's broadcasts.
    pub fn topic(&self) -> String {
        format!("/topic/game/{}", self)
    }
}

impl Default for GameId {
    fn default() -> Self {
        GameId::Number(1)
    }
}

impl std::str::FromStr for GameId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<u64>() {
            Ok(n) => GameId::Number(n),
            Err(_) => GameId::Text(s.to_string()),
        })
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameId::Number(n) => write!(f, "{n}"),
            GameId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Kind of inbound broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastKind {
    /// Authoritative state after a move.
    Move,
    /// The game has ended.
    GameOver,
    /// The server rejected something.
    Error,
}

/// Authoritative broadcast from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameBroadcast {
    /// Broadcast kind.
    #[serde(rename = "type")]
    pub kind: BroadcastKind,
    /// Space-separated compact move tokens from the start of the game.
    #[serde(default)]
    pub pgn: Option<String>,
    /// Full board snapshot (FEN).
    #[serde(default)]
    pub fen: Option<String>,
    /// White's remaining seconds.
    #[serde(default)]
    pub white_time_left: Option<u64>,
    /// Black's remaining seconds.
    #[serde(default)]
    pub black_time_left: Option<u64>,
    /// Side to move as reported by the server.
    #[serde(default)]
    pub current_turn: Option<String>,
    /// Game status ("IN_PROGRESS", "COMPLETED", ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Free-form message.
    #[serde(default)]
    pub message: Option<String>,
}

impl GameBroadcast {
    /// Decodes a broadcast from a JSON frame body.
    ///
    /// # Errors
    ///
    /// Returns a malformed-payload error when the body is not a broadcast.
    #[instrument(skip(body), fields(len = body.len()))]
    pub fn decode(body: &str) -> Result<Self, SyncError> {
        let broadcast: Self = serde_json::from_str(body)?;
        debug!(kind = ?broadcast.kind, "Decoded broadcast");
        Ok(broadcast)
    }

    /// Move list, if present and non-blank.
    pub fn move_list(&self) -> Option<&str> {
        self.pgn.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Snapshot, if present and non-blank.
    pub fn snapshot(&self) -> Option<&str> {
        self.fen.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Whether the status marks the game as over.
    pub fn is_terminal(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| TERMINAL_STATUSES.contains(&s))
    }
}

/// Move request published to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    /// Game the move belongs to.
    pub game_id: GameId,
    /// Origin square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Promotion choice; always present on the wire.
    pub promotion: Promotion,
}

impl MoveRequest {
    /// Creates a move request.
    pub fn new(game_id: GameId, from: Square, to: Square, promotion: Promotion) -> Self {
        Self {
            game_id,
            from,
            to,
            promotion,
        }
    }
}
