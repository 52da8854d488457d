//! Plain state values owned by the synchronization engine.

use crate::time_control::TimeControl;
use serde::{Deserialize, Serialize};

/// Default clock for each side when no time control says otherwise.
pub const DEFAULT_CLOCK_SECONDS: u64 = 600;

/// Remaining time per side, in whole seconds.
///
/// Only ever replaced wholesale from a server broadcast; never ticked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    /// White's remaining seconds.
    pub white: u64,
    /// Black's remaining seconds.
    pub black: u64,
}

impl ClockState {
    /// Creates a clock state.
    pub fn new(white: u64, black: u64) -> Self {
        Self { white, black }
    }

    /// Starting clocks for a time control.
    pub fn for_time_control(time_control: TimeControl) -> Self {
        match time_control.initial_seconds() {
            0 => Self::default(),
            secs => Self::new(secs, secs),
        }
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_SECONDS, DEFAULT_CLOCK_SECONDS)
    }
}

/// State of the push channel, driven only by transport callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Connect requested, handshake not yet confirmed.
    Connecting,
    /// Handshake confirmed.
    Connected,
}

/// Why a game was marked completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReason {
    /// A move broadcast carried a terminal status.
    ServerStatus(String),
    /// A dedicated game-over broadcast arrived.
    GameOverMessage,
}

/// Outcome of the game as far as this session knows.
///
/// Once `Completed`, it never returns to `InProgress`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GameOutcome {
    /// Still being played.
    #[default]
    InProgress,
    /// Finished.
    Completed {
        /// What ended it.
        reason: CompletionReason,
        /// Message to show the player.
        message: String,
    },
}

impl GameOutcome {
    /// Whether the game is over.
    pub fn is_completed(&self) -> bool {
        matches!(self, GameOutcome::Completed { .. })
    }

    /// Result message, if completed.
    pub fn message(&self) -> Option<&str> {
        match self {
            GameOutcome::InProgress => None,
            GameOutcome::Completed { message, .. } => Some(message),
        }
    }
}
