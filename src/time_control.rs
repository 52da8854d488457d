//! Time controls offered by the game server.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::instrument;

/// Time control of a game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeControl {
    /// No time limit.
    #[default]
    Standard,
    /// Ten minutes, no increment.
    Rapid,
    /// Three minutes plus one second per move.
    Blitz,
}

impl TimeControl {
    /// Starting time per side, in seconds.
    pub fn initial_seconds(self) -> u64 {
        match self {
            TimeControl::Standard => 0,
            TimeControl::Rapid => 600,
            TimeControl::Blitz => 180,
        }
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            TimeControl::Standard => "Standard - No time limit",
            TimeControl::Rapid => "Rapid - 10 minutes",
            TimeControl::Blitz => "Blitz - 3 minutes + 1 second increment",
        }
    }

    /// Wire name ("STANDARD", "RAPID", "BLITZ").
    pub fn name(self) -> &'static str {
        match self {
            TimeControl::Standard => "STANDARD",
            TimeControl::Rapid => "RAPID",
            TimeControl::Blitz => "BLITZ",
        }
    }

    /// Parses a name case-insensitively; absent or unknown names mean
    /// [`TimeControl::Standard`].
    #[instrument]
    pub fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return TimeControl::Standard;
        };
        TimeControl::iter()
            .find(|tc| tc.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
