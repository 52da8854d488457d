//! Client configuration.

use crate::protocol::GameId;
use crate::time_control::TimeControl;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable overriding [`ClientConfig::server_url`].
pub const SERVER_URL_ENV: &str = "STRICTLY_CHESS_SERVER_URL";

/// Configuration for the chess client.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for out-of-band HTTP control.
    #[serde(default = "default_server_url")]
    server_url: String,

    /// Game to follow.
    #[serde(default)]
    game_id: GameId,

    /// Time control used for turn annotations and starting clocks.
    #[serde(default = "default_time_control")]
    time_control: TimeControl,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_time_control() -> TimeControl {
    TimeControl::Rapid
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            game_id: GameId::default(),
            time_control: default_time_control(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(game_id = %config.game_id, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise, then applies
    /// environment overrides.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            debug!("Config file not found, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            debug!(server_url = %url, "Server URL overridden from environment");
            config.server_url = url;
        }
        Ok(config)
    }

    /// Returns a copy following `game_id`.
    pub fn with_game_id(mut self, game_id: GameId) -> Self {
        self.game_id = game_id;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
