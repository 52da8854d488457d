//! Out-of-band game control over HTTP.
//!
//! Resign and undo are fire-and-forget: their effect is observed through
//! the next broadcast on the push channel, never through the response.

use crate::error::{SyncError, SyncErrorKind};
use crate::protocol::GameId;
use tracing::{debug, info, instrument, warn};

/// A control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ControlAction {
    /// Give up the game.
    Resign,
    /// Take back the last move.
    Undo,
}

/// Sends control requests for a game.
#[async_trait::async_trait]
pub trait GameControl: Send + Sync {
    /// Resigns the game.
    async fn resign(&self, game_id: &GameId) -> Result<(), SyncError>;

    /// Asks the server to take back the last move.
    async fn undo(&self, game_id: &GameId) -> Result<(), SyncError>;
}

/// [`GameControl`] over the game server's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpControl {
    /// Base URL of the game server.
    base_url: String,
    /// HTTP client.
    client: reqwest::Client,
}

impl HttpControl {
    /// Creates a control client for `base_url` (no trailing slash needed).
    #[instrument(skip_all, fields(base_url = %base_url.as_ref()))]
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// URL for `action` on `game_id`.
    pub fn endpoint(&self, game_id: &GameId, action: ControlAction) -> String {
        format!("{}/game/{}/{}", self.base_url, game_id, action)
    }

    #[instrument(skip(self), fields(%game_id, %action))]
    async fn send(&self, game_id: &GameId, action: ControlAction) -> Result<(), SyncError> {
        let url = self.endpoint(game_id, action);
        debug!(url = %url, "Sending control request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Control request failed");
                SyncError::new(SyncErrorKind::Control(format!("{action}: {e}")))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Control request rejected");
            return Err(SyncError::new(SyncErrorKind::Control(format!(
                "{action}: server returned {status}"
            ))));
        }

        info!("Control request accepted");
        Ok(())
    }
}

#[async_trait::async_trait]
impl GameControl for HttpControl {
    async fn resign(&self, game_id: &GameId) -> Result<(), SyncError> {
        self.send(game_id, ControlAction::Resign).await
    }

    async fn undo(&self, game_id: &GameId) -> Result<(), SyncError> {
        self.send(game_id, ControlAction::Undo).await
    }
}
