//! Game session: one channel, one subscription, one game.
//!
//! The session owns its transport channel and ties the channel's
//! lifetime to its own. It subscribes to the game topic once, on the
//! first confirmed connection, and unsubscribes when closed or dropped.

use crate::control::GameControl;
use crate::error::{SyncError, SyncErrorKind};
use crate::interaction::{ClickOutcome, InteractionController, MoveAttempt};
use crate::protocol::GameId;
use crate::state::ConnectionState;
use crate::sync::{GameSync, Reconciliation};
use crate::time_control::TimeControl;
use crate::transport::{ChannelEvent, SubscriptionId, TransportChannel};
use strictly_chess_rules::{Promotion, RulesEngine, Square};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// A live game session.
#[derive(Debug)]
pub struct GameSession<R: RulesEngine, T: TransportChannel> {
    game_id: GameId,
    sync: GameSync<R>,
    controller: InteractionController,
    channel: T,
    subscription: Option<SubscriptionId>,
    started: bool,
    closed: bool,
}

impl<R: RulesEngine, T: TransportChannel> GameSession<R, T> {
    /// Creates a session. Nothing is sent until [`GameSession::start`].
    #[instrument(skip(rules, channel))]
    pub fn new(game_id: GameId, rules: R, channel: T, time_control: TimeControl) -> Self {
        info!(%game_id, "Creating game session");
        Self {
            game_id,
            sync: GameSync::new(rules, time_control),
            controller: InteractionController::new(),
            channel,
            subscription: None,
            started: false,
            closed: false,
        }
    }

    /// Game this session follows.
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Topic carrying this game's broadcasts.
    pub fn topic(&self) -> String {
        self.game_id.topic()
    }

    /// Synchronized game state.
    pub fn sync(&self) -> &GameSync<R> {
        &self.sync
    }

    /// Gesture state and highlights.
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// The session's channel.
    pub fn channel(&self) -> &T {
        &self.channel
    }

    /// Active subscription, once connected.
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    /// Whether [`GameSession::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Connects the channel. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the channel cannot connect, or
    /// `NotConnected` once the session is closed.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.closed {
            warn!("Start refused, session closed");
            return Err(SyncError::new(SyncErrorKind::NotConnected));
        }
        if self.started {
            debug!("Session already started");
            return Ok(());
        }
        self.sync.on_connecting();
        self.channel.connect()?;
        self.started = true;
        Ok(())
    }

    /// Handles one channel event.
    ///
    /// Returns the reconciliation summary for applied broadcasts.
    ///
    /// # Errors
    ///
    /// Returns the subscribe error on connect, or the reconciliation error
    /// for a rejected broadcast. Game state is unchanged on error.
    #[instrument(skip(self, event), fields(game_id = %self.game_id))]
    pub fn handle_event(
        &mut self,
        event: ChannelEvent,
    ) -> Result<Option<Reconciliation>, SyncError> {
        if self.closed {
            debug!(?event, "Session closed, event ignored");
            return Ok(None);
        }
        match event {
            ChannelEvent::Connected => {
                self.sync.on_connected();
                if self.subscription.is_none() {
                    let topic = self.topic();
                    let id = self.channel.subscribe(&topic)?;
                    info!(topic = %topic, "Subscribed to game topic");
                    self.subscription = Some(id);
                } else {
                    debug!("Reconnected, keeping existing subscription");
                }
                Ok(None)
            }
            ChannelEvent::ConnectionError(message) => {
                self.sync.on_connection_error(&message);
                Ok(None)
            }
            ChannelEvent::ProtocolError(message) => {
                self.sync.on_protocol_error(&message);
                Ok(None)
            }
            ChannelEvent::Message { subscription, body } => {
                if self.subscription != Some(subscription) {
                    debug!(subscription = subscription.0, "Ignoring frame for stale subscription");
                    return Ok(None);
                }
                self.sync.reconcile_frame(&body).map(Some)
            }
        }
    }

    /// Handles every event already queued, logging rejected ones.
    ///
    /// Returns the number of events handled.
    #[instrument(skip(self, events), fields(game_id = %self.game_id))]
    pub fn pump(&mut self, events: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            if let Err(e) = self.handle_event(event) {
                warn!(error = %e, "Event rejected");
            }
            handled += 1;
        }
        handled
    }

    /// Handles events until the sending side closes.
    #[instrument(skip(self, events), fields(game_id = %self.game_id))]
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<ChannelEvent>) {
        info!("Session event loop started");
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event) {
                warn!(error = %e, "Event rejected");
            }
        }
        info!("Session event loop ended");
    }

    /// Left-click on a square.
    ///
    /// # Errors
    ///
    /// See [`InteractionController::select_or_move`].
    pub fn select_square(&mut self, square: Square) -> Result<ClickOutcome, SyncError> {
        self.controller
            .select_or_move(&mut self.sync, &mut self.channel, &self.game_id, square)
    }

    /// Drag start on a square. Returns the number of destinations.
    pub fn begin_drag(&mut self, square: Square) -> usize {
        self.controller.begin_drag(&self.sync, square)
    }

    /// Drop of a dragged piece.
    ///
    /// # Errors
    ///
    /// See [`InteractionController::attempt_move`].
    pub fn drop_piece(
        &mut self,
        origin: Square,
        destination: Square,
    ) -> Result<MoveAttempt, SyncError> {
        self.controller.drop_piece(
            &mut self.sync,
            &mut self.channel,
            &self.game_id,
            origin,
            destination,
        )
    }

    /// Move with an explicit promotion choice.
    ///
    /// # Errors
    ///
    /// See [`InteractionController::attempt_move`].
    pub fn attempt_move(
        &mut self,
        origin: Square,
        destination: Square,
        promotion: Option<Promotion>,
    ) -> Result<MoveAttempt, SyncError> {
        self.controller.attempt_move(
            &mut self.sync,
            &mut self.channel,
            &self.game_id,
            origin,
            destination,
            promotion,
        )
    }

    /// Right-click on a square.
    pub fn toggle_mark(&mut self, square: Square) -> bool {
        self.controller.toggle_mark(square)
    }

    /// Resigns through `control`.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` while the channel is down, or the control
    /// error.
    #[instrument(skip(self, control), fields(game_id = %self.game_id))]
    pub async fn resign<C: GameControl + ?Sized>(&self, control: &C) -> Result<(), SyncError> {
        self.require_connected()?;
        control.resign(&self.game_id).await
    }

    /// Requests an undo through `control`.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` while the channel is down, or the control
    /// error.
    #[instrument(skip(self, control), fields(game_id = %self.game_id))]
    pub async fn undo<C: GameControl + ?Sized>(&self, control: &C) -> Result<(), SyncError> {
        self.require_connected()?;
        control.undo(&self.game_id).await
    }

    /// Returns the local view to a fresh game.
    ///
    /// # Errors
    ///
    /// Returns `GameCompleted` once the game has ended; open a new
    /// session instead.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub fn reset(&mut self) -> Result<(), SyncError> {
        if self.sync.outcome().is_completed() {
            warn!("Reset refused, game already completed");
            return Err(SyncError::new(SyncErrorKind::GameCompleted));
        }
        self.sync.reset_local();
        self.controller.clear();
        Ok(())
    }

    /// Unsubscribes and disconnects. Idempotent.
    ///
    /// The channel stays with the session and remains readable through
    /// [`GameSession::channel`]. Events arriving afterwards are ignored.
    /// Dropping an open session closes it the same way.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; disconnect is attempted even if
    /// unsubscribing fails.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub fn close(&mut self) -> Result<(), SyncError> {
        if self.closed {
            debug!("Session already closed");
            return Ok(());
        }
        self.closed = true;
        let unsubscribed = match self.subscription.take() {
            Some(id) => self.channel.unsubscribe(id),
            None => Ok(()),
        };
        let disconnected = self.channel.disconnect();
        self.sync.on_disconnected();
        self.controller.clear();
        unsubscribed.and(disconnected)?;
        info!("Session closed");
        Ok(())
    }

    fn require_connected(&self) -> Result<(), SyncError> {
        if self.sync.connection() == ConnectionState::Connected {
            Ok(())
        } else {
            Err(SyncError::new(SyncErrorKind::NotConnected))
        }
    }
}

impl<R: RulesEngine, T: TransportChannel> Drop for GameSession<R, T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        debug!(game_id = %self.game_id, "Closing session on drop");
        if let Err(e) = self.close() {
            warn!(error = %e, "Session teardown failed");
        }
    }
}
