//! Game synchronization engine.
//!
//! Holds the single authoritative position together with clocks,
//! connection state and outcome, and reconciles them against each
//! server broadcast in arrival order.
//!
//! A move list is preferred because it rebuilds history; a snapshot is
//! the fallback when replay fails. Reconciliation works on copies and
//! commits everything at once, so a rejected payload leaves no trace.

use crate::error::{SyncError, SyncErrorKind};
use crate::history::{HalfMove, MoveHistory, TurnAnnotation};
use crate::protocol::{BroadcastKind, GameBroadcast};
use crate::state::{ClockState, CompletionReason, ConnectionState, GameOutcome};
use crate::time_control::TimeControl;
use strictly_chess_rules::{
    MoveToken, RejectKind, Rejected, RulesEngine, Side, reaches_promotion_rank,
};
use tracing::{debug, error, info, instrument, warn};

/// Message used when the server ends a game without one.
pub const DEFAULT_GAME_OVER_MESSAGE: &str = "Game Over";

/// Where the position committed by a reconciliation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    /// Replayed from the move list.
    Replay {
        /// Plies replayed.
        plies: usize,
    },
    /// Adopted from the snapshot.
    Snapshot {
        /// Whether a move list was present but failed to replay.
        fallback: bool,
    },
    /// The broadcast carried no position.
    Unchanged,
}

/// Summary of one applied broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Origin of the committed position.
    pub source: PositionSource,
    /// Whether this broadcast completed the game.
    pub outcome_changed: bool,
}

impl Reconciliation {
    fn unchanged(outcome_changed: bool) -> Self {
        Self {
            source: PositionSource::Unchanged,
            outcome_changed,
        }
    }
}

/// Authoritative game state for one session.
#[derive(Debug, Clone)]
pub struct GameSync<R: RulesEngine> {
    rules: R,
    position: R::Position,
    clocks: ClockState,
    connection: ConnectionState,
    outcome: GameOutcome,
    status_line: String,
    history: MoveHistory,
    time_control: TimeControl,
}

impl<R: RulesEngine> GameSync<R> {
    /// Creates a fresh game at the rules engine's initial position.
    #[instrument(skip(rules))]
    pub fn new(rules: R, time_control: TimeControl) -> Self {
        let position = rules.initial_position();
        Self {
            rules,
            position,
            clocks: ClockState::for_time_control(time_control),
            connection: ConnectionState::Disconnected,
            outcome: GameOutcome::InProgress,
            status_line: "Connecting to server...".to_string(),
            history: MoveHistory::new(),
            time_control,
        }
    }

    /// Rules engine in use.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// The authoritative position.
    pub fn position(&self) -> &R::Position {
        &self.position
    }

    /// Last clocks reported by the server.
    pub fn clocks(&self) -> ClockState {
        self.clocks
    }

    /// Channel state.
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Game outcome.
    pub fn outcome(&self) -> &GameOutcome {
        &self.outcome
    }

    /// Diagnostic status line.
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// Paired move history.
    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    /// Time control used for turn annotations.
    pub fn time_control(&self) -> TimeControl {
        self.time_control
    }

    /// Side to move in the authoritative position.
    pub fn side_to_move(&self) -> Side {
        self.rules.side_to_move(&self.position)
    }

    /// Decodes a frame body and reconciles it.
    ///
    /// # Errors
    ///
    /// Returns a malformed-payload error for undecodable frames, or any
    /// error from [`GameSync::reconcile`]. State is unchanged on error.
    #[instrument(skip(self, body))]
    pub fn reconcile_frame(&mut self, body: &str) -> Result<Reconciliation, SyncError> {
        let broadcast = GameBroadcast::decode(body).inspect_err(|e| {
            warn!(error = %e, "Dropping undecodable broadcast");
        })?;
        self.reconcile(&broadcast)
    }

    /// Applies one authoritative broadcast.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload` when a move broadcast lacks either clock.
    /// - `NoUsablePosition` when neither the move list nor the snapshot
    ///   yields a position.
    /// - `HistoryFault` when replayed plies cannot be paired.
    ///
    /// Nothing is mutated when an error is returned.
    #[instrument(skip(self, broadcast), fields(kind = ?broadcast.kind))]
    pub fn reconcile(&mut self, broadcast: &GameBroadcast) -> Result<Reconciliation, SyncError> {
        match broadcast.kind {
            BroadcastKind::Move => self.reconcile_move(broadcast),
            BroadcastKind::GameOver => Ok(self.reconcile_game_over(broadcast)),
            BroadcastKind::Error => {
                let detail = broadcast
                    .status
                    .as_deref()
                    .or(broadcast.message.as_deref())
                    .unwrap_or("unknown");
                warn!(detail, "Server reported an error");
                self.status_line = format!("Error: {detail}");
                Ok(Reconciliation::unchanged(false))
            }
        }
    }

    fn reconcile_move(&mut self, broadcast: &GameBroadcast) -> Result<Reconciliation, SyncError> {
        let (Some(white), Some(black)) = (broadcast.white_time_left, broadcast.black_time_left)
        else {
            warn!("Move broadcast without both clocks");
            return Err(SyncError::new(SyncErrorKind::MalformedPayload(
                "move broadcast is missing clock values".to_string(),
            )));
        };
        let clocks = ClockState::new(white, black);

        let replayed = broadcast.move_list().map(|list| self.replay(list));
        let (position, history, source) = match replayed {
            Some(Ok((position, plies))) => {
                let count = plies.len();
                let history = self.merge_history(plies, clocks)?;
                (position, history, PositionSource::Replay { plies: count })
            }
            Some(Err(rejected)) => {
                warn!(error = %rejected, "Move list replay failed, falling back to snapshot");
                let position = self.adopt_snapshot(broadcast)?;
                (
                    position,
                    self.history.clone(),
                    PositionSource::Snapshot { fallback: true },
                )
            }
            None => {
                let position = self.adopt_snapshot(broadcast)?;
                (
                    position,
                    self.history.clone(),
                    PositionSource::Snapshot { fallback: false },
                )
            }
        };

        self.position = position;
        self.clocks = clocks;
        self.history = history;

        if let Some(end) = self.rules.game_end(&self.position) {
            debug!(?end, "Rules engine reports a terminal position");
        }

        let turn = broadcast
            .current_turn
            .as_deref()
            .and_then(Side::from_indicator)
            .unwrap_or_else(|| self.side_to_move());
        self.status_line = format!("Opponent moved. Turn: {turn}");

        let outcome_changed = match broadcast.status.as_deref() {
            Some(status) if broadcast.is_terminal() => self.complete(
                CompletionReason::ServerStatus(status.to_string()),
                broadcast.message.as_deref(),
            ),
            _ => false,
        };

        info!(
            ?source,
            white = clocks.white,
            black = clocks.black,
            turns = self.history.len(),
            "Reconciled move broadcast"
        );
        Ok(Reconciliation {
            source,
            outcome_changed,
        })
    }

    fn reconcile_game_over(&mut self, broadcast: &GameBroadcast) -> Reconciliation {
        if let (Some(white), Some(black)) = (broadcast.white_time_left, broadcast.black_time_left) {
            self.clocks = ClockState::new(white, black);
        }
        let changed = self.complete(
            CompletionReason::GameOverMessage,
            broadcast.message.as_deref(),
        );
        Reconciliation::unchanged(changed)
    }

    /// Replays a move list from the initial position.
    ///
    /// Each token must name a piece of the side to move. A promotion
    /// letter on a move that does not promote is ignored.
    #[instrument(skip(self))]
    fn replay(&self, list: &str) -> Result<(R::Position, Vec<HalfMove>), Rejected> {
        let mut position = self.rules.initial_position();
        let mut plies = Vec::new();

        for raw in list.split_whitespace() {
            let token: MoveToken = raw.parse()?;
            let Some(piece) = self.rules.piece_at(&position, token.from) else {
                return Err(Rejected::new(RejectKind::IllegalMove(format!(
                    "{raw}: no piece on {}",
                    token.from
                ))));
            };
            let to_move = self.rules.side_to_move(&position);
            if piece.side != to_move {
                return Err(Rejected::new(RejectKind::IllegalMove(format!(
                    "{raw}: {} to move",
                    to_move
                ))));
            }

            let token = if reaches_promotion_rank(piece, token.to) {
                token
            } else {
                token.without_promotion()
            };
            position = self.rules.apply_move(&position, &token)?;
            debug!(token = %token, ply = plies.len() + 1, "Replayed ply");
            plies.push(HalfMove::new(
                token.from,
                token.to,
                piece,
                token.promotion,
                token.to_string(),
            ));
        }

        Ok((position, plies))
    }

    fn adopt_snapshot(&self, broadcast: &GameBroadcast) -> Result<R::Position, SyncError> {
        let Some(snapshot) = broadcast.snapshot() else {
            warn!("Broadcast has no usable move list or snapshot");
            return Err(SyncError::new(SyncErrorKind::NoUsablePosition));
        };
        self.rules
            .position_from_snapshot(snapshot)
            .map_err(|rejected| {
                warn!(error = %rejected, "Snapshot rejected");
                SyncError::new(SyncErrorKind::NoUsablePosition)
            })
    }

    /// Folds replayed plies into a copy of the current history.
    ///
    /// Appends only the new tail when the recorded plies are a prefix of
    /// the replay, otherwise starts over from the replay.
    fn merge_history(
        &self,
        plies: Vec<HalfMove>,
        clocks: ClockState,
    ) -> Result<MoveHistory, SyncError> {
        let recorded = self.history.ply_count();
        let is_prefix = recorded <= plies.len()
            && self.history.plies().zip(plies.iter()).all(|(a, b)| a == b);

        let (mut history, tail) = if is_prefix {
            (self.history.clone(), plies.into_iter().skip(recorded).collect::<Vec<_>>())
        } else {
            warn!(
                recorded,
                replayed = plies.len(),
                "Recorded history diverges from move list, rebuilding"
            );
            (MoveHistory::new(), plies)
        };

        let last = tail.len().saturating_sub(1);
        for (i, half_move) in tail.into_iter().enumerate() {
            let side = half_move.side();
            let remaining = (i == last).then_some(match side {
                Side::White => clocks.white,
                Side::Black => clocks.black,
            });
            let label = format!("{}'s Turn: {}", side.label(), self.time_control.description());
            history.append(half_move, TurnAnnotation::new(label, remaining))?;
        }
        Ok(history)
    }

    /// Marks the game completed. Returns whether the outcome changed.
    fn complete(&mut self, reason: CompletionReason, message: Option<&str>) -> bool {
        if self.outcome.is_completed() {
            debug!(?reason, "Game already completed, keeping first outcome");
            return false;
        }
        let message = message.unwrap_or(DEFAULT_GAME_OVER_MESSAGE).to_string();
        info!(?reason, %message, "Game completed");
        self.outcome = GameOutcome::Completed { reason, message };
        true
    }

    /// Records that a connect was requested.
    #[instrument(skip(self))]
    pub fn on_connecting(&mut self) {
        self.connection = ConnectionState::Connecting;
        self.status_line = "Connecting to server...".to_string();
    }

    /// Records a confirmed handshake.
    #[instrument(skip(self))]
    pub fn on_connected(&mut self) {
        self.connection = ConnectionState::Connected;
        self.status_line = "Connected to Game Server".to_string();
        info!("Connected to game server");
    }

    /// Records a connection failure. Game state is kept.
    #[instrument(skip(self))]
    pub fn on_connection_error(&mut self, message: &str) {
        self.connection = ConnectionState::Disconnected;
        self.status_line = "Connection Error".to_string();
        warn!(message, "Connection error");
    }

    /// Records a broker protocol error. Connection state is kept.
    #[instrument(skip(self))]
    pub fn on_protocol_error(&mut self, message: &str) {
        self.status_line = format!("Broker error: {message}");
        error!(message, "Broker reported error");
    }

    /// Records a deliberate disconnect.
    #[instrument(skip(self))]
    pub fn on_disconnected(&mut self) {
        self.connection = ConnectionState::Disconnected;
        info!("Disconnected");
    }

    pub(crate) fn set_status(&mut self, line: impl Into<String>) {
        self.status_line = line.into();
    }

    /// Returns to the initial position with empty history.
    ///
    /// Connection state is kept. Callers must refuse this once the game
    /// is completed.
    pub(crate) fn reset_local(&mut self) {
        self.position = self.rules.initial_position();
        self.clocks = ClockState::for_time_control(self.time_control);
        self.history = MoveHistory::new();
        self.status_line = "Game reset".to_string();
        info!("Local game state reset");
    }
}
