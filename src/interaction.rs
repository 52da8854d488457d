//! Interaction controller: board gestures to published move requests.
//!
//! Moves are checked against a disposable copy of the authoritative
//! position and then published. The authoritative position is never
//! advanced here; the next server broadcast confirms or corrects.

use crate::error::SyncError;
use crate::protocol::{GameId, MOVE_DESTINATION, MoveRequest};
use crate::state::ConnectionState;
use crate::sync::GameSync;
use crate::transport::TransportChannel;
use std::collections::{BTreeMap, BTreeSet};
use strictly_chess_rules::{MoveToken, Promotion, RulesEngine, Square, reaches_promotion_rank};
use tracing::{debug, info, instrument, warn};

/// Status line shown when a move is attempted without a connection.
pub const NOT_CONNECTED_MESSAGE: &str = "Not connected! Move not sent.";

/// Transient gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    /// Nothing selected.
    #[default]
    Idle,
    /// A square was clicked and its destinations are highlighted.
    SquareSelected(Square),
    /// A piece is being dragged; destinations are highlighted only.
    OptionsHighlighted(Square),
}

/// Visual weight of a highlighted square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// The selected piece.
    Origin,
    /// A legal destination on an empty square.
    QuietTarget,
    /// A legal destination holding an opposing piece.
    CaptureTarget,
}

/// Result of a move attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveAttempt {
    /// Legal and sent to the server.
    Published(MoveRequest),
    /// Refused by the local rules check. Nothing was sent.
    Illegal,
    /// Legal but the channel is not connected. Nothing was sent.
    NotConnected,
}

/// What a left-click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The square became the selected origin.
    Selected {
        /// Number of legal destinations highlighted.
        destinations: usize,
    },
    /// Nothing to select there; selection cleared.
    Cleared,
    /// The click completed a move attempt.
    Attempted(MoveAttempt),
}

/// Turns gestures into validated move requests.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    state: InteractionState,
    highlights: BTreeMap<Square, Highlight>,
    marks: BTreeSet<Square>,
}

impl InteractionController {
    /// Creates an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gesture state.
    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Highlighted squares.
    pub fn highlights(&self) -> &BTreeMap<Square, Highlight> {
        &self.highlights
    }

    /// Right-click marks.
    pub fn marks(&self) -> &BTreeSet<Square> {
        &self.marks
    }

    /// Left-click on `square`.
    ///
    /// With an origin selected, clicking one of its destinations in the
    /// current position attempts the move. Any other click re-evaluates
    /// `square` as a new origin.
    /// Every left-click clears the right-click marks.
    ///
    /// # Errors
    ///
    /// Returns an error only when a legal move could not be handed to the
    /// channel.
    #[instrument(skip(self, sync, channel), fields(%square))]
    pub fn select_or_move<R, T>(
        &mut self,
        sync: &mut GameSync<R>,
        channel: &mut T,
        game_id: &GameId,
        square: Square,
    ) -> Result<ClickOutcome, SyncError>
    where
        R: RulesEngine,
        T: TransportChannel + ?Sized,
    {
        self.marks.clear();

        // Highlights may predate the last broadcast; ask the rules again.
        if let InteractionState::SquareSelected(origin) = self.state {
            let is_target = sync
                .rules()
                .legal_destinations(sync.position(), origin)
                .contains(&square);
            if is_target {
                let attempt = self.attempt_move(sync, channel, game_id, origin, square, None)?;
                return Ok(ClickOutcome::Attempted(attempt));
            }
        }

        let destinations = self.show_options(sync, square);
        if destinations == 0 {
            debug!("No legal moves from square");
            self.reset();
            return Ok(ClickOutcome::Cleared);
        }
        self.state = InteractionState::SquareSelected(square);
        debug!(destinations, "Selected origin");
        Ok(ClickOutcome::Selected { destinations })
    }

    /// Drag start on `square`: highlights its destinations.
    ///
    /// Returns the number of legal destinations.
    #[instrument(skip(self, sync), fields(%square))]
    pub fn begin_drag<R: RulesEngine>(&mut self, sync: &GameSync<R>, square: Square) -> usize {
        let destinations = self.show_options(sync, square);
        self.state = if destinations == 0 {
            self.highlights.clear();
            InteractionState::Idle
        } else {
            InteractionState::OptionsHighlighted(square)
        };
        destinations
    }

    /// Drop of a dragged piece from `origin` onto `destination`.
    ///
    /// # Errors
    ///
    /// See [`InteractionController::attempt_move`].
    #[instrument(skip(self, sync, channel), fields(%origin, %destination))]
    pub fn drop_piece<R, T>(
        &mut self,
        sync: &mut GameSync<R>,
        channel: &mut T,
        game_id: &GameId,
        origin: Square,
        destination: Square,
    ) -> Result<MoveAttempt, SyncError>
    where
        R: RulesEngine,
        T: TransportChannel + ?Sized,
    {
        self.attempt_move(sync, channel, game_id, origin, destination, None)
    }

    /// Right-click on `square`: toggles a user mark.
    #[instrument(skip(self), fields(%square))]
    pub fn toggle_mark(&mut self, square: Square) -> bool {
        let marked = if self.marks.remove(&square) {
            false
        } else {
            self.marks.insert(square)
        };
        debug!(marked, "Toggled mark");
        marked
    }

    /// Validates a move on a copy of the authoritative position and, if
    /// legal and connected, publishes it.
    ///
    /// A pawn reaching its last rank without an explicit choice promotes
    /// to a queen. Gesture state is reset whatever the result.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be encoded or the channel
    /// refuses the publish.
    #[instrument(skip(self, sync, channel), fields(%game_id, %origin, %destination))]
    pub fn attempt_move<R, T>(
        &mut self,
        sync: &mut GameSync<R>,
        channel: &mut T,
        game_id: &GameId,
        origin: Square,
        destination: Square,
        promotion: Option<Promotion>,
    ) -> Result<MoveAttempt, SyncError>
    where
        R: RulesEngine,
        T: TransportChannel + ?Sized,
    {
        self.reset();

        if sync.outcome().is_completed() {
            debug!("Game is over, move ignored");
            return Ok(MoveAttempt::Illegal);
        }

        let rules = sync.rules();
        let Some(piece) = rules.piece_at(sync.position(), origin) else {
            debug!("No piece on origin");
            return Ok(MoveAttempt::Illegal);
        };
        let promotion = promotion.or_else(|| {
            reaches_promotion_rank(piece, destination).then_some(Promotion::Queen)
        });
        let token = MoveToken::new(origin, destination, promotion);

        if let Err(rejected) = rules.apply_move(sync.position(), &token) {
            debug!(token = %token, error = %rejected, "Illegal move refused");
            return Ok(MoveAttempt::Illegal);
        }

        if sync.connection() != ConnectionState::Connected {
            warn!(token = %token, "Move not sent, channel not connected");
            sync.set_status(NOT_CONNECTED_MESSAGE);
            return Ok(MoveAttempt::NotConnected);
        }

        let request = MoveRequest::new(
            game_id.clone(),
            origin,
            destination,
            promotion.unwrap_or_default(),
        );
        let body = serde_json::to_string(&request)?;
        channel.publish(MOVE_DESTINATION, body)?;
        info!(token = %token, "Move published");
        Ok(MoveAttempt::Published(request))
    }

    /// Clears selection and highlights. Marks are kept.
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
        self.highlights.clear();
    }

    /// Clears everything, marks included.
    pub fn clear(&mut self) {
        self.reset();
        self.marks.clear();
    }

    fn show_options<R: RulesEngine>(&mut self, sync: &GameSync<R>, origin: Square) -> usize {
        self.highlights.clear();
        if sync.outcome().is_completed() {
            return 0;
        }

        let rules = sync.rules();
        let position = sync.position();
        let destinations = rules.legal_destinations(position, origin);
        if destinations.is_empty() {
            return 0;
        }

        let to_move = rules.side_to_move(position);
        self.highlights.insert(origin, Highlight::Origin);
        for dest in &destinations {
            let weight = match rules.piece_at(position, *dest) {
                Some(piece) if piece.side != to_move => Highlight::CaptureTarget,
                _ => Highlight::QuietTarget,
            };
            self.highlights.insert(*dest, weight);
        }
        destinations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_control::TimeControl;
    use crate::transport::LoopbackChannel;
    use strictly_chess_rules::StandardRules;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_toggle_mark_and_clear_on_click() {
        let mut sync = GameSync::new(StandardRules::new(), TimeControl::Rapid);
        let (mut channel, _injector, _rx) = LoopbackChannel::new();
        let mut controller = InteractionController::new();

        assert!(controller.toggle_mark(sq("d4")));
        assert!(controller.toggle_mark(sq("e5")));
        assert!(!controller.toggle_mark(sq("d4")));
        assert_eq!(controller.marks().len(), 1);

        controller
            .select_or_move(&mut sync, &mut channel, &GameId::default(), sq("a3"))
            .unwrap();
        assert!(controller.marks().is_empty());
    }

    #[test]
    fn test_begin_drag_highlights_only() {
        let sync = GameSync::new(StandardRules::new(), TimeControl::Rapid);
        let mut controller = InteractionController::new();
        assert_eq!(controller.begin_drag(&sync, sq("g1")), 2);
        assert_eq!(
            controller.state(),
            InteractionState::OptionsHighlighted(sq("g1"))
        );
        assert_eq!(controller.highlights().get(&sq("f3")), Some(&Highlight::QuietTarget));

        assert_eq!(controller.begin_drag(&sync, sq("g8")), 0);
        assert_eq!(controller.state(), InteractionState::Idle);
        assert!(controller.highlights().is_empty());
    }

    #[test]
    fn test_reselect_other_origin() {
        let mut sync = GameSync::new(StandardRules::new(), TimeControl::Rapid);
        let (mut channel, _injector, _rx) = LoopbackChannel::new();
        let mut controller = InteractionController::new();
        let id = GameId::default();

        controller.select_or_move(&mut sync, &mut channel, &id, sq("e2")).unwrap();
        let outcome = controller
            .select_or_move(&mut sync, &mut channel, &id, sq("b1"))
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Selected { destinations: 2 });
        assert_eq!(controller.state(), InteractionState::SquareSelected(sq("b1")));
        assert_eq!(controller.highlights().get(&sq("e2")), None);
    }
}
