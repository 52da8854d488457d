//! The rules-engine contract consumed by the client.
//!
//! The client never computes chess rules itself. Everything it needs to
//! know about legality, resulting positions and board contents goes
//! through [`RulesEngine`].

use crate::error::Rejected;
use crate::types::{MoveToken, Piece, Side, Square};
use std::collections::BTreeSet;

/// How a position ended, as judged by the rules engine.
///
/// Diagnostic only: the server decides when a game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnd {
    /// The given side delivered mate.
    Checkmate(Side),
    /// Side to move has no legal moves and is not in check.
    Stalemate,
    /// Neither side can mate.
    InsufficientMaterial,
}

/// Black-box chess rules.
///
/// Implementations must treat positions as values: no method mutates
/// the position it is given, so callers can keep an authoritative
/// position and compute speculative ones from it freely.
pub trait RulesEngine {
    /// Position type produced and consumed by this engine.
    type Position: Clone + PartialEq + std::fmt::Debug;

    /// The standard starting position.
    fn initial_position(&self) -> Self::Position;

    /// Legal destination squares for the piece on `square`.
    ///
    /// Empty when the square is empty or the piece cannot move.
    fn legal_destinations(&self, position: &Self::Position, square: Square) -> BTreeSet<Square>;

    /// Applies `token` to a copy of `position`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] when the move is illegal in `position`.
    fn apply_move(
        &self,
        position: &Self::Position,
        token: &MoveToken,
    ) -> Result<Self::Position, Rejected>;

    /// Builds a position from a full board snapshot without validating
    /// how it was reached.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] when the snapshot cannot be parsed.
    fn position_from_snapshot(&self, snapshot: &str) -> Result<Self::Position, Rejected>;

    /// Canonical snapshot string for `position`.
    fn snapshot(&self, position: &Self::Position) -> String;

    /// Side to move.
    fn side_to_move(&self, position: &Self::Position) -> Side;

    /// Piece standing on `square`, if any.
    fn piece_at(&self, position: &Self::Position, square: Square) -> Option<Piece>;

    /// Whether the position is terminal under the rules.
    fn game_end(&self, position: &Self::Position) -> Option<GameEnd>;
}
