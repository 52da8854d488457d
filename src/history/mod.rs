//! Move history: half-moves folded into display turns.
//!
//! A turn is created by a white half-move and completed, in place and at
//! most once, by the following black half-move. Turns are never removed
//! or reordered.

pub mod invariants;

use crate::error::{SyncError, SyncErrorKind};
use derive_getters::Getters;
use derive_new::new;
use invariants::{HistoryInvariants, InvariantSet};
use serde::{Deserialize, Serialize};
use strictly_chess_rules::{Piece, Promotion, Side, Square};
use tracing::{debug, error, instrument};

/// One ply.
///
/// The moving side is the piece's explicit side tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct HalfMove {
    /// Origin square.
    from: Square,
    /// Destination square.
    to: Square,
    /// Piece that moved.
    piece: Piece,
    /// Promotion piece, when the move promoted.
    promotion: Option<Promotion>,
    /// Display label.
    label: String,
}

impl HalfMove {
    /// Side that made this move.
    pub fn side(&self) -> Side {
        self.piece.side
    }
}

/// Time-control annotation attached to a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct TurnAnnotation {
    /// Label such as `"Black's Turn: Rapid - 10 minutes"`.
    label: String,
    /// Remaining seconds of the side that just moved.
    remaining: Option<u64>,
}

/// A white half-move and, once it arrives, black's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TurnRecord {
    /// White's half-move.
    white: HalfMove,
    /// Black's reply, if it has arrived.
    black: Option<HalfMove>,
    /// Annotation from the last update of this turn.
    annotation: TurnAnnotation,
}

impl TurnRecord {
    fn open(white: HalfMove, annotation: TurnAnnotation) -> Self {
        Self {
            white,
            black: None,
            annotation,
        }
    }

    /// Whether black has replied.
    pub fn is_complete(&self) -> bool {
        self.black.is_some()
    }
}

/// Ordered, append-only list of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveHistory {
    turns: Vec<TurnRecord>,
}

impl MoveHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a half-move.
    ///
    /// White opens a new turn. Black completes the most recent turn in
    /// place, replacing its annotation.
    ///
    /// # Errors
    ///
    /// Returns a history fault when a black half-move has no open white
    /// turn to complete. The history is left unchanged.
    #[instrument(skip(self, annotation), fields(ply = %half_move.label(), side = %half_move.side()))]
    pub fn append(
        &mut self,
        half_move: HalfMove,
        annotation: TurnAnnotation,
    ) -> Result<(), SyncError> {
        match half_move.side() {
            Side::White => {
                self.turns.push(TurnRecord::open(half_move, annotation));
                debug!(turns = self.turns.len(), "Opened turn");
            }
            Side::Black => {
                let Some(turn) = self.turns.last_mut().filter(|t| t.black.is_none()) else {
                    error!(
                        turns = self.turns.len(),
                        "Black half-move without an open white turn"
                    );
                    return Err(SyncError::new(SyncErrorKind::HistoryFault(format!(
                        "black move {} has no pending white turn",
                        half_move.label()
                    ))));
                };
                turn.black = Some(half_move);
                turn.annotation = annotation;
                debug!(turns = self.turns.len(), "Completed turn");
            }
        }

        debug_assert!(
            HistoryInvariants::check_all(self).is_ok(),
            "History invariants violated"
        );
        Ok(())
    }

    /// All turns in order.
    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no move has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Half-moves in play order.
    pub fn plies(&self) -> impl Iterator<Item = &HalfMove> {
        self.turns
            .iter()
            .flat_map(|t| std::iter::once(&t.white).chain(t.black.as_ref()))
    }

    /// Number of half-moves.
    pub fn ply_count(&self) -> usize {
        self.plies().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_chess_rules::PieceKind;

    fn ply(side: Side, from: &str, to: &str) -> HalfMove {
        HalfMove::new(
            from.parse().unwrap(),
            to.parse().unwrap(),
            Piece::new(side, PieceKind::Pawn),
            None,
            format!("{from}{to}"),
        )
    }

    fn note(label: &str) -> TurnAnnotation {
        TurnAnnotation::new(label.to_string(), None)
    }

    #[test]
    fn test_black_completes_last_turn() {
        let mut history = MoveHistory::new();
        history.append(ply(Side::White, "e2", "e4"), note("w")).unwrap();
        assert!(!history.turns()[0].is_complete());

        history.append(ply(Side::Black, "e7", "e5"), note("b")).unwrap();
        assert_eq!(history.len(), 1);
        let turn = &history.turns()[0];
        assert_eq!(turn.black().as_ref().unwrap().label(), "e7e5");
        assert_eq!(turn.annotation().label(), "b");
    }

    #[test]
    fn test_black_first_is_fault() {
        let mut history = MoveHistory::new();
        let err = history
            .append(ply(Side::Black, "e7", "e5"), note("b"))
            .unwrap_err();
        assert!(matches!(err.kind, SyncErrorKind::HistoryFault(_)));
        assert!(history.is_empty());
    }

    #[test]
    fn test_black_twice_is_fault() {
        let mut history = MoveHistory::new();
        history.append(ply(Side::White, "e2", "e4"), note("w")).unwrap();
        history.append(ply(Side::Black, "e7", "e5"), note("b")).unwrap();
        let err = history
            .append(ply(Side::Black, "d7", "d5"), note("b2"))
            .unwrap_err();
        assert!(matches!(err.kind, SyncErrorKind::HistoryFault(_)));
        assert_eq!(history.turns()[0].black().as_ref().unwrap().label(), "e7e5");
    }

    #[test]
    fn test_plies_in_order() {
        let mut history = MoveHistory::new();
        history.append(ply(Side::White, "e2", "e4"), note("w")).unwrap();
        history.append(ply(Side::Black, "e7", "e5"), note("b")).unwrap();
        history.append(ply(Side::White, "g1", "f3"), note("w")).unwrap();
        let labels: Vec<_> = history.plies().map(|p| p.label().as_str()).collect();
        assert_eq!(labels, ["e2e4", "e7e5", "g1f3"]);
        assert_eq!(history.ply_count(), 3);
        assert_eq!(history.len(), 2);
    }
}
