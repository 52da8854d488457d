//! Invariants of the move history.
//!
//! Checked after every append in debug builds and testable on their own.

use super::MoveHistory;
use strictly_chess_rules::Side;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }

        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Every turn but the last has black's reply.
pub struct PairedTurnsInvariant;

impl Invariant<MoveHistory> for PairedTurnsInvariant {
    fn holds(history: &MoveHistory) -> bool {
        let turns = history.turns();
        match turns.split_last() {
            None => true,
            Some((_, earlier)) => earlier.iter().all(|t| t.is_complete()),
        }
    }

    fn description() -> &'static str {
        "Only the most recent turn may be waiting for black"
    }
}

/// White slots hold white moves and black slots hold black moves.
pub struct SideTagInvariant;

impl Invariant<MoveHistory> for SideTagInvariant {
    fn holds(history: &MoveHistory) -> bool {
        history.turns().iter().all(|t| {
            t.white().side() == Side::White
                && t.black().as_ref().is_none_or(|b| b.side() == Side::Black)
        })
    }

    fn description() -> &'static str {
        "Turn slots match the side tag of their half-moves"
    }
}

/// All history invariants as a composable set.
pub type HistoryInvariants = (PairedTurnsInvariant, SideTagInvariant);
