//! Rejection errors raised by the rules adapter.

use derive_more::{Display, Error};

/// Why the rules adapter refused an input.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RejectKind {
    /// A square name could not be parsed.
    #[display("Malformed square: {}", _0)]
    MalformedSquare(String),

    /// A compact move token could not be parsed.
    #[display("Malformed move token: {}", _0)]
    MalformedToken(String),

    /// The move is not legal in the given position.
    #[display("Illegal move: {}", _0)]
    IllegalMove(String),

    /// A board snapshot could not be turned into a position.
    #[display("Invalid snapshot: {}", _0)]
    InvalidSnapshot(String),
}

/// Rejection with caller location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Rejected: {} at {}:{}", kind, file, line)]
pub struct Rejected {
    /// What was rejected.
    pub kind: RejectKind,
    /// Line number where the rejection was raised.
    pub line: u32,
    /// Source file where the rejection was raised.
    pub file: &'static str,
}

impl Rejected {
    /// Creates a new rejection at the caller's location.
    #[track_caller]
    pub fn new(kind: RejectKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
