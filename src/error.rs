//! Error types for the synchronization core.

use derive_more::{Display, Error};
use strictly_chess_rules::Rejected;
use tracing::instrument;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SyncErrorKind {
    /// Inbound payload could not be decoded or is inconsistent.
    #[display("Malformed payload: {}", _0)]
    MalformedPayload(String),

    /// Neither a usable move list nor a usable snapshot was present.
    #[display("No usable position in payload")]
    NoUsablePosition,

    /// Move history received a half-move it cannot place.
    #[display("History fault: {}", _0)]
    HistoryFault(String),

    /// Operation needs a connected channel.
    #[display("Not connected")]
    NotConnected,

    /// Transport channel refused an operation.
    #[display("Transport error: {}", _0)]
    Transport(String),

    /// Out-of-band control request failed.
    #[display("Control request failed: {}", _0)]
    Control(String),

    /// The game has already been completed in this session.
    #[display("Game is already over")]
    GameCompleted,
}

/// Synchronization error with caller location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Sync error: {} at {}:{}", kind, file, line)]
pub struct SyncError {
    /// Error kind.
    pub kind: SyncErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SyncError {
    /// Creates a new error at the caller's location.
    #[track_caller]
    #[instrument(skip(kind))]
    pub fn new(kind: SyncErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(SyncErrorKind::MalformedPayload(err.to_string()))
    }
}

impl From<Rejected> for SyncError {
    #[track_caller]
    fn from(err: Rejected) -> Self {
        Self::new(SyncErrorKind::MalformedPayload(err.kind.to_string()))
    }
}
