//! Strictly Chess library - client-side game synchronization
//!
//! Keeps a two-player chess game in step with an authoritative server
//! over a push channel.
//!
//! # Architecture
//!
//! - **Sync**: the authoritative position, clocks and outcome, reconciled
//!   against each server broadcast
//! - **History**: half-moves paired into display turns
//! - **Interaction**: board gestures validated locally and published
//! - **Session**: one channel and one subscription per game
//!
//! Chess rules live in [`strictly_chess_rules`].
//!
//! # Example
//!
//! ```no_run
//! use strictly_chess::{GameId, GameSession, LoopbackChannel, StandardRules, TimeControl};
//!
//! # fn example() -> Result<(), strictly_chess::SyncError> {
//! let (channel, injector, mut events) = LoopbackChannel::new();
//! let mut session = GameSession::new(GameId::Number(1), StandardRules::new(), channel, TimeControl::Rapid);
//! session.start()?;
//! session.pump(&mut events);
//!
//! injector.deliver(&session.topic(), r#"{"type":"MOVE","pgn":"e2e4","whiteTimeLeft":598,"blackTimeLeft":600}"#)?;
//! session.pump(&mut events);
//! assert_eq!(session.sync().history().len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod control;
mod error;
mod history;
mod interaction;
mod protocol;
mod session;
mod state;
mod sync;
mod time_control;
mod transport;

// Crate-level exports - Configuration
pub use config::{ClientConfig, ConfigError, SERVER_URL_ENV};

// Crate-level exports - Out-of-band control
pub use control::{ControlAction, GameControl, HttpControl};

// Crate-level exports - Errors
pub use error::{SyncError, SyncErrorKind};

// Crate-level exports - Move history
pub use history::invariants::{
    HistoryInvariants, Invariant, InvariantSet, InvariantViolation, PairedTurnsInvariant,
    SideTagInvariant,
};
pub use history::{HalfMove, MoveHistory, TurnAnnotation, TurnRecord};

// Crate-level exports - Interaction
pub use interaction::{
    ClickOutcome, Highlight, InteractionController, InteractionState, MoveAttempt,
    NOT_CONNECTED_MESSAGE,
};

// Crate-level exports - Wire protocol
pub use protocol::{
    BroadcastKind, GameBroadcast, GameId, MOVE_DESTINATION, MoveRequest, TERMINAL_STATUSES,
};

// Crate-level exports - Session
pub use session::GameSession;

// Crate-level exports - State
pub use state::{
    ClockState, CompletionReason, ConnectionState, DEFAULT_CLOCK_SECONDS, GameOutcome,
};

// Crate-level exports - Synchronization engine
pub use sync::{DEFAULT_GAME_OVER_MESSAGE, GameSync, PositionSource, Reconciliation};

// Crate-level exports - Time control
pub use time_control::TimeControl;

// Crate-level exports - Transport
pub use transport::{
    ChannelCall, ChannelEvent, LoopbackChannel, LoopbackInjector, PublishedFrame, SubscriptionId,
    TransportChannel,
};

// Re-exported rules vocabulary
pub use strictly_chess_rules::{
    GameEnd, MoveToken, Piece, PieceKind, Promotion, RejectKind, Rejected, RulesEngine, Side,
    Square, StandardPosition, StandardRules,
};
