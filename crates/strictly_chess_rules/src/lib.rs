//! Chess vocabulary and rules-engine adapter for strictly_chess.
//!
//! The client treats chess rules as a black box behind [`RulesEngine`].
//! [`StandardRules`] implements that contract for standard chess on top
//! of shakmaty.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod engine;
mod error;
mod standard;
mod types;

pub use engine::{GameEnd, RulesEngine};
pub use error::{RejectKind, Rejected};
pub use standard::{StandardPosition, StandardRules, reaches_promotion_rank};
pub use types::{MoveToken, Piece, PieceKind, Promotion, Side, Square};
