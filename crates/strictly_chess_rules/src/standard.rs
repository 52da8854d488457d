//! Standard chess rules backed by shakmaty.

use crate::engine::{GameEnd, RulesEngine};
use crate::error::{RejectKind, Rejected};
use crate::types::{MoveToken, Piece, PieceKind, Side, Square};
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _, fen::Fen, uci::UciMove};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// A standard chess position.
///
/// Two positions are equal when their canonical FEN snapshots are equal,
/// so a replayed position and a parsed snapshot of the same game compare
/// equal.
#[derive(Debug, Clone)]
pub struct StandardPosition {
    inner: Chess,
}

impl StandardPosition {
    /// Canonical FEN; the en passant square is only emitted when a
    /// capture is actually possible.
    pub fn fen(&self) -> String {
        Fen::from_position(self.inner.clone(), EnPassantMode::Legal).to_string()
    }
}

impl Default for StandardPosition {
    fn default() -> Self {
        Self {
            inner: Chess::default(),
        }
    }
}

impl PartialEq for StandardPosition {
    fn eq(&self, other: &Self) -> bool {
        self.fen() == other.fen()
    }
}

impl Eq for StandardPosition {}

/// Standard chess rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl StandardRules {
    /// Creates the rules adapter.
    pub fn new() -> Self {
        Self
    }

    /// Drops a promotion letter on moves that do not promote.
    ///
    /// The server records whatever promotion the client sent, and clients
    /// send one on every move, so `e2e4q` must mean `e2e4`.
    fn normalize(position: &Chess, token: MoveToken) -> MoveToken {
        if token.promotion.is_none() {
            return token;
        }
        let from: shakmaty::Square = token.from.into();
        let promotes = position.board().piece_at(from).is_some_and(|p| {
            p.role == shakmaty::Role::Pawn
                && token.to.rank() == Side::from(p.color).promotion_rank()
        });
        if promotes { token } else { token.without_promotion() }
    }
}

impl RulesEngine for StandardRules {
    type Position = StandardPosition;

    fn initial_position(&self) -> StandardPosition {
        StandardPosition::default()
    }

    #[instrument(skip(self, position), fields(square = %square))]
    fn legal_destinations(&self, position: &StandardPosition, square: Square) -> BTreeSet<Square> {
        let origin: shakmaty::Square = square.into();
        let destinations: BTreeSet<Square> = position
            .inner
            .legal_moves()
            .iter()
            .filter(|m| m.from() == Some(origin))
            .filter_map(|m| match UciMove::from_move(m, CastlingMode::Standard) {
                UciMove::Normal { to, .. } => Some(Square::from(to)),
                _ => None,
            })
            .collect();
        debug!(count = destinations.len(), "Computed legal destinations");
        destinations
    }

    #[instrument(skip(self, position), fields(token = %token))]
    fn apply_move(
        &self,
        position: &StandardPosition,
        token: &MoveToken,
    ) -> Result<StandardPosition, Rejected> {
        let token = Self::normalize(&position.inner, *token);
        let uci: UciMove = token
            .to_string()
            .parse()
            .map_err(|_| Rejected::new(RejectKind::MalformedToken(token.to_string())))?;
        let m = uci
            .to_move(&position.inner)
            .map_err(|_| Rejected::new(RejectKind::IllegalMove(token.to_string())))?;
        let inner = position
            .inner
            .clone()
            .play(&m)
            .map_err(|_| Rejected::new(RejectKind::IllegalMove(token.to_string())))?;
        Ok(StandardPosition { inner })
    }

    #[instrument(skip(self))]
    fn position_from_snapshot(&self, snapshot: &str) -> Result<StandardPosition, Rejected> {
        let fen: Fen = snapshot
            .trim()
            .parse()
            .map_err(|e| Rejected::new(RejectKind::InvalidSnapshot(format!("{e}"))))?;
        let inner: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| Rejected::new(RejectKind::InvalidSnapshot(format!("{e}"))))?;
        Ok(StandardPosition { inner })
    }

    fn snapshot(&self, position: &StandardPosition) -> String {
        position.fen()
    }

    fn side_to_move(&self, position: &StandardPosition) -> Side {
        position.inner.turn().into()
    }

    fn piece_at(&self, position: &StandardPosition, square: Square) -> Option<Piece> {
        position.inner.board().piece_at(square.into()).map(Piece::from)
    }

    fn game_end(&self, position: &StandardPosition) -> Option<GameEnd> {
        let inner = &position.inner;
        if inner.is_checkmate() {
            Some(GameEnd::Checkmate(Side::from(inner.turn()).opponent()))
        } else if inner.is_stalemate() {
            Some(GameEnd::Stalemate)
        } else if inner.is_insufficient_material() {
            Some(GameEnd::InsufficientMaterial)
        } else {
            None
        }
    }
}

/// Whether moving `piece` to `to` lands a pawn on its promotion rank.
pub fn reaches_promotion_rank(piece: Piece, to: Square) -> bool {
    piece.kind == PieceKind::Pawn && to.rank() == piece.side.promotion_rank()
}
