//! Core chess vocabulary shared by the client and the rules adapter.
//!
//! These types carry the side of a piece explicitly. Nothing in this crate
//! infers a side from the letter case of a piece symbol.

use crate::error::{RejectKind, Rejected};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::instrument;

/// Side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// White moves first.
    White,
    /// Black moves second.
    Black,
}

impl Side {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Rank (0-7) on which this side's pawns promote.
    pub fn promotion_rank(self) -> u8 {
        match self {
            Side::White => 7,
            Side::Black => 0,
        }
    }

    /// Display label ("White" / "Black").
    pub fn label(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }

    /// Parses the server's turn indicator ("WHITE", "black", "w", ...).
    #[instrument]
    pub fn from_indicator(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" | "w" => Some(Side::White),
            "black" | "b" => Some(Side::Black),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<shakmaty::Color> for Side {
    fn from(c: shakmaty::Color) -> Self {
        match c {
            shakmaty::Color::White => Side::White,
            shakmaty::Color::Black => Side::Black,
        }
    }
}

impl From<Side> for shakmaty::Color {
    fn from(s: Side) -> Self {
        match s {
            Side::White => shakmaty::Color::White,
            Side::Black => shakmaty::Color::Black,
        }
    }
}

/// Kind of chess piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    /// Pawn.
    Pawn,
    /// Knight.
    Knight,
    /// Bishop.
    Bishop,
    /// Rook.
    Rook,
    /// Queen.
    Queen,
    /// King.
    King,
}

impl From<shakmaty::Role> for PieceKind {
    fn from(r: shakmaty::Role) -> Self {
        match r {
            shakmaty::Role::Pawn => PieceKind::Pawn,
            shakmaty::Role::Knight => PieceKind::Knight,
            shakmaty::Role::Bishop => PieceKind::Bishop,
            shakmaty::Role::Rook => PieceKind::Rook,
            shakmaty::Role::Queen => PieceKind::Queen,
            shakmaty::Role::King => PieceKind::King,
        }
    }
}

/// A piece: kind plus an explicit side tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    /// Owning side.
    pub side: Side,
    /// Piece kind.
    pub kind: PieceKind,
}

impl Piece {
    /// Creates a new piece.
    pub fn new(side: Side, kind: PieceKind) -> Self {
        Self { side, kind }
    }
}

impl From<shakmaty::Piece> for Piece {
    fn from(p: shakmaty::Piece) -> Self {
        Self {
            side: p.color.into(),
            kind: p.role.into(),
        }
    }
}

/// A square on the board, a1 through h8.
///
/// Serialized as its algebraic name (`"e2"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square(u8);

impl Square {
    /// Creates a square from file (0-7, a-h) and rank (0-7, 1-8).
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self(rank * 8 + file))
        } else {
            None
        }
    }

    /// File index (0 = a).
    pub fn file(self) -> u8 {
        self.0 % 8
    }

    /// Rank index (0 = first rank).
    pub fn rank(self) -> u8 {
        self.0 / 8
    }
}

impl std::str::FromStr for Square {
    type Err = Rejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(Rejected::new(RejectKind::MalformedSquare(s.to_string())));
        }
        let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank)
            .ok_or_else(|| Rejected::new(RejectKind::MalformedSquare(s.to_string())))
    }
}

impl TryFrom<String> for Square {
    type Error = Rejected;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(sq: Square) -> Self {
        sq.to_string()
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = (b'a' + self.file()) as char;
        let rank = (b'1' + self.rank()) as char;
        write!(f, "{file}{rank}")
    }
}

impl From<shakmaty::Square> for Square {
    fn from(s: shakmaty::Square) -> Self {
        Self(s as u8)
    }
}

impl From<Square> for shakmaty::Square {
    fn from(s: Square) -> Self {
        // Square is always in range 0-63.
        shakmaty::Square::new(u32::from(s.0))
    }
}

/// Piece a pawn may promote to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::EnumIter,
)]
pub enum Promotion {
    /// Queen, the default choice.
    #[default]
    #[serde(rename = "q")]
    Queen,
    /// Rook.
    #[serde(rename = "r")]
    Rook,
    /// Bishop.
    #[serde(rename = "b")]
    Bishop,
    /// Knight.
    #[serde(rename = "n")]
    Knight,
}

impl Promotion {
    /// Compact letter used in move tokens.
    pub fn letter(self) -> char {
        match self {
            Promotion::Queen => 'q',
            Promotion::Rook => 'r',
            Promotion::Bishop => 'b',
            Promotion::Knight => 'n',
        }
    }

    /// Parses a promotion letter (case-insensitive).
    #[instrument]
    pub fn from_letter(c: char) -> Option<Self> {
        let c = c.to_ascii_lowercase();
        Promotion::iter().find(|p| p.letter() == c)
    }
}

impl From<Promotion> for shakmaty::Role {
    fn from(p: Promotion) -> Self {
        match p {
            Promotion::Queen => shakmaty::Role::Queen,
            Promotion::Rook => shakmaty::Role::Rook,
            Promotion::Bishop => shakmaty::Role::Bishop,
            Promotion::Knight => shakmaty::Role::Knight,
        }
    }
}

/// A compact move token such as `e2e4` or `e7e8q`.
///
/// Tokens are what the server records in its move list and what the
/// rules adapter consumes. They say nothing about legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveToken {
    /// Origin square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Promotion choice, if any.
    pub promotion: Option<Promotion>,
}

impl MoveToken {
    /// Creates a new token.
    pub fn new(from: Square, to: Square, promotion: Option<Promotion>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }

    /// Same token without a promotion letter.
    pub fn without_promotion(self) -> Self {
        Self {
            promotion: None,
            ..self
        }
    }
}

impl std::str::FromStr for MoveToken {
    type Err = Rejected;

    #[instrument(name = "parse_move_token")]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Rejected::new(RejectKind::MalformedToken(s.to_string()));
        let s_trim = s.trim();
        if !s_trim.is_ascii() || !(4..=5).contains(&s_trim.len()) {
            return Err(malformed());
        }

        let from: Square = s_trim[0..2].parse().map_err(|_| malformed())?;
        let to: Square = s_trim[2..4].parse().map_err(|_| malformed())?;
        let promotion = match s_trim[4..].chars().next() {
            Some(c) => Some(Promotion::from_letter(c).ok_or_else(malformed)?),
            None => None,
        };

        Ok(Self::new(from, to, promotion))
    }
}

impl std::fmt::Display for MoveToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{}", p.letter())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_parse_and_display() {
        let sq: Square = "e2".parse().unwrap();
        assert_eq!(sq.file(), 4);
        assert_eq!(sq.rank(), 1);
        assert_eq!(sq.to_string(), "e2");
        assert!("i9".parse::<Square>().is_err());
        assert!("e".parse::<Square>().is_err());
    }

    #[test]
    fn test_square_serde_as_name() {
        let sq: Square = "h8".parse().unwrap();
        assert_eq!(serde_json::to_string(&sq).unwrap(), "\"h8\"");
        let back: Square = serde_json::from_str("\"a1\"").unwrap();
        assert_eq!(back, Square::new(0, 0).unwrap());
    }

    #[test]
    fn test_square_shakmaty_conversion() {
        let sq: Square = "g7".parse().unwrap();
        let sm: shakmaty::Square = sq.into();
        assert_eq!(sm, shakmaty::Square::G7);
        assert_eq!(Square::from(sm), sq);
    }

    #[test]
    fn test_move_token_parse() {
        let t: MoveToken = "e7e8q".parse().unwrap();
        assert_eq!(t.from.to_string(), "e7");
        assert_eq!(t.to.to_string(), "e8");
        assert_eq!(t.promotion, Some(Promotion::Queen));
        assert_eq!(t.to_string(), "e7e8q");

        let t: MoveToken = "E2E4".parse().unwrap();
        assert_eq!(t.to_string(), "e2e4");
        assert_eq!(t.promotion, None);
    }

    #[test]
    fn test_move_token_rejects_garbage() {
        for bad in ["", "e2", "e2e9", "e2e4x", "e2e4qq", "zz99"] {
            let err = bad.parse::<MoveToken>().unwrap_err();
            assert!(matches!(err.kind, RejectKind::MalformedToken(_)), "{bad}");
        }
    }

    #[test]
    fn test_promotion_serde_letters() {
        assert_eq!(serde_json::to_string(&Promotion::Knight).unwrap(), "\"n\"");
        assert_eq!(Promotion::default(), Promotion::Queen);
        assert_eq!(Promotion::from_letter('R'), Some(Promotion::Rook));
        assert_eq!(Promotion::from_letter('k'), None);
    }

    #[test]
    fn test_side_indicator() {
        assert_eq!(Side::from_indicator("WHITE"), Some(Side::White));
        assert_eq!(Side::from_indicator("b"), Some(Side::Black));
        assert_eq!(Side::from_indicator("red"), None);
        assert_eq!(Side::White.opponent(), Side::Black);
    }
}
