//! Tests for pairing half-moves into turns.

use strictly_chess::{
    HalfMove, HistoryInvariants, InvariantSet, MoveHistory, Piece, PieceKind, Side, Square,
    SyncErrorKind, TurnAnnotation,
};

fn sq(s: &str) -> Square {
    s.parse().unwrap()
}

fn ply(side: Side, token: &str) -> HalfMove {
    HalfMove::new(
        sq(&token[0..2]),
        sq(&token[2..4]),
        Piece::new(side, PieceKind::Pawn),
        None,
        token.to_string(),
    )
}

fn note(side: Side, remaining: u64) -> TurnAnnotation {
    TurnAnnotation::new(format!("{side}'s Turn: Rapid - 10 minutes"), Some(remaining))
}

#[test]
fn test_one_turn_per_white_move() {
    let tokens = ["a2a3", "a7a6", "b2b3", "b7b6", "c2c3", "c7c6", "d2d3"];
    let mut history = MoveHistory::new();
    for (i, token) in tokens.iter().enumerate() {
        let side = if i % 2 == 0 { Side::White } else { Side::Black };
        history.append(ply(side, token), note(side, 600)).unwrap();
    }

    assert_eq!(history.len(), 4);
    for (i, turn) in history.turns().iter().enumerate() {
        assert_eq!(turn.white().label(), tokens[i * 2]);
        assert_eq!(
            turn.black().as_ref().map(|b| b.label().as_str()),
            tokens.get(i * 2 + 1).copied()
        );
    }
    assert!(HistoryInvariants::check_all(&history).is_ok());
}

#[test]
fn test_black_merge_replaces_annotation() {
    let mut history = MoveHistory::new();
    history
        .append(ply(Side::White, "e2e4"), note(Side::White, 598))
        .unwrap();
    assert_eq!(
        history.turns()[0].annotation().label(),
        "White's Turn: Rapid - 10 minutes"
    );

    history
        .append(ply(Side::Black, "e7e5"), note(Side::Black, 597))
        .unwrap();
    let annotation = history.turns()[0].annotation();
    assert_eq!(annotation.label(), "Black's Turn: Rapid - 10 minutes");
    assert_eq!(*annotation.remaining(), Some(597));
}

#[test]
fn test_black_without_white_is_reported() {
    let mut history = MoveHistory::new();
    let err = history
        .append(ply(Side::Black, "e7e5"), note(Side::Black, 600))
        .unwrap_err();
    assert!(matches!(err.kind, SyncErrorKind::HistoryFault(_)));
    assert!(history.is_empty());
}

#[test]
fn test_side_comes_from_piece_tag() {
    // A lowercase label does not make a move black.
    let half = HalfMove::new(
        sq("g1"),
        sq("f3"),
        Piece::new(Side::White, PieceKind::Knight),
        None,
        "g1f3".to_string(),
    );
    assert_eq!(half.side(), Side::White);
}
