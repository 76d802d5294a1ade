use meridian::board::{Piece, Position};
use meridian::moves::movegen::{generate_captures, generate_moves, square_attacked};
use meridian::moves::types::MoveList;

const FIXTURES: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
];

/// Walk the move tree asserting full legality: after every generated move the
/// mover's king must not be attacked.
fn assert_legal_tree(pos: &mut Position, depth: u32) {
    if depth == 0 {
        return;
    }
    let mut list = MoveList::new();
    generate_moves(pos, &mut list);
    for &mv in &list {
        pos.make_move(mv);
        let mover = !pos.side_to_move();
        assert!(
            !square_attacked(pos, pos.king_square(mover), pos.side_to_move(), pos.occupied()),
            "{mv} leaves the king hanging"
        );
        assert_legal_tree(pos, depth - 1);
        pos.unmake_move();
    }
}

#[test]
fn all_generated_moves_are_legal() {
    for fen in FIXTURES {
        let mut pos = Position::from_fen(fen).expect("valid fixture");
        assert_legal_tree(&mut pos, 2);
    }
}

#[test]
fn checkmate_has_no_moves() {
    // fool's mate
    let pos = Position::from_fen(
        "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
    )
    .unwrap();
    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    assert!(list.is_empty());
    assert!(pos.in_check());
}

#[test]
fn stalemate_has_no_moves_and_no_check() {
    let pos = Position::from_fen("k7/8/1Q6/8/8/8/8/7K b - - 0 1").unwrap();
    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    assert!(list.is_empty());
    assert!(!pos.in_check());
}

#[test]
fn captures_are_a_subset_of_all_moves() {
    for fen in FIXTURES {
        let pos = Position::from_fen(fen).unwrap();
        let mut all = MoveList::new();
        generate_moves(&pos, &mut all);
        let mut captures = MoveList::new();
        generate_captures(&pos, &mut captures);
        for &mv in &captures {
            assert!(all.contains(&mv), "{mv} generated only in capture mode");
        }
        // every non-promotion capture of the full list appears in capture mode
        for &mv in all.iter().filter(|m| m.is_capture() && !m.is_promotion()) {
            assert!(captures.contains(&mv), "{mv} missing from capture mode");
        }
    }
}

#[test]
fn single_check_allows_blocks_and_king_moves() {
    // queen h4 checks e1 along the h4-e1 diagonal
    let pos = Position::from_fen("4k3/8/8/8/7q/8/6P1/4K3 w - - 0 1").unwrap();
    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    assert!(list.iter().any(|m| m.to_string() == "g2g3"), "block missing");
    for m in &list {
        assert!(
            m.piece() == Piece::King || m.to().to_string() == "g3",
            "{m} neither blocks nor moves the king"
        );
    }
}

#[test]
fn promotion_captures_expand_fully() {
    let pos = Position::from_fen("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    let promo_pushes = list
        .iter()
        .filter(|m| m.is_promotion() && !m.is_capture())
        .count();
    let promo_captures = list
        .iter()
        .filter(|m| m.is_promotion() && m.is_capture())
        .count();
    assert_eq!(promo_pushes, 4);
    assert_eq!(promo_captures, 4);
    assert!(
        list.iter()
            .filter(|m| m.is_capture())
            .all(|m| m.piece() == Piece::Pawn)
    );
}
