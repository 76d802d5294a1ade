use meridian::board::{Position, START_FEN};
use meridian::moves::movegen::generate_moves;
use meridian::moves::types::MoveList;

const FIXTURES: &[&str] = &[
    START_FEN,
    // Kiwipete: castling both ways, pins, en passant potential
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    // en passant immediately available
    "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1",
    // promotion with capture choices
    "1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1",
    // black to move, queenside castling rights only
    "r3k3/8/8/8/8/8/8/R3K2R b Qq - 4 20",
];

/// Make then unmake every legal move, recursively to `depth`, asserting the
/// position is restored bit for bit, hash included.
fn make_unmake_walk(pos: &mut Position, depth: u32) {
    if depth == 0 {
        return;
    }
    let snapshot = pos.clone();
    let mut list = MoveList::new();
    generate_moves(pos, &mut list);
    for &mv in &list {
        pos.make_move(mv);
        pos.assert_consistent();
        assert_eq!(pos.hash(), pos.compute_hash(), "hash drifted after {mv}");
        make_unmake_walk(pos, depth - 1);
        pos.unmake_move();
        assert_eq!(*pos, snapshot, "unmake of {mv} did not restore the position");
    }
}

#[test]
fn make_unmake_round_trip() {
    for fen in FIXTURES {
        let mut pos = Position::from_fen(fen).expect("valid fixture");
        make_unmake_walk(&mut pos, 2);
    }
}

#[test]
fn incremental_hash_matches_recompute_along_a_game() {
    let mut pos = Position::startpos();
    for text in [
        "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "g8f6", "e1g1", "f6e4", "f1e1", "e4d6",
    ] {
        let mut list = MoveList::new();
        generate_moves(&pos, &mut list);
        let mv = list
            .iter()
            .copied()
            .find(|m| m.to_string() == text)
            .unwrap_or_else(|| panic!("move {text} should be legal"));
        pos.make_move(mv);
        assert_eq!(pos.hash(), pos.compute_hash(), "hash drifted after {text}");
    }
    // unwind the whole game
    for _ in 0..10 {
        pos.unmake_move();
    }
    assert_eq!(pos, Position::startpos());
}

#[test]
fn fen_round_trip() {
    for fen in FIXTURES {
        let pos = Position::from_fen(fen).expect("valid fixture");
        let reparsed = Position::from_fen(&pos.to_fen()).expect("own output parses");
        assert_eq!(pos, reparsed, "FEN round trip for {fen}");
    }
}

#[test]
fn halfmove_clock_resets_on_pawn_moves_and_captures() {
    let mut pos =
        Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 4 3")
            .unwrap();
    assert_eq!(pos.draw_clock(), 4);

    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    // a quiet knight move increments the clock
    let quiet = list
        .iter()
        .copied()
        .find(|m| m.to_string() == "b1c3")
        .unwrap();
    pos.make_move(quiet);
    assert_eq!(pos.draw_clock(), 5);
    pos.unmake_move();

    // a capture resets it
    let capture = list
        .iter()
        .copied()
        .find(|m| m.to_string() == "f3e5")
        .unwrap();
    pos.make_move(capture);
    assert_eq!(pos.draw_clock(), 0);
}

#[test]
fn en_passant_square_only_set_when_capturable() {
    let mut pos = Position::startpos();
    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    let mv = list
        .iter()
        .copied()
        .find(|m| m.to_string() == "e2e4")
        .unwrap();
    pos.make_move(mv);
    // no black pawn can capture onto e3
    assert_eq!(pos.en_passant(), None);

    let mut pos = Position::from_fen("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    let mv = list
        .iter()
        .copied()
        .find(|m| m.to_string() == "e2e4")
        .unwrap();
    pos.make_move(mv);
    // d4 pawn can take en passant, so the square is recorded and hashed
    assert_eq!(pos.en_passant().map(|s| s.to_string()), Some("e3".into()));
    assert_eq!(pos.hash(), pos.compute_hash());
}

#[test]
fn repetition_detected_within_history() {
    let mut pos = Position::startpos();
    for text in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        let mut list = MoveList::new();
        generate_moves(&pos, &mut list);
        let mv = list
            .iter()
            .copied()
            .find(|m| m.to_string() == text)
            .unwrap();
        pos.make_move(mv);
    }
    // back to the starting position with the knights returned
    assert!(pos.is_repetition());
}

#[test]
fn insufficient_material_cases() {
    for (fen, insufficient) in [
        ("4k3/8/8/8/8/8/8/4K3 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/3BK3 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/2N1K3 w - - 0 1", true),
        ("4kn2/8/8/8/8/8/8/3BK3 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/1NN1K3 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/2BBK3 w - - 0 1", false),
        ("4k3/8/8/8/8/8/8/3QK3 w - - 0 1", false),
        ("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1", false),
    ] {
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.insufficient_material(), insufficient, "{fen}");
    }
}

#[test]
fn castling_move_relocates_rook_and_clears_rights() {
    let mut pos =
        Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let mut list = MoveList::new();
    generate_moves(&pos, &mut list);
    let castle = list
        .iter()
        .copied()
        .find(|m| m.to_string() == "e1g1")
        .expect("kingside castling is legal");
    pos.make_move(castle);
    let fen = pos.to_fen();
    assert!(fen.starts_with("r3k2r/8/8/8/8/8/8/R4RK1"), "got {fen}");
    assert!(fen.contains(" kq "), "white rights must be gone: {fen}");
    pos.unmake_move();
    assert_eq!(pos.to_fen(), "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
}
