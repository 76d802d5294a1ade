//! Fully legal move generation.
//!
//! Instead of generating pseudo-legal moves and filtering, the generator
//! computes three per-position masks up front and emits only legal moves:
//!
//! - the squares the enemy sees (with our king lifted off the board, so the
//!   king cannot step backwards along a checking ray),
//! - a check mask restricting non-king moves to capturing the checker or
//!   blocking its ray,
//! - diagonal and orthogonal pin masks restricting pinned pieces to the ray
//!   between their king and the pinning slider.
//!
//! En passant is the one case resolved by make-and-test: the capture removes
//! two pieces from one rank, so the occupancy surgery is done explicitly and
//! the king checked afterwards.

use crate::bitboard::{BitboardExt, UNIVERSE, bit};
use crate::board::{Color, Piece, Position, cell};
use crate::moves::magic::magics;
use crate::moves::tables::{
    ANTI_DIAGONALS, DIAGONALS, FILES, KING_ATTACKS, KNIGHT_ATTACKS, RANKS, between, pawn_attacks,
};
use crate::moves::types::{Move, MoveList};
use crate::square::Square;

/// Is `sq` attacked by `by` under the given occupancy? The occupancy is a
/// parameter so callers can probe hypothetical boards (en-passant surgery).
pub fn square_attacked(pos: &Position, sq: Square, by: Color, occ: u64) -> bool {
    // a pawn of the defender's color on `sq` attacks exactly the squares an
    // attacking pawn could come from
    if pawn_attacks(!by, sq) & pos.pieces(Piece::Pawn, by) != 0 {
        return true;
    }
    if KNIGHT_ATTACKS[sq.index() as usize] & pos.pieces(Piece::Knight, by) != 0 {
        return true;
    }
    if KING_ATTACKS[sq.index() as usize] & pos.pieces(Piece::King, by) != 0 {
        return true;
    }
    let tables = magics();
    let diag = pos.pieces(Piece::Bishop, by) | pos.pieces(Piece::Queen, by);
    if tables.bishop_attacks(sq, occ) & diag != 0 {
        return true;
    }
    let line = pos.pieces(Piece::Rook, by) | pos.pieces(Piece::Queen, by);
    tables.rook_attacks(sq, occ) & line != 0
}

/// All legal moves for the side to move. Order is generation order; the
/// search applies its own ordering.
pub fn generate_moves(pos: &Position, list: &mut MoveList) {
    generate::<false>(pos, list);
}

/// Captures and queen promotions only, for quiescence.
pub fn generate_captures(pos: &Position, list: &mut MoveList) {
    generate::<true>(pos, list);
}

fn generate<const QUIESCENCE: bool>(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move();
    let them = !us;
    let occ = pos.occupied();
    let friends = pos.occupancy(us);
    let enemies = pos.occupancy(them);
    let king = pos.king_square(us);
    let tables = magics();

    let their_pawns = pos.pieces(Piece::Pawn, them);
    let their_knights = pos.pieces(Piece::Knight, them);
    let their_diag = pos.pieces(Piece::Bishop, them) | pos.pieces(Piece::Queen, them);
    let their_line = pos.pieces(Piece::Rook, them) | pos.pieces(Piece::Queen, them);

    // --- squares the enemy sees, our king removed from the blockers ---
    let occ_no_king = occ ^ bit(king.index());
    let mut seen = their_pawns.up_east(them) | their_pawns.up_west(them);
    for sq in their_knights.bits() {
        seen |= KNIGHT_ATTACKS[sq.index() as usize];
    }
    seen |= KING_ATTACKS[pos.king_square(them).index() as usize];
    for sq in their_diag.bits() {
        seen |= tables.bishop_attacks(sq, occ_no_king);
    }
    for sq in their_line.bits() {
        seen |= tables.rook_attacks(sq, occ_no_king);
    }

    // --- check mask ---
    let mut check_mask =
        (pawn_attacks(us, king) & their_pawns) | (KNIGHT_ATTACKS[king.index() as usize] & their_knights);
    let mut checkers = check_mask.count();
    for sq in (tables.bishop_attacks(king, occ) & their_diag).bits() {
        check_mask |= between(king, sq) | bit(sq.index());
        checkers += 1;
    }
    for sq in (tables.rook_attacks(king, occ) & their_line).bits() {
        check_mask |= between(king, sq) | bit(sq.index());
        checkers += 1;
    }
    if checkers == 0 {
        check_mask = UNIVERSE;
    }

    // --- pin masks: slider aligned with the king, exactly one friendly
    //     piece on the ray between them ---
    let mut pinned_diag = 0u64;
    let king_diags =
        DIAGONALS[king.diagonal() as usize] | ANTI_DIAGONALS[king.anti_diagonal() as usize];
    for sq in (their_diag & king_diags).bits() {
        let ray = between(king, sq);
        let blockers = ray & occ;
        if blockers.count() == 1 && blockers & friends != 0 {
            pinned_diag |= ray | bit(sq.index());
        }
    }
    let mut pinned_hv = 0u64;
    let king_lines = FILES[king.file() as usize] | RANKS[king.rank() as usize];
    for sq in (their_line & king_lines).bits() {
        let ray = between(king, sq);
        let blockers = ray & occ;
        if blockers.count() == 1 && blockers & friends != 0 {
            pinned_hv |= ray | bit(sq.index());
        }
    }

    // --- king ---
    let king_cell = cell(us, Piece::King);
    let mut king_targets = KING_ATTACKS[king.index() as usize] & !friends & !seen;
    if QUIESCENCE {
        king_targets &= enemies;
    }
    for to in king_targets.bits() {
        list.push(Move::new(king, to, king_cell, enemies.is_set(to)));
    }

    // double check: only the king may move
    if checkers >= 2 {
        return;
    }

    if !QUIESCENCE && checkers == 0 {
        for castle in &crate::board::CASTLES[us as usize] {
            if pos.castling() & castle.right != 0
                && occ & castle.empty_mask == 0
                && seen & castle.safe_mask == 0
            {
                list.push(Move::new(castle.king_from, castle.king_to, king_cell, false));
            }
        }
    }

    let mut target = !friends & check_mask;
    if QUIESCENCE {
        target &= enemies;
    }

    // --- knights: a pinned knight can never stay on its pin ray ---
    let knight_cell = cell(us, Piece::Knight);
    for from in (pos.pieces(Piece::Knight, us) & !(pinned_diag | pinned_hv)).bits() {
        for to in (KNIGHT_ATTACKS[from.index() as usize] & target).bits() {
            list.push(Move::new(from, to, knight_cell, enemies.is_set(to)));
        }
    }

    // --- sliders ---
    let bishop_cell = cell(us, Piece::Bishop);
    for from in pos.pieces(Piece::Bishop, us).bits() {
        if pinned_hv.is_set(from) {
            continue;
        }
        let mut attacks = tables.bishop_attacks(from, occ);
        if pinned_diag.is_set(from) {
            attacks &= pinned_diag;
        }
        for to in (attacks & target).bits() {
            list.push(Move::new(from, to, bishop_cell, enemies.is_set(to)));
        }
    }

    let rook_cell = cell(us, Piece::Rook);
    for from in pos.pieces(Piece::Rook, us).bits() {
        if pinned_diag.is_set(from) {
            continue;
        }
        let mut attacks = tables.rook_attacks(from, occ);
        if pinned_hv.is_set(from) {
            attacks &= pinned_hv;
        }
        for to in (attacks & target).bits() {
            list.push(Move::new(from, to, rook_cell, enemies.is_set(to)));
        }
    }

    let queen_cell = cell(us, Piece::Queen);
    for from in pos.pieces(Piece::Queen, us).bits() {
        let attacks = if pinned_diag.is_set(from) {
            tables.bishop_attacks(from, occ) & pinned_diag
        } else if pinned_hv.is_set(from) {
            tables.rook_attacks(from, occ) & pinned_hv
        } else {
            tables.queen_attacks(from, occ)
        };
        for to in (attacks & target).bits() {
            list.push(Move::new(from, to, queen_cell, enemies.is_set(to)));
        }
    }

    // --- pawns ---
    let pawns = pos.pieces(Piece::Pawn, us);
    let empty = !occ;
    let promo_rank = match us {
        Color::White => RANKS[0],
        Color::Black => RANKS[7],
    };
    // rank a single push lands on when a double push is still available
    let double_gate = match us {
        Color::White => RANKS[5],
        Color::Black => RANKS[2],
    };
    let (up, up_west, up_east): (i8, i8, i8) = match us {
        Color::White => (-8, -9, -7),
        Color::Black => (8, 7, 9),
    };

    // pushes: a diagonally pinned pawn cannot push at all, a file-pinned pawn
    // only along its pin ray
    let push_able = pawns & !pinned_diag;
    let push_unpinned = push_able & !pinned_hv;
    let push_pinned = push_able & pinned_hv;
    let singles =
        (push_unpinned.up(us) & empty) | (push_pinned.up(us) & empty & pinned_hv);
    let doubles = (singles & double_gate).up(us) & empty;

    let mut push_targets = singles & check_mask;
    if QUIESCENCE {
        push_targets &= promo_rank;
    }
    for to in push_targets.bits() {
        let from = Square::from_index((to.index() as i8 - up) as u8);
        push_pawn_moves::<QUIESCENCE>(list, us, from, to, false, promo_rank);
    }
    if !QUIESCENCE {
        for to in (doubles & check_mask).bits() {
            let from = Square::from_index((to.index() as i8 - 2 * up) as u8);
            list.push(Move::new(from, to, cell(us, Piece::Pawn), false));
        }
    }

    // captures
    let attack_able = pawns & !pinned_hv;
    let att_unpinned = attack_able & !pinned_diag;
    let att_pinned = attack_able & pinned_diag;
    let capture_target = enemies & check_mask;

    let west_hits = (att_unpinned.up_west(us) | (att_pinned.up_west(us) & pinned_diag))
        & capture_target;
    for to in west_hits.bits() {
        let from = Square::from_index((to.index() as i8 - up_west) as u8);
        push_pawn_moves::<QUIESCENCE>(list, us, from, to, true, promo_rank);
    }
    let east_hits = (att_unpinned.up_east(us) | (att_pinned.up_east(us) & pinned_diag))
        & capture_target;
    for to in east_hits.bits() {
        let from = Square::from_index((to.index() as i8 - up_east) as u8);
        push_pawn_moves::<QUIESCENCE>(list, us, from, to, true, promo_rank);
    }

    // en passant, validated by materializing the capture
    if let Some(ep) = pos.en_passant() {
        let cap_sq = Square::from_index((ep.index() as i8 - up) as u8);
        for from in (pawn_attacks(them, ep) & attack_able).bits() {
            let occ_after = (occ ^ bit(from.index()) ^ bit(cap_sq.index())) | bit(ep.index());
            if tables.rook_attacks(king, occ_after) & their_line != 0
                || tables.bishop_attacks(king, occ_after) & their_diag != 0
                || KNIGHT_ATTACKS[king.index() as usize] & their_knights != 0
                || pawn_attacks(us, king) & (their_pawns ^ bit(cap_sq.index())) != 0
            {
                continue;
            }
            list.push(Move::new(from, ep, cell(us, Piece::Pawn), true));
        }
    }
}

#[inline(always)]
fn push_pawn_moves<const QUIESCENCE: bool>(
    list: &mut MoveList,
    us: Color,
    from: Square,
    to: Square,
    capture: bool,
    promo_rank: u64,
) {
    let pawn = cell(us, Piece::Pawn);
    if promo_rank.is_set(to) {
        for promo in [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight] {
            if QUIESCENCE && promo != Piece::Queen {
                continue;
            }
            list.push(Move::with_result(from, to, pawn, cell(us, promo), capture));
        }
    } else {
        list.push(Move::new(from, to, pawn, capture));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::START_FEN;

    fn moves_of(fen: &str) -> MoveList {
        let pos = Position::from_fen(fen).unwrap();
        let mut list = MoveList::new();
        generate_moves(&pos, &mut list);
        list
    }

    #[test]
    fn startpos_has_twenty_moves() {
        assert_eq!(moves_of(START_FEN).len(), 20);
    }

    #[test]
    fn double_check_forces_king_moves() {
        // rook on e8 and bishop on b4 both check the e1 king
        let list = moves_of("4r1k1/8/8/8/1b6/8/8/4K3 w - - 0 1");
        assert!(!list.is_empty());
        assert!(list.iter().all(|m| m.piece() == Piece::King));
    }

    #[test]
    fn pinned_knight_is_frozen() {
        // knight d2 shields the d1 king from the d8 rook
        let list = moves_of("3r2k1/8/8/8/8/8/3N4/3K4 w - - 0 1");
        assert!(list.iter().all(|m| m.piece() != Piece::Knight));
    }

    #[test]
    fn pinned_rook_slides_on_its_ray() {
        // rook e4 pinned by the e8 rook: may move along the e-file only
        let list = moves_of("4r1k1/8/8/8/4R3/8/8/4K3 w - - 0 1");
        let rook_moves: Vec<_> = list.iter().filter(|m| m.piece() == Piece::Rook).collect();
        assert!(!rook_moves.is_empty());
        assert!(rook_moves.iter().all(|m| m.to().file() == 4));
        // capturing the pinner is among them
        assert!(rook_moves.iter().any(|m| m.to() == Square::E8));
    }

    #[test]
    fn check_must_be_answered() {
        // queen d8 checks d1; only blocks, captures of the queen, or king moves
        let list = moves_of("3q2k1/8/8/8/8/8/2B5/2NK4 w - - 0 1");
        for m in &list {
            assert!(
                m.piece() == Piece::King || m.to().file() == 3,
                "move {m} ignores the check"
            );
        }
    }

    #[test]
    fn en_passant_discovered_check_is_rejected() {
        // king and enemy rook share the fifth rank: exf6 ep would expose the king
        let list = moves_of("8/8/8/K3Pp1r/8/8/8/4k3 w - f6 0 1");
        assert!(list.iter().all(|m| !(m.piece() == Piece::Pawn && m.to() == Square::F6)));
    }

    #[test]
    fn en_passant_capture_of_checking_pawn() {
        // black's d5 double push gave check from d5... king on e4, pawn e5 can take d6 ep
        let pos = Position::from_fen("8/8/8/3pP3/4K3/8/8/7k w - d6 0 1").unwrap();
        let mut list = MoveList::new();
        generate_moves(&pos, &mut list);
        assert!(list.iter().any(|m| m.piece() == Piece::Pawn && m.to() == Square::D6));
    }

    #[test]
    fn promotions_expand_to_four_moves() {
        let list = moves_of("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let promos: Vec<_> = list.iter().filter(|m| m.is_promotion()).collect();
        assert_eq!(promos.len(), 4);
        assert_eq!(promos[0].promotion(), Some(Piece::Queen));
    }

    #[test]
    fn castling_through_attack_is_illegal() {
        // black rook on f8 covers f1
        let list = moves_of("5r2/8/8/8/8/8/k7/4K2R w K - 0 1");
        assert!(list.iter().all(|m| !m.is_castle()));
        // rook on g8 covers g1 as well
        let list = moves_of("6r1/8/8/8/8/8/k7/4K2R w K - 0 1");
        assert!(list.iter().all(|m| !m.is_castle()));
        // rook on h-file blocks nothing relevant; castling is available
        let list = moves_of("7r/8/8/8/8/8/k7/4K2R w K - 0 1");
        assert!(list.iter().any(|m| m.is_castle()));
    }

    #[test]
    fn quiescence_generation_is_captures_and_queen_promotions() {
        let pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        let mut list = MoveList::new();
        generate_captures(&pos, &mut list);
        assert!(!list.is_empty());
        assert!(list.iter().all(|m| m.is_capture()));
    }

    #[test]
    fn every_generated_move_leaves_king_safe() {
        for fen in [
            START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        ] {
            let mut pos = Position::from_fen(fen).unwrap();
            let mut list = MoveList::new();
            generate_moves(&pos, &mut list);
            for &m in &list {
                pos.make_move(m);
                let mover = !pos.side_to_move();
                let king = pos.king_square(mover);
                assert!(
                    !square_attacked(&pos, king, pos.side_to_move(), pos.occupied()),
                    "{m} leaves the king attacked in {fen}"
                );
                pos.unmake_move();
            }
        }
    }
}
