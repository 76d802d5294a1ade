//! Static evaluation: tapered material + piece-square scores with light
//! pawn-structure and king-shelter terms.

use crate::bitboard::BitboardExt;
use crate::board::{Color, PIECES, Piece, Position};
use crate::moves::tables::{ADJACENT_FILES, FORWARD_FILE, KING_AREA, PASSED_PAWN_MASK};
use crate::search::pesto::{EG_TABLES, MG_TABLES, PHASE_WEIGHTS, TOTAL_PHASE};

const ISOLATED_PAWN_PENALTY: i32 = -15;
const DOUBLED_PAWN_PENALTY: i32 = -10;
const KING_SHIELD_BONUS: i32 = 8;

/// Bonus for a passed pawn by rank counted from its own side, so index 6 is
/// one step from promotion.
const PASSED_PAWN_BONUS: [i32; 8] = [0, 10, 20, 40, 80, 150, 300, 0];

/// Game phase in 0..=24 from the remaining non-pawn material.
fn phase(pos: &Position) -> i32 {
    let mut phase = 0;
    for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
        phase += PHASE_WEIGHTS[piece as usize] * pos.piece_bb(piece).count() as i32;
    }
    phase.min(TOTAL_PHASE)
}

/// Centipawn score relative to the side to move.
pub fn evaluate(pos: &Position) -> i32 {
    let mut mg = 0;
    let mut eg = 0;
    let mut structure = 0;

    for color in [Color::White, Color::Black] {
        let sign = if color == Color::White { 1 } else { -1 };
        for piece in PIECES {
            let table_idx = piece as usize;
            for sq in pos.pieces(piece, color).bits() {
                // White reads the tables directly, Black through the mirror
                let rel = match color {
                    Color::White => sq.index() as usize,
                    Color::Black => sq.flip().index() as usize,
                };
                mg += sign * (piece.value() + MG_TABLES[table_idx][rel]);
                eg += sign * (piece.value() + EG_TABLES[table_idx][rel]);
            }
        }

        let own_pawns = pos.pieces(Piece::Pawn, color);
        let enemy_pawns = pos.pieces(Piece::Pawn, !color);
        for sq in own_pawns.bits() {
            let idx = sq.index() as usize;
            if PASSED_PAWN_MASK[color as usize][idx] & enemy_pawns == 0 {
                structure += sign * PASSED_PAWN_BONUS[sq.relative_rank(color) as usize];
            }
            if ADJACENT_FILES[sq.file() as usize] & own_pawns == 0 {
                structure += sign * ISOLATED_PAWN_PENALTY;
            }
            if FORWARD_FILE[color as usize][idx] & own_pawns != 0 {
                structure += sign * DOUBLED_PAWN_PENALTY;
            }
        }

        let king = pos.king_square(color);
        let shield = (KING_AREA[color as usize][king.index() as usize] & own_pawns).count();
        structure += sign * KING_SHIELD_BONUS * shield.min(3) as i32;
    }

    let phase = phase(pos);
    let tapered = (mg * phase + eg * (TOTAL_PHASE - phase)) / TOTAL_PHASE;
    let score = tapered + structure;

    match pos.side_to_move() {
        Color::White => score,
        Color::Black => -score,
    }
}
