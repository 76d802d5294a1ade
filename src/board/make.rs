use crate::board::{
    Color, EMPTY_CELL, Piece, Position, RIGHT_UPDATES, castle_rook_move, cell_color,
};
use crate::hash::zobrist::keys;
use crate::moves::tables::pawn_attacks;
use crate::moves::types::Move;
use crate::square::Square;

/// Everything needed to undo one ply: the move itself plus the state that a
/// move destroys rather than transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mv: Move,
    pub castling: u8,
    /// Mailbox cell of the captured piece, `EMPTY_CELL` for quiet moves.
    pub captured: u8,
    pub en_passant: Option<Square>,
    pub draw_clock: u8,
    pub hash: u64,
}

impl Position {
    /// Apply a move produced by the generator for this position.
    ///
    /// Feeding a move the generator did not emit is a caller bug; debug builds
    /// abort on the cheapest symptoms of that, release builds trust the caller.
    pub fn make_move(&mut self, mv: Move) {
        let us = self.side_to_move;
        let them = !us;
        let from = mv.from();
        let to = mv.to();
        debug_assert_eq!(
            self.mailbox[from.index() as usize],
            mv.piece_cell(),
            "illegal move {mv}: mover not on {from}"
        );
        debug_assert_eq!(cell_color(mv.piece_cell()), us, "illegal move {mv}: wrong side");
        debug_assert!(self.plys as usize == self.history.len());

        let prev_ep = self.en_passant;
        self.history.push(HistoryEntry {
            mv,
            castling: self.castling,
            captured: EMPTY_CELL,
            en_passant: prev_ep,
            draw_clock: self.draw_clock,
            hash: self.hash,
        });

        self.draw_clock = (self.draw_clock + 1).min(100);

        if let Some(ep) = prev_ep {
            self.hash ^= keys().ep_file[ep.file() as usize];
            self.en_passant = None;
        }

        let mut captured = EMPTY_CELL;
        if mv.is_double_push() {
            // record the skipped square only when an enemy pawn can actually
            // capture onto it; keeps the hash free of dead en-passant state
            let ep_sq = Square::from_index((from.index() + to.index()) / 2);
            if pawn_attacks(us, ep_sq) & self.pieces(Piece::Pawn, them) != 0 {
                self.en_passant = Some(ep_sq);
                self.hash ^= keys().ep_file[ep_sq.file() as usize];
            }
        } else if mv.is_castle() {
            if let Some((rook_from, rook_to)) = castle_rook_move(to) {
                let rook_cell = self.mailbox[rook_from.index() as usize];
                self.clear_square(rook_from);
                self.fill_square(rook_to, rook_cell);
            }
        } else if mv.piece() == Piece::Pawn && prev_ep == Some(to) {
            let cap_sq = match us {
                Color::White => Square::from_index(to.index() + 8),
                Color::Black => Square::from_index(to.index() - 8),
            };
            captured = self.mailbox[cap_sq.index() as usize];
            self.clear_square(cap_sq);
        } else if self.mailbox[to.index() as usize] != EMPTY_CELL {
            captured = self.mailbox[to.index() as usize];
            debug_assert_eq!(cell_color(captured), them, "illegal move {mv}: own capture");
            self.clear_square(to);
        }

        if captured != EMPTY_CELL || mv.piece() == Piece::Pawn {
            self.draw_clock = 0;
        }

        self.clear_square(from);
        self.fill_square(to, mv.to_piece_cell());

        let keys = keys();
        self.hash ^= keys.castling[self.castling as usize];
        self.castling &=
            !(RIGHT_UPDATES[from.index() as usize] | RIGHT_UPDATES[to.index() as usize]);
        self.hash ^= keys.castling[self.castling as usize];

        if let Some(last) = self.history.last_mut() {
            last.captured = captured;
        }

        self.plys += 1;
        self.side_to_move = them;
        if them == Color::White {
            self.full_moves += 1;
        }
        self.hash ^= keys.side_to_move;
    }

    /// Undo the most recent `make_move`. The stored hash is authoritative, so
    /// the piece motions are reversed without re-deriving hash deltas.
    pub fn unmake_move(&mut self) {
        let entry = match self.history.pop() {
            Some(e) => e,
            None => {
                debug_assert!(false, "unmake with empty history");
                return;
            }
        };
        let mv = entry.mv;
        let mover = !self.side_to_move;

        self.plys -= 1;
        if self.side_to_move == Color::White {
            self.full_moves -= 1;
        }
        self.side_to_move = mover;

        self.clear_square(mv.to());
        self.fill_square(mv.from(), mv.piece_cell());

        if mv.is_castle() {
            if let Some((rook_from, rook_to)) = castle_rook_move(mv.to()) {
                let rook_cell = self.mailbox[rook_to.index() as usize];
                self.clear_square(rook_to);
                self.fill_square(rook_from, rook_cell);
            }
        }

        if entry.captured != EMPTY_CELL {
            let cap_sq = if mv.piece() == Piece::Pawn && entry.en_passant == Some(mv.to()) {
                match mover {
                    Color::White => Square::from_index(mv.to().index() + 8),
                    Color::Black => Square::from_index(mv.to().index() - 8),
                }
            } else {
                mv.to()
            };
            self.fill_square(cap_sq, entry.captured);
        }

        self.en_passant = entry.en_passant;
        self.castling = entry.castling;
        self.draw_clock = entry.draw_clock;
        self.hash = entry.hash;
    }
}
