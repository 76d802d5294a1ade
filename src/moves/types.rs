use std::fmt;

use arrayvec::ArrayVec;

use crate::board::{Color, Piece, cell_color, cell_piece};
use crate::square::Square;

/// Generated moves for one position; 256 is a safe upper bound on legal moves.
pub type MoveList = ArrayVec<Move, 256>;

const TO_SHIFT: u32 = 6;
const PIECE_SHIFT: u32 = 12;
const TO_PIECE_SHIFT: u32 = 16;
const CAPTURE_BIT: u32 = 1 << 20;

/// Compact move record: from (6 bits), to (6), moving piece cell (4),
/// resulting piece cell (4), capture flag (1). The resulting piece differs
/// from the moving piece only on promotion. Castling, double pushes and
/// en passant are derived from the geometry, not flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u32);

impl Move {
    /// Sentinel for "no move"; terminates principal variations.
    pub const NULL: Move = Move(0);

    #[inline(always)]
    pub fn new(from: Square, to: Square, piece_cell: u8, capture: bool) -> Move {
        Move::with_result(from, to, piece_cell, piece_cell, capture)
    }

    #[inline(always)]
    pub fn with_result(
        from: Square,
        to: Square,
        piece_cell: u8,
        to_piece_cell: u8,
        capture: bool,
    ) -> Move {
        Move(
            from.index() as u32
                | (to.index() as u32) << TO_SHIFT
                | (piece_cell as u32 & 0xF) << PIECE_SHIFT
                | (to_piece_cell as u32 & 0xF) << TO_PIECE_SHIFT
                | if capture { CAPTURE_BIT } else { 0 },
        )
    }

    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn from(self) -> Square {
        Square::from_index((self.0 & 0x3F) as u8)
    }

    #[inline(always)]
    pub fn to(self) -> Square {
        Square::from_index((self.0 >> TO_SHIFT & 0x3F) as u8)
    }

    /// Mailbox cell of the moving piece.
    #[inline(always)]
    pub fn piece_cell(self) -> u8 {
        (self.0 >> PIECE_SHIFT & 0xF) as u8
    }

    /// Mailbox cell sitting on `to` after the move (promotion piece if any).
    #[inline(always)]
    pub fn to_piece_cell(self) -> u8 {
        (self.0 >> TO_PIECE_SHIFT & 0xF) as u8
    }

    #[inline(always)]
    pub fn piece(self) -> Piece {
        cell_piece(self.piece_cell())
    }

    #[inline(always)]
    pub fn color(self) -> Color {
        cell_color(self.piece_cell())
    }

    #[inline(always)]
    pub fn is_capture(self) -> bool {
        self.0 & CAPTURE_BIT != 0
    }

    #[inline(always)]
    pub fn is_promotion(self) -> bool {
        self.piece_cell() != self.to_piece_cell()
    }

    #[inline(always)]
    pub fn promotion(self) -> Option<Piece> {
        self.is_promotion().then(|| cell_piece(self.to_piece_cell()))
    }

    /// Pawn two-square advance.
    #[inline(always)]
    pub fn is_double_push(self) -> bool {
        self.piece() == Piece::Pawn && (self.from().index() as i8 - self.to().index() as i8).abs() == 16
    }

    /// King two-square slide towards a rook.
    #[inline(always)]
    pub fn is_castle(self) -> bool {
        self.piece() == Piece::King && (self.from().index() as i8 - self.to().index() as i8).abs() == 2
    }

    /// 16-bit form for transposition-table storage: from | to | promotion type.
    #[inline(always)]
    pub fn compact(self) -> u16 {
        let promo = match self.promotion() {
            Some(p) => p as u16,
            None => 0,
        };
        self.from().index() as u16 | (self.to().index() as u16) << 6 | promo << 12
    }
}

impl fmt::Display for Move {
    /// Long algebraic: `e2e4`, `e7e8q`; the null move prints as `0000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }
        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(promo) = self.promotion() {
            let c = match promo {
                Piece::Knight => 'n',
                Piece::Bishop => 'b',
                Piece::Rook => 'r',
                Piece::Queen => 'q',
                _ => '?',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Best line found by the search. `get(0)` is the move to play, `get(1)` the
/// expected reply (the ponder move); out-of-range indices yield `Move::NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalVariation {
    moves: Vec<Move>,
}

impl PrincipalVariation {
    pub fn new() -> PrincipalVariation {
        PrincipalVariation { moves: Vec::new() }
    }

    #[inline(always)]
    pub fn push(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    #[inline(always)]
    pub fn get(&self, idx: usize) -> Move {
        self.moves.get(idx).copied().unwrap_or(Move::NULL)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn clear(&mut self) {
        self.moves.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Move> + '_ {
        self.moves.iter().copied()
    }
}

impl fmt::Display for PrincipalVariation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mv) in self.moves.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{mv}")?;
        }
        Ok(())
    }
}
