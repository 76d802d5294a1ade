use thiserror::Error;

use crate::board::{
    CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, EMPTY_CELL, Piece, Position, cell,
    cell_color, cell_piece,
};
use crate::moves::tables::pawn_attacks;
use crate::square::Square;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("expected 4 or 6 FEN fields, got {0}")]
    FieldCount(usize),
    #[error("bad piece placement: {0}")]
    Placement(String),
    #[error("bad side to move: {0:?}")]
    SideToMove(String),
    #[error("bad castling rights: {0:?}")]
    Castling(String),
    #[error("bad en-passant square: {0:?}")]
    EnPassant(String),
    #[error("bad clock value: {0:?}")]
    Clock(String),
    #[error("each side needs exactly one king")]
    Kings,
}

fn piece_from_char(c: char) -> Option<u8> {
    let color = if c.is_ascii_uppercase() {
        Color::White
    } else {
        Color::Black
    };
    let piece = match c.to_ascii_lowercase() {
        'p' => Piece::Pawn,
        'n' => Piece::Knight,
        'b' => Piece::Bishop,
        'r' => Piece::Rook,
        'q' => Piece::Queen,
        'k' => Piece::King,
        _ => return None,
    };
    Some(cell(color, piece))
}

fn piece_to_char(piece_cell: u8) -> char {
    let c = match cell_piece(piece_cell) {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match cell_color(piece_cell) {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}

impl Position {
    /// Parse a 6-field FEN; the two clock fields may be omitted and then
    /// default to `0 1`.
    pub fn from_fen(fen: &str) -> Result<Position, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 4 && fields.len() != 6 {
            return Err(FenError::FieldCount(fields.len()));
        }

        let mut pos = Position::empty();

        // Piece placement runs rank 8 down to rank 1, which is mailbox order
        // under the A8 = 0 layout.
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::Placement(fields[0].to_string()));
        }
        for (rank_idx, rank) in ranks.iter().enumerate() {
            let mut file = 0u8;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if skip == 0 || skip > 8 {
                        return Err(FenError::Placement(fields[0].to_string()));
                    }
                    file += skip as u8;
                } else {
                    let piece_cell = piece_from_char(c)
                        .ok_or_else(|| FenError::Placement(fields[0].to_string()))?;
                    if file > 7 {
                        return Err(FenError::Placement(fields[0].to_string()));
                    }
                    pos.fill_square(Square::from_coords(file, rank_idx as u8), piece_cell);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::Placement(fields[0].to_string()));
            }
        }

        pos.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        if fields[2] != "-" {
            for c in fields[2].chars() {
                pos.castling |= match c {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    _ => return Err(FenError::Castling(fields[2].to_string())),
                };
            }
        }

        if fields[3] != "-" {
            let ep: Square = fields[3]
                .parse()
                .map_err(|_| FenError::EnPassant(fields[3].to_string()))?;
            let expected_rank = match pos.side_to_move {
                Color::White => 2, // rank 6
                Color::Black => 5, // rank 3
            };
            if ep.rank() != expected_rank {
                return Err(FenError::EnPassant(fields[3].to_string()));
            }
            let us = pos.side_to_move;
            let mover = !us;
            // the skipped square must be empty and the double-pushed pawn
            // must actually stand behind it
            let behind = Square::from_index(match us {
                Color::White => ep.index() + 8,
                Color::Black => ep.index() - 8,
            });
            if pos.piece_at(ep).is_some() || pos.piece_at(behind) != Some((mover, Piece::Pawn)) {
                return Err(FenError::EnPassant(fields[3].to_string()));
            }
            // keep the square only while a capture is actually available, the
            // same rule make_move applies after a double push
            if pawn_attacks(mover, ep) & pos.pieces(Piece::Pawn, us) != 0 {
                pos.en_passant = Some(ep);
            }
        }

        if fields.len() == 6 {
            let clock: u32 = fields[4]
                .parse()
                .map_err(|_| FenError::Clock(fields[4].to_string()))?;
            pos.draw_clock = clock.min(100) as u8;
            let moves: u16 = fields[5]
                .parse()
                .map_err(|_| FenError::Clock(fields[5].to_string()))?;
            pos.full_moves = moves.max(1);
        }

        if pos.pieces(Piece::King, Color::White).count_ones() != 1
            || pos.pieces(Piece::King, Color::Black).count_ones() != 1
        {
            return Err(FenError::Kings);
        }

        pos.hash = pos.compute_hash();
        Ok(pos)
    }

    /// Canonical 6-field FEN of the current state.
    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(90);

        for rank in 0..8u8 {
            let mut empty = 0;
            for file in 0..8u8 {
                let c = self.mailbox[Square::from_coords(file, rank).index() as usize];
                if c == EMPTY_CELL {
                    empty += 1;
                } else {
                    if empty > 0 {
                        out.push(char::from_digit(empty, 10).unwrap_or('8'));
                        empty = 0;
                    }
                    out.push(piece_to_char(c));
                }
            }
            if empty > 0 {
                out.push(char::from_digit(empty, 10).unwrap_or('8'));
            }
            if rank != 7 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        if self.castling == 0 {
            out.push('-');
        } else {
            for (bit, c) in [
                (CASTLE_WK, 'K'),
                (CASTLE_WQ, 'Q'),
                (CASTLE_BK, 'k'),
                (CASTLE_BQ, 'q'),
            ] {
                if self.castling & bit != 0 {
                    out.push(c);
                }
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(ep) => out.push_str(&ep.to_string()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.draw_clock, self.full_moves));
        out
    }

    /// ASCII board for the `d` debug command, rank 8 at the top.
    pub fn board_string(&self) -> String {
        let mut out = String::with_capacity(64 * 4);
        for rank in 0..8u8 {
            out.push_str(&format!("{} ", 8 - rank));
            for file in 0..8u8 {
                let c = self.mailbox[Square::from_coords(file, rank).index() as usize];
                if c == EMPTY_CELL {
                    out.push('.');
                } else {
                    out.push(piece_to_char(c));
                }
                out.push(' ');
            }
            out.push('\n');
        }
        out.push_str("  a b c d e f g h\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_round_trip() {
        let pos = Position::from_fen(START_FEN).unwrap();
        assert_eq!(pos.to_fen(), START_FEN);
        assert_eq!(pos, Position::startpos());
    }

    #[test]
    fn four_field_fen_defaults_clocks() {
        let pos = Position::from_fen("8/8/8/8/8/8/6k1/4K2R w K -").unwrap();
        assert_eq!(pos.draw_clock(), 0);
        assert_eq!(pos.full_moves(), 1);
        assert_eq!(pos.castling(), CASTLE_WK);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Position::from_fen("").is_err());
        assert!(Position::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err()); // no kings
        assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
        assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KXkq - 0 1").is_err());
        assert!(Position::from_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
    }

    #[test]
    fn dead_en_passant_square_is_dropped() {
        // double push happened but no white pawn can capture onto d6
        let pos = Position::from_fen("4k3/8/8/3p4/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(pos.en_passant(), None);
        // with a capturer present the square is kept
        let pos = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(pos.en_passant(), Some(Square::D6));
    }

    #[test]
    fn board_string_shows_pieces() {
        let s = Position::startpos().board_string();
        assert!(s.contains("r n b q k b n r"));
        assert!(s.contains("  a b c d e f g h"));
    }
}
