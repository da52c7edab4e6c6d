//! FEN parsing and serialization.

use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR};
use super::{
    Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece,
};
use crate::square::Square;
use std::fmt;

/// Why a FEN string was rejected. The board is left unchanged on any of
/// these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    WrongFieldCount(usize),
    BadPlacement(String),
    BadActiveColor(String),
    BadCastling(String),
    BadEnPassant(String),
    BadHalfmoveClock(String),
    BadFullmoveNumber(String),
    MissingKing(Color),
    DuplicateKing(Color),
    PawnOnBackRank,
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::WrongFieldCount(n) => {
                write!(f, "expected 4 to 6 whitespace-separated fields, found {n}")
            }
            FenError::BadPlacement(s) => write!(f, "invalid piece placement field: {s}"),
            FenError::BadActiveColor(s) => write!(f, "invalid active color field: {s}"),
            FenError::BadCastling(s) => write!(f, "invalid castling availability field: {s}"),
            FenError::BadEnPassant(s) => write!(f, "invalid en passant target field: {s}"),
            FenError::BadHalfmoveClock(s) => write!(f, "invalid halfmove clock field: {s}"),
            FenError::BadFullmoveNumber(s) => write!(f, "invalid fullmove number field: {s}"),
            FenError::MissingKing(c) => write!(f, "no king present for {c:?}"),
            FenError::DuplicateKing(c) => write!(f, "more than one king for {c:?}"),
            FenError::PawnOnBackRank => write!(f, "pawn on the first or last rank"),
        }
    }
}

impl std::error::Error for FenError {}

impl Board {
    /// Replaces this board's contents with the position described by `s`.
    /// On any parse or validation failure, the board is left completely
    /// unchanged and an error is returned.
    pub fn set_fen(&mut self, s: &str) -> Result<(), FenError> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return Err(FenError::WrongFieldCount(fields.len()));
        }

        let mut board = Board::new_empty();
        parse_placement(&mut board, fields[0])?;
        board.side_to_move = parse_active_color(fields[1])?;
        board.castling_rights = parse_castling(fields[2])?;
        board.en_passant = parse_en_passant(fields[3], board.side_to_move)?;

        board.halfmove_clock = match fields.get(4) {
            Some(hc) => hc
                .parse()
                .map_err(|_| FenError::BadHalfmoveClock((*hc).to_string()))?,
            None => 0,
        };
        board.fullmove_number = match fields.get(5) {
            Some(fm) => fm
                .parse()
                .map_err(|_| FenError::BadFullmoveNumber((*fm).to_string()))?,
            None => 1,
        };

        for &color in &[Color::White, Color::Black] {
            let kings = board.bb(color, Piece::King).count_ones();
            if kings == 0 {
                return Err(FenError::MissingKing(color));
            }
            if kings > 1 {
                return Err(FenError::DuplicateKing(color));
            }
        }
        let back_ranks = 0x0000_0000_0000_00FFu64 | 0xFF00_0000_0000_0000u64;
        let pawns = board.bb(Color::White, Piece::Pawn) | board.bb(Color::Black, Piece::Pawn);
        if pawns & back_ranks != 0 {
            return Err(FenError::PawnOnBackRank);
        }

        board.history.clear();
        board.refresh_zobrist();
        *self = board;
        Ok(())
    }

    /// Renders this board in Forsyth-Edwards notation.
    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(64);

        for rank in (0..8).rev() {
            let mut empty_run = 0u8;
            for file in 0..8 {
                let sq = Square::from_rank_file(rank, file);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            out.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        let idx = (color as usize) * 6 + (piece as usize);
                        out.push(PC_TO_CHAR[idx]);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                out.push((b'0' + empty_run) as char);
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        let rights = self.castling_rights;
        if rights == 0 {
            out.push('-');
        } else {
            if rights & CASTLE_WK != 0 {
                out.push('K');
            }
            if rights & CASTLE_WQ != 0 {
                out.push('Q');
            }
            if rights & CASTLE_BK != 0 {
                out.push('k');
            }
            if rights & CASTLE_BQ != 0 {
                out.push('q');
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }

        out.push(' ');
        out.push_str(&self.halfmove_clock.to_string());
        out.push(' ');
        out.push_str(&self.fullmove_number.to_string());

        out
    }
}

fn parse_placement(board: &mut Board, field: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadPlacement(field.to_string()));
    }

    for (rank_from_top, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - rank_from_top as u8;
        let mut file = 0u8;
        for ch in rank_str.chars() {
            if file > 8 {
                return Err(FenError::BadPlacement(field.to_string()));
            }
            if let Some(d) = ch.to_digit(10) {
                if !(1..=8).contains(&d) {
                    return Err(FenError::BadPlacement(field.to_string()));
                }
                file += d as u8;
                continue;
            }
            if !ch.is_ascii() {
                return Err(FenError::BadPlacement(field.to_string()));
            }
            let (piece, color) = CHAR_TO_PC[ch as usize]
                .ok_or_else(|| FenError::BadPlacement(field.to_string()))?;
            if file >= 8 {
                return Err(FenError::BadPlacement(field.to_string()));
            }
            let sq = Square::from_rank_file(rank, file);
            let bb = board.bb(color, piece) | sq.bb();
            board.set_bb(color, piece, bb);
            file += 1;
        }
        if file != 8 {
            return Err(FenError::BadPlacement(field.to_string()));
        }
    }

    Ok(())
}

fn parse_active_color(field: &str) -> Result<Color, FenError> {
    match field {
        "w" => Ok(Color::White),
        "b" => Ok(Color::Black),
        _ => Err(FenError::BadActiveColor(field.to_string())),
    }
}

fn parse_castling(field: &str) -> Result<u8, FenError> {
    if field == "-" {
        return Ok(0);
    }
    let mut rights = 0u8;
    for ch in field.chars() {
        rights |= match ch {
            'K' => CASTLE_WK,
            'Q' => CASTLE_WQ,
            'k' => CASTLE_BK,
            'q' => CASTLE_BQ,
            _ => return Err(FenError::BadCastling(field.to_string())),
        };
    }
    Ok(rights)
}

fn parse_en_passant(field: &str, side_to_move: Color) -> Result<Option<Square>, FenError> {
    if field == "-" {
        return Ok(None);
    }
    let bytes = field.as_bytes();
    if bytes.len() != 2 {
        return Err(FenError::BadEnPassant(field.to_string()));
    }
    let file = bytes[0];
    let rank = bytes[1];
    if !(b'a'..=b'h').contains(&file) {
        return Err(FenError::BadEnPassant(field.to_string()));
    }
    let expected_rank = match side_to_move {
        Color::White => b'6',
        Color::Black => b'3',
    };
    if rank != expected_rank {
        return Err(FenError::BadEnPassant(field.to_string()));
    }
    let file_idx = file - b'a';
    let rank_idx = rank - b'1';
    Ok(Some(Square::from_rank_file(rank_idx, file_idx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn startpos_round_trips() {
        let board: Board = STARTPOS.parse().unwrap();
        assert_eq!(board.to_fen(), STARTPOS);
        assert_eq!(board, Board::new());
    }

    #[test]
    fn kiwipete_round_trips() {
        let kiwipete =
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let board: Board = kiwipete.parse().unwrap();
        assert_eq!(board.to_fen(), kiwipete);
    }

    #[test]
    fn missing_king_is_rejected_and_board_unchanged() {
        let mut board = Board::new();
        let before = board.clone();
        let err = board.set_fen("8/8/8/8/8/8/8/8 w - - 0 1");
        assert!(err.is_err());
        assert_eq!(board, before);
    }

    #[test]
    fn en_passant_square_must_match_side_to_move_rank() {
        // After 1.e4, it's Black to move and e3 is the ep target.
        let fen_ok = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert!(fen_ok.parse::<Board>().is_ok());
        // Same placement with White to move: e3 cannot be an ep target.
        let fen_bad = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e3 0 1";
        assert!(fen_bad.parse::<Board>().is_err());
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert!(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"
                .parse::<Board>()
                .is_err()
        );
    }

    #[test]
    fn optional_clocks_default_when_absent() {
        let board: Board = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
            .parse()
            .unwrap();
        assert_eq!(board.halfmove_clock, 0);
        assert_eq!(board.fullmove_number, 1);
    }
}
