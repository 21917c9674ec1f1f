//! FEN loading and rendering.

use super::position::Position;
use super::types::{CastleRights, ColPiece, Color, Piece, Square};
use super::zobrist;

pub const START_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// FEN parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("FEN needs at least 4 fields, got {0}")]
    MissingFields(usize),
    #[error("FEN has {0} fields, expected at most 6")]
    TooManyFields(usize),
    #[error("invalid piece character '{0}'")]
    BadPiece(char),
    #[error("rank {0} does not cover exactly 8 files")]
    BadRankWidth(usize),
    #[error("board has {0} ranks, expected 8")]
    BadRankCount(usize),
    #[error("invalid side to move '{0}'")]
    BadSide(String),
    #[error("invalid castling field '{0}'")]
    BadCastling(String),
    #[error("invalid en-passant field '{0}'")]
    BadEnPassant(String),
    #[error("invalid move counter '{0}'")]
    BadCounter(String),
    #[error("{0:?} must have exactly one king")]
    KingCount(Color),
    #[error("en-passant square '{0}' has no pawn that just double-pushed")]
    NoEnPassantPawn(String),
    #[error("side not to move is in check")]
    OpponentInCheck,
}

impl Position {
    /// Parse a FEN string.
    ///
    /// The half-move and full-move counters are optional and default to `0 1`.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 { return Err(FenError::MissingFields(fields.len())); }
        if fields.len() > 6 { return Err(FenError::TooManyFields(fields.len())); }

        let mut pos = Position::empty();

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 { return Err(FenError::BadRankCount(ranks.len())); }
        for (i, row) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in row.chars() {
                if let Some(n) = c.to_digit(10) {
                    if n == 0 || n > 8 { return Err(FenError::BadPiece(c)); }
                    file += n as u8;
                } else {
                    let pc = ColPiece::from_char(c).ok_or(FenError::BadPiece(c))?;
                    let sq = Square::new(file, rank).ok_or(FenError::BadRankWidth(rank as usize + 1))?;
                    pos.put(sq, pc);
                    file += 1;
                }
                if file > 8 { return Err(FenError::BadRankWidth(rank as usize + 1)); }
            }
            if file != 8 { return Err(FenError::BadRankWidth(rank as usize + 1)); }
        }

        pos.turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::BadSide(other.to_string())),
        };

        if fields[2] != "-" {
            for c in fields[2].chars() {
                let flag = match c {
                    'K' => CastleRights::WHITE_KING,
                    'Q' => CastleRights::WHITE_QUEEN,
                    'k' => CastleRights::BLACK_KING,
                    'q' => CastleRights::BLACK_QUEEN,
                    _ => return Err(FenError::BadCastling(fields[2].to_string())),
                };
                if pos.castle.has(flag) { return Err(FenError::BadCastling(fields[2].to_string())); }
                pos.castle.insert(flag);
            }
        }

        if fields[3] != "-" {
            let sq: Square = fields[3].parse().map_err(|_| FenError::BadEnPassant(fields[3].to_string()))?;
            let expected_rank = if pos.turn == Color::White { 5 } else { 2 };
            if sq.rank() != expected_rank { return Err(FenError::BadEnPassant(fields[3].to_string())); }
            // the target is empty and the pushed enemy pawn stands right past it
            let pusher = ColPiece::new(pos.turn.flip(), Piece::Pawn);
            let victim = sq.offset(0, -pos.turn.forward()).and_then(|v| pos.piece_at(v));
            if pos.piece_at(sq).is_some() || victim != Some(pusher) {
                return Err(FenError::NoEnPassantPawn(fields[3].to_string()));
            }
            pos.ep = Some(sq);
        }

        if let Some(hm) = fields.get(4) {
            pos.halfmove = hm.parse().map_err(|_| FenError::BadCounter(hm.to_string()))?;
        }
        if let Some(fm) = fields.get(5) {
            pos.fullmove = fm.parse().map_err(|_| FenError::BadCounter(fm.to_string()))?;
        }

        for col in Color::ALL {
            let kings = Square::all().filter(|&s| pos.piece_at(s) == Some(ColPiece::new(col, Piece::King))).count();
            if kings != 1 { return Err(FenError::KingCount(col)); }
        }
        if pos.king_attacked(pos.turn.flip()) { return Err(FenError::OpponentInCheck); }

        pos.hash = zobrist::compute(&pos);
        Ok(pos)
    }

    /// Six-field FEN of the current state.
    pub fn to_fen(&self) -> String {
        let mut board = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                let pc = Square::new(file, rank).and_then(|sq| self.piece_at(sq));
                match pc {
                    Some(pc) => {
                        if empty > 0 { board.push_str(&empty.to_string()); empty = 0; }
                        board.push(char::from(pc));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 { board.push_str(&empty.to_string()); }
            if rank > 0 { board.push('/'); }
        }
        let ep = self.ep.map_or_else(|| "-".to_string(), |s| s.to_string());
        format!("{} {} {} {} {} {}", board, char::from(self.turn), self.castle, ep, self.halfmove, self.fullmove)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_round_trip() {
        let pos = Position::from_fen(START_POSITION).unwrap();
        assert_eq!(pos.to_fen(), START_POSITION);
    }

    #[test]
    fn counters_default_when_absent() {
        let pos = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -").unwrap();
        assert_eq!(pos.to_fen(), "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
    }

    #[test]
    fn en_passant_square_is_kept() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
        assert_eq!(Position::from_fen(fen).unwrap().to_fen(), fen);
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let cases = [
            ("", FenError::MissingFields(0)),
            ("8/8/8/8/8/8/8/8 w", FenError::MissingFields(2)),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq -", FenError::BadRankCount(7)),
            ("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -", FenError::BadRankWidth(7)),
            ("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -", FenError::BadPiece('9')),
            ("rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -", FenError::BadPiece('x')),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq -", FenError::BadSide("x".into())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkz -", FenError::BadCastling("KQkz".into())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4", FenError::BadEnPassant("e4".into())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1", FenError::BadCounter("x".into())),
            ("rnbq1bnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQ -", FenError::KingCount(Color::Black)),
            ("4k3/8/8/8/8/8/8/4K2r b - - 0 1", FenError::OpponentInCheck),
            ("4k3/8/8/8/4Q3/8/8/4K3 w - - 0 1", FenError::OpponentInCheck),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e6", FenError::NoEnPassantPawn("e6".into())),
            ("rnbqkbnr/pppp1ppp/8/4P3/8/8/PPPP1PPP/RNBQKBNR w KQkq e6", FenError::NoEnPassantPawn("e6".into())),
            ("rnbqkbnr/pppp1ppp/4p3/4p3/8/8/PPPP1PPP/RNBQKBNR w KQkq e6", FenError::NoEnPassantPawn("e6".into())),
        ];
        for (fen, err) in cases {
            assert_eq!(Position::from_fen(fen).unwrap_err(), err, "fen: {fen}");
        }
    }
}
