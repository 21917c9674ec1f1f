use std::fmt;
use std::str::FromStr;

pub const N_SQUARES: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    /// Opposite color.
    pub fn flip(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank step a pawn of this color advances by.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub fn index(self) -> usize { self as usize }
}

impl From<Color> for char {
    fn from(value: Color) -> Self {
        match value {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Piece {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl Piece {
    pub const PROMOTIONS: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

    pub fn index(self) -> usize { self as usize }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Piece::Pawn),
            'n' => Some(Piece::Knight),
            'b' => Some(Piece::Bishop),
            'r' => Some(Piece::Rook),
            'q' => Some(Piece::Queen),
            'k' => Some(Piece::King),
            _ => None,
        }
    }
}

impl From<Piece> for char {
    fn from(value: Piece) -> Self {
        match value {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        }
    }
}

/// Color and piece.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ColPiece {
    pub col: Color,
    pub pc: Piece,
}

impl ColPiece {
    pub fn new(col: Color, pc: Piece) -> Self { Self { col, pc } }

    /// Index into 12-entry per-piece tables (white pieces first).
    pub fn index(self) -> usize { self.col.index() * 6 + self.pc.index() }

    /// FEN letter: uppercase for white, lowercase for black.
    pub fn from_char(c: char) -> Option<Self> {
        let pc = Piece::from_char(c)?;
        let col = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        Some(Self { col, pc })
    }
}

impl From<ColPiece> for char {
    fn from(value: ColPiece) -> Self {
        let lower = char::from(value.pc);
        match value.col {
            Color::White => lower.to_ascii_uppercase(),
            Color::Black => lower,
        }
    }
}

/// Square index newtype.
///
/// A1 is 0, H1 is 7, A8 is 56 and H8 is 63.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid square '{0}'")]
pub struct SquareError(pub String);

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 { Some(Square(rank * 8 + file)) } else { None }
    }

    pub fn index(self) -> usize { self.0 as usize }
    pub fn file(self) -> u8 { self.0 % 8 }
    pub fn rank(self) -> u8 { self.0 / 8 }

    /// Square reached by stepping `df` files and `dr` ranks, if still on the board.
    pub fn offset(self, df: i8, dr: i8) -> Option<Self> {
        let f = self.file() as i8 + df;
        let r = self.rank() as i8 + dr;
        if (0..8).contains(&f) && (0..8).contains(&r) { Some(Square((r * 8 + f) as u8)) } else { None }
    }

    pub fn all() -> impl Iterator<Item = Square> { (0..N_SQUARES as u8).map(Square) }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file()) as char, self.rank() + 1)
    }
}

impl FromStr for Square {
    type Err = SquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let b = s.as_bytes();
        if b.len() != 2 || !(b'a'..=b'h').contains(&b[0]) || !(b'1'..=b'8').contains(&b[1]) {
            return Err(SquareError(s.to_string()));
        }
        Ok(Square((b[1] - b'1') * 8 + (b[0] - b'a')))
    }
}

/// Castling rights as a 4-bit set.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct CastleRights(u8);

impl CastleRights {
    pub const WHITE_KING: u8 = 1;
    pub const WHITE_QUEEN: u8 = 2;
    pub const BLACK_KING: u8 = 4;
    pub const BLACK_QUEEN: u8 = 8;
    pub const ALL: CastleRights = CastleRights(15);
    pub const NONE: CastleRights = CastleRights(0);

    pub fn bits(self) -> u8 { self.0 }
    pub fn has(self, flag: u8) -> bool { self.0 & flag != 0 }
    pub fn insert(&mut self, flag: u8) { self.0 |= flag; }
    pub fn retain(&mut self, mask: u8) { self.0 &= mask; }

    pub fn kingside(col: Color) -> u8 {
        match col {
            Color::White => Self::WHITE_KING,
            Color::Black => Self::BLACK_KING,
        }
    }

    pub fn queenside(col: Color) -> u8 {
        match col {
            Color::White => Self::WHITE_QUEEN,
            Color::Black => Self::BLACK_QUEEN,
        }
    }

    /// Rights that survive a move touching `sq` (as origin or destination).
    pub fn mask_for(sq: Square) -> u8 {
        match sq.index() {
            0 => !Self::WHITE_QUEEN,
            4 => !(Self::WHITE_KING | Self::WHITE_QUEEN),
            7 => !Self::WHITE_KING,
            56 => !Self::BLACK_QUEEN,
            60 => !(Self::BLACK_KING | Self::BLACK_QUEEN),
            63 => !Self::BLACK_KING,
            _ => 0xF,
        }
    }
}

impl fmt::Display for CastleRights {
    /// FEN castling field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 { return write!(f, "-"); }
        for (flag, ch) in [(Self::WHITE_KING, 'K'), (Self::WHITE_QUEEN, 'Q'), (Self::BLACK_KING, 'k'), (Self::BLACK_QUEEN, 'q')] {
            if self.has(flag) { write!(f, "{ch}")?; }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algebraic_round_trip_corners() {
        for (name, idx) in [("a1", 0), ("h1", 7), ("a8", 56), ("h8", 63), ("e4", 28)] {
            let sq: Square = name.parse().unwrap();
            assert_eq!(sq.index(), idx);
            assert_eq!(sq.to_string(), name);
        }
        assert!("i1".parse::<Square>().is_err());
        assert!("a9".parse::<Square>().is_err());
        assert!("a".parse::<Square>().is_err());
    }

    #[test]
    fn offset_stays_on_board() {
        let h1: Square = "h1".parse().unwrap();
        assert_eq!(h1.offset(1, 0), None);
        assert_eq!(h1.offset(-1, 1).map(|s| s.to_string()), Some("g2".to_string()));
    }

    #[test]
    fn castle_masks_clear_rights() {
        let mut r = CastleRights::ALL;
        r.retain(CastleRights::mask_for("h1".parse().unwrap()));
        assert_eq!(r.to_string(), "Qkq");
        r.retain(CastleRights::mask_for("e8".parse().unwrap()));
        assert_eq!(r.to_string(), "Q");
    }
}
