use std::fmt;

use super::types::{Piece, Square};
use super::PerftMove;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Quiet,
    /// Pawn advance by two ranks; sets the en-passant square.
    DoublePush,
    Capture,
    EnPassant,
    Castle,
}

/// Pseudo-legal move.
///
/// Carries the moving piece so make/unmake never have to look it up.
/// Promotions are `Quiet` or `Capture` with `promotion` set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub kind: MoveKind,
    pub promotion: Option<Piece>,
}

impl Move {
    pub fn new(from: Square, to: Square, piece: Piece, kind: MoveKind) -> Self {
        Self { from, to, piece, kind, promotion: None }
    }

    pub fn promoting(from: Square, to: Square, kind: MoveKind, promotion: Piece) -> Self {
        Self { from, to, piece: Piece::Pawn, kind, promotion: Some(promotion) }
    }

    /// UCI notation (`e2e4`, `e7e8q`, `e1g1`).
    pub fn to_uci(&self) -> String { self.to_string() }
}

impl PerftMove for Move {
    fn is_capture(&self) -> bool { matches!(self.kind, MoveKind::Capture | MoveKind::EnPassant) }
    fn is_castle(&self) -> bool { self.kind == MoveKind::Castle }
    fn is_en_passant(&self) -> bool { self.kind == MoveKind::EnPassant }
    fn is_promotion(&self) -> bool { self.promotion.is_some() }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion { write!(f, "{}", char::from(p))?; }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveParseError {
    #[error("malformed move '{0}'")]
    Malformed(String),
    #[error("illegal move '{0}'")]
    Illegal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square { s.parse().unwrap() }

    #[test]
    fn en_passant_counts_as_capture() {
        let mv = Move::new(sq("e5"), sq("d6"), Piece::Pawn, MoveKind::EnPassant);
        assert!(mv.is_capture());
        assert!(mv.is_en_passant());
        assert!(!mv.is_castle());
        assert!(!mv.is_promotion());
    }

    #[test]
    fn promotion_capture_flags_and_uci() {
        let mv = Move::promoting(sq("b7"), sq("a8"), MoveKind::Capture, Piece::Knight);
        assert!(mv.is_capture());
        assert!(mv.is_promotion());
        assert_eq!(mv.to_uci(), "b7a8n");
    }
}
