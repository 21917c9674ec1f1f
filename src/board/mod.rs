//! Position-state machinery consumed by the perft engine.
//!
//! The engine only sees the [`PerftBoard`] / [`PerftMove`] capabilities; [`Position`] is the
//! in-crate implementation and [`cozy`] wraps an independent generator for cross-checks.

pub mod cozy;
pub mod fen;
pub mod moves;
pub mod position;
pub mod types;
pub mod zobrist;

pub use fen::{FenError, START_POSITION};
pub use moves::{Move, MoveKind, MoveParseError};
pub use position::Position;
pub use types::{CastleRights, ColPiece, Color, Piece, Square};

/// Classification predicates of a candidate ply.
pub trait PerftMove: Copy {
    fn is_capture(&self) -> bool;
    fn is_castle(&self) -> bool;
    fn is_en_passant(&self) -> bool;
    fn is_promotion(&self) -> bool;
}

/// Mutable position driven through generate / make / unmake.
///
/// `make` and `unmake` must be exact inverses, hash included.
pub trait PerftBoard: Clone {
    type Move: PerftMove + std::fmt::Display;

    /// Every legal move, possibly plus moves that leave the mover in check.
    fn pseudo_legal_moves(&self) -> Vec<Self::Move>;
    fn make(&mut self, mv: Self::Move);
    fn unmake(&mut self, mv: Self::Move);
    /// Side to move is attacked.
    fn in_check(&self) -> bool;
    /// Side that just moved is attacked, i.e. the last move was illegal.
    fn mover_in_check(&self) -> bool;
    /// Incrementally maintained hash.
    fn hash(&self) -> u64;
    /// Hash derived from scratch; must equal [`PerftBoard::hash`].
    fn recompute_hash(&self) -> u64;

    /// Apply `mv`, run `f`, then undo `mv`.
    ///
    /// The board is back in its prior state when this returns.
    fn with_move<R>(&mut self, mv: Self::Move, f: impl FnOnce(&mut Self) -> R) -> R {
        self.make(mv);
        let r = f(self);
        self.unmake(mv);
        r
    }
}
