//! Zobrist keys and from-scratch hash computation.

use std::sync::OnceLock;

use super::position::Position;
use super::types::{CastleRights, ColPiece, Color, Square, N_SQUARES};

pub struct Keys {
    pieces: [[u64; N_SQUARES]; 12],
    castle: [u64; 16],
    ep_file: [u64; 8],
    side: u64,
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

static KEYS: OnceLock<Keys> = OnceLock::new();

pub fn keys() -> &'static Keys {
    KEYS.get_or_init(|| {
        let mut seed = 0xF00D_F00D_DEAD_BEEF;
        let mut next = || {
            seed = splitmix64(seed);
            seed
        };
        let mut k = Keys { pieces: [[0; N_SQUARES]; 12], castle: [0; 16], ep_file: [0; 8], side: 0 };
        for table in &mut k.pieces {
            for v in table.iter_mut() { *v = next(); }
        }
        for v in &mut k.castle { *v = next(); }
        for v in &mut k.ep_file { *v = next(); }
        k.side = next();
        k
    })
}

impl Keys {
    pub fn piece(&self, pc: ColPiece, sq: Square) -> u64 { self.pieces[pc.index()][sq.index()] }
    pub fn castle(&self, rights: CastleRights) -> u64 { self.castle[rights.bits() as usize] }
    pub fn ep(&self, sq: Option<Square>) -> u64 { sq.map_or(0, |s| self.ep_file[s.file() as usize]) }
    pub fn side(&self) -> u64 { self.side }
}

/// Hash of `pos` derived only from its board, side, castling and en-passant state.
pub fn compute(pos: &Position) -> u64 {
    let k = keys();
    let mut key = 0u64;
    for sq in Square::all() {
        if let Some(pc) = pos.piece_at(sq) { key ^= k.piece(pc, sq); }
    }
    key ^= k.castle(pos.castle_rights());
    key ^= k.ep(pos.ep_square());
    if pos.side_to_move() == Color::Black { key ^= k.side(); }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_and_distinct() {
        let k = keys();
        assert_eq!(k.side(), keys().side());
        let mut seen = std::collections::HashSet::new();
        for table in &k.pieces { for &v in table.iter() { assert!(seen.insert(v)); } }
        for &v in k.castle.iter().chain(k.ep_file.iter()) { assert!(seen.insert(v)); }
    }

    #[test]
    fn side_to_move_changes_hash() {
        let w = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let b = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_eq!(compute(&w) ^ compute(&b), keys().side());
    }
}
