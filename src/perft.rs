//! Perft: exhaustive legal-move-path counting with leaf statistics.
//!
//! Legality is filtered lazily: every pseudo-legal move is applied, moves that leave the
//! mover in check are undone and discarded, the rest are recursed into.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::board::{PerftBoard, PerftMove};

/// Counters accumulated over a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthResult {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
    pub hash_mismatches: u64,
}

impl DepthResult {
    /// Field-wise sum. Associative and commutative, so sibling subtrees can be reduced in any order.
    pub fn combine(self, other: Self) -> Self {
        Self {
            nodes: self.nodes + other.nodes,
            captures: self.captures + other.captures,
            en_passant: self.en_passant + other.en_passant,
            castles: self.castles + other.castles,
            promotions: self.promotions + other.promotions,
            checks: self.checks + other.checks,
            checkmates: self.checkmates + other.checkmates,
            hash_mismatches: self.hash_mismatches + other.hash_mismatches,
        }
    }

    pub fn merge(&mut self, other: Self) { *self = self.combine(other); }

    /// `checkmates <= checks <= nodes` and every move-type counter bounded by `nodes`.
    pub fn holds_invariants(&self) -> bool {
        self.checkmates <= self.checks
            && self.checks <= self.nodes
            && self.captures <= self.nodes
            && self.en_passant <= self.nodes
            && self.castles <= self.nodes
            && self.promotions <= self.nodes
            && self.hash_mismatches <= self.nodes
    }
}

impl Add for DepthResult {
    type Output = Self;
    fn add(self, rhs: Self) -> Self { self.combine(rhs) }
}

impl AddAssign for DepthResult {
    fn add_assign(&mut self, rhs: Self) { self.merge(rhs) }
}

impl Sum for DepthResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self { iter.fold(Self::default(), Self::combine) }
}

/// Moves on the current search path from the root; its length is the current recursion depth.
#[derive(Debug, Clone, Default)]
pub struct MoveStack<M> {
    moves: Vec<M>,
}

impl<M> MoveStack<M> {
    pub fn new() -> Self { Self { moves: Vec::with_capacity(16) } }
    pub fn push(&mut self, mv: M) { self.moves.push(mv); }
    pub fn pop(&mut self) -> Option<M> { self.moves.pop() }
    pub fn len(&self) -> usize { self.moves.len() }
    pub fn is_empty(&self) -> bool { self.moves.is_empty() }
    pub fn as_slice(&self) -> &[M] { &self.moves }
}

impl<M: fmt::Display> MoveStack<M> {
    /// Space separated path from the root, e.g. `e2e4 e7e5`.
    pub fn path(&self) -> String {
        self.moves.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ")
    }
}

/// One traversal over an exclusively borrowed board.
pub struct Perft<'a, B: PerftBoard> {
    board: &'a mut B,
    stack: MoveStack<B::Move>,
}

impl<'a, B: PerftBoard> Perft<'a, B> {
    pub fn new(board: &'a mut B) -> Self { Self { board, stack: MoveStack::new() } }

    pub fn stack(&self) -> &MoveStack<B::Move> { &self.stack }

    /// Statistics over every legal move path of exactly `depth` plies.
    ///
    /// Depth 0 is a single leaf with no incoming move.
    pub fn run(&mut self, depth: u32) -> DepthResult {
        debug!("perft run depth={depth}");
        if depth == 0 { return leaf(self.board, &self.stack, None); }
        let mut dr = DepthResult::default();
        for mv in self.board.pseudo_legal_moves() {
            if let Some(sub) = legal_subtree(self.board, &mut self.stack, depth, mv) { dr += sub; }
        }
        dr
    }

    /// Per-root-move breakdown of [`Perft::run`], in generation order.
    pub fn divide(&mut self, depth: u32) -> Vec<(B::Move, DepthResult)> {
        debug!("perft divide depth={depth}");
        if depth == 0 { return Vec::new(); }
        let mut out = Vec::new();
        for mv in self.board.pseudo_legal_moves() {
            if let Some(sub) = legal_subtree(self.board, &mut self.stack, depth, mv) { out.push((mv, sub)); }
        }
        out
    }
}

pub fn perft<B: PerftBoard>(board: &mut B, depth: u32) -> DepthResult { Perft::new(board).run(depth) }

pub fn divide<B: PerftBoard>(board: &mut B, depth: u32) -> Vec<(B::Move, DepthResult)> { Perft::new(board).divide(depth) }

/// Root-split perft: each root move is searched on its own board copy and stack.
///
/// Runs on the current rayon pool; install a pool to bound the thread count.
pub fn perft_parallel<B>(board: &B, depth: u32) -> DepthResult
where
    B: PerftBoard + Send + Sync,
    B::Move: Send + Sync,
{
    if depth == 0 { return perft(&mut board.clone(), 0); }
    let root = board.pseudo_legal_moves();
    root.par_iter()
        .map(|&mv| {
            let mut b = board.clone();
            let mut stack = MoveStack::new();
            legal_subtree(&mut b, &mut stack, depth, mv).unwrap_or_default()
        })
        .reduce(DepthResult::default, DepthResult::combine)
}

/// Side to move is in check and no pseudo-legal reply escapes it.
///
/// The reply search only borrows the board for its own make/unmake pairs.
pub fn is_checkmated<B: PerftBoard>(board: &mut B) -> bool {
    board.in_check() && !has_legal_reply(board)
}

fn has_legal_reply<B: PerftBoard>(board: &mut B) -> bool {
    board.pseudo_legal_moves().into_iter().any(|mv| board.with_move(mv, |b| !b.mover_in_check()))
}

/// Searches below `mv` (applied from the current node), or `None` if `mv` is illegal.
fn legal_subtree<B: PerftBoard>(board: &mut B, stack: &mut MoveStack<B::Move>, depth: u32, mv: B::Move) -> Option<DepthResult> {
    board.with_move(mv, |b| if b.mover_in_check() { None } else { Some(recurse(b, stack, depth - 1, mv)) })
}

fn recurse<B: PerftBoard>(board: &mut B, stack: &mut MoveStack<B::Move>, depth: u32, last: B::Move) -> DepthResult {
    stack.push(last);
    let dr = if depth == 0 {
        leaf(board, stack, Some(last))
    } else {
        let mut dr = DepthResult::default();
        for mv in board.pseudo_legal_moves() {
            if let Some(sub) = legal_subtree(board, stack, depth, mv) { dr += sub; }
        }
        dr
    };
    stack.pop();
    dr
}

fn leaf<B: PerftBoard>(board: &mut B, stack: &MoveStack<B::Move>, last: Option<B::Move>) -> DepthResult {
    let mut dr = DepthResult { nodes: 1, ..DepthResult::default() };
    if let Some(m) = last {
        dr.captures = u64::from(m.is_capture());
        dr.castles = u64::from(m.is_castle());
        dr.en_passant = u64::from(m.is_en_passant());
        dr.promotions = u64::from(m.is_promotion());
    }
    if board.in_check() {
        dr.checks = 1;
        if !has_legal_reply(board) { dr.checkmates = 1; }
    }
    let (incremental, scratch) = (board.hash(), board.recompute_hash());
    if incremental != scratch {
        dr.hash_mismatches = 1;
        warn!("hash mismatch after [{}]: incremental {incremental:016x}, recomputed {scratch:016x}", stack.path());
    }
    dr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    fn sample(seed: u64) -> DepthResult {
        DepthResult {
            nodes: 100 + seed,
            captures: seed,
            en_passant: seed / 2,
            castles: seed % 3,
            promotions: seed % 5,
            checks: seed % 7,
            checkmates: seed % 2,
            hash_mismatches: 0,
        }
    }

    #[test]
    fn combine_is_associative_and_commutative() {
        let (a, b, c) = (sample(3), sample(10), sample(41));
        assert_eq!(a.combine(b).combine(c), a.combine(b.combine(c)));
        assert_eq!(a.combine(b), b.combine(a));
        assert_eq!(a + DepthResult::default(), a);
        assert_eq!([a, b, c].into_iter().sum::<DepthResult>(), c + a + b);
    }

    #[test]
    fn invariants_flag_bad_counts() {
        assert!(sample(9).holds_invariants());
        let bad = DepthResult { nodes: 1, checks: 1, checkmates: 2, ..DepthResult::default() };
        assert!(!bad.holds_invariants());
    }

    #[test]
    fn move_stack_path() {
        let mut s = MoveStack::new();
        assert!(s.is_empty());
        s.push("e2e4");
        s.push("e7e5");
        assert_eq!(s.len(), 2);
        assert_eq!(s.path(), "e2e4 e7e5");
        assert_eq!(s.pop(), Some("e7e5"));
        assert_eq!(s.as_slice(), &["e2e4"]);
    }

    #[test]
    fn stack_unwinds_and_board_restored() {
        let mut pos = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let before = pos.clone();
        let mut p = Perft::new(&mut pos);
        assert_eq!(p.run(2).nodes, 2039);
        assert!(p.stack().is_empty());
        assert_eq!(p.divide(1).len(), 48);
        assert!(p.stack().is_empty());
        assert_eq!(pos, before);
    }

    #[test]
    fn root_depth_zero_is_single_leaf() {
        let mut pos = Position::startpos();
        assert_eq!(perft(&mut pos, 0), DepthResult { nodes: 1, ..DepthResult::default() });
        assert!(divide(&mut pos, 0).is_empty());
    }

    #[test]
    fn checkmate_detection() {
        // fool's mate delivered
        let mut mated = Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        assert!(is_checkmated(&mut mated));
        let mut checked = Position::from_fen("4k3/8/8/8/8/8/8/4K2r w - - 0 1").unwrap();
        assert!(checked.in_check());
        assert!(!is_checkmated(&mut checked));
        assert!(!is_checkmated(&mut Position::startpos()));
    }
}
