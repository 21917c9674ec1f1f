//! Mailbox position with pseudo-legal move generation and reversible make/unmake.

use std::fmt;
use std::str::FromStr;

use super::fen::{FenError, START_POSITION};
use super::moves::{Move, MoveKind, MoveParseError};
use super::types::{CastleRights, ColPiece, Color, Piece, Square, N_SQUARES};
use super::{zobrist, PerftBoard};

const KNIGHT_STEPS: [(i8, i8); 8] = [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];
const KING_STEPS: [(i8, i8); 8] = [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)];
const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// State a move destroys, restored by `unmake`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Undo {
    captured: Option<ColPiece>,
    castle: CastleRights,
    ep: Option<Square>,
    halfmove: u32,
    fullmove: u32,
    hash: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub(super) squares: [Option<ColPiece>; N_SQUARES],
    pub(super) turn: Color,
    pub(super) castle: CastleRights,
    pub(super) ep: Option<Square>,
    pub(super) halfmove: u32,
    pub(super) fullmove: u32,
    pub(super) hash: u64,
    kings: [Option<Square>; 2],
    history: Vec<Undo>,
}

impl Default for Position {
    fn default() -> Self { Self::startpos() }
}

impl Position {
    pub(super) fn empty() -> Self {
        Self {
            squares: [None; N_SQUARES],
            turn: Color::White,
            castle: CastleRights::NONE,
            ep: None,
            halfmove: 0,
            fullmove: 1,
            hash: 0,
            kings: [None; 2],
            history: Vec::with_capacity(128),
        }
    }

    pub fn startpos() -> Self {
        match Self::from_fen(START_POSITION) {
            Ok(pos) => pos,
            Err(e) => unreachable!("start position FEN rejected: {e}"),
        }
    }

    pub fn piece_at(&self, sq: Square) -> Option<ColPiece> { self.squares[sq.index()] }
    pub fn side_to_move(&self) -> Color { self.turn }
    pub fn castle_rights(&self) -> CastleRights { self.castle }
    pub fn ep_square(&self) -> Option<Square> { self.ep }
    pub fn hash(&self) -> u64 { self.hash }
    pub fn recompute_hash(&self) -> u64 { zobrist::compute(self) }

    /// Place a piece during setup. Does not touch the hash.
    pub(super) fn put(&mut self, sq: Square, pc: ColPiece) {
        self.squares[sq.index()] = Some(pc);
        if pc.pc == Piece::King { self.kings[pc.col.index()] = Some(sq); }
    }

    fn king(&self, col: Color) -> Option<Square> { self.kings[col.index()] }

    fn toggle(&mut self, sq: Square, pc: ColPiece) {
        self.hash ^= zobrist::keys().piece(pc, sq);
    }

    fn remove(&mut self, sq: Square) -> Option<ColPiece> {
        let pc = self.squares[sq.index()].take();
        if let Some(pc) = pc { self.toggle(sq, pc); }
        pc
    }

    fn place(&mut self, sq: Square, pc: ColPiece) {
        self.squares[sq.index()] = Some(pc);
        self.toggle(sq, pc);
        if pc.pc == Piece::King { self.kings[pc.col.index()] = Some(sq); }
    }

    /// Rook origin and destination for a castling king move.
    fn castle_rook(to: Square) -> (Square, Square) {
        let rank = to.rank();
        let (from_file, to_file) = if to.file() == 6 { (7, 5) } else { (0, 3) };
        match (Square::new(from_file, rank), Square::new(to_file, rank)) {
            (Some(a), Some(b)) => (a, b),
            _ => unreachable!("castling target off board"),
        }
    }

    /// Square of the pawn removed by an en-passant capture landing on `to`.
    fn ep_victim(to: Square, mover: Color) -> Square {
        match to.offset(0, -mover.forward()) {
            Some(sq) => sq,
            None => unreachable!("en-passant target on edge rank"),
        }
    }

    /// True if any piece of color `by` attacks `sq`.
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        let is = |s: Option<Square>, pc: Piece| {
            s.and_then(|s| self.piece_at(s)) == Some(ColPiece::new(by, pc))
        };
        // a pawn of `by` attacks sq from one rank behind it (from its own perspective)
        let back = -by.forward();
        if is(sq.offset(-1, back), Piece::Pawn) || is(sq.offset(1, back), Piece::Pawn) { return true; }
        if KNIGHT_STEPS.iter().any(|&(df, dr)| is(sq.offset(df, dr), Piece::Knight)) { return true; }
        if KING_STEPS.iter().any(|&(df, dr)| is(sq.offset(df, dr), Piece::King)) { return true; }
        self.slider_hits(sq, &ROOK_DIRS, by, Piece::Rook) || self.slider_hits(sq, &BISHOP_DIRS, by, Piece::Bishop)
    }

    fn slider_hits(&self, sq: Square, dirs: &[(i8, i8)], by: Color, slider: Piece) -> bool {
        for &(df, dr) in dirs {
            let mut cur = sq.offset(df, dr);
            while let Some(s) = cur {
                if let Some(pc) = self.piece_at(s) {
                    if pc.col == by && (pc.pc == slider || pc.pc == Piece::Queen) { return true; }
                    break;
                }
                cur = s.offset(df, dr);
            }
        }
        false
    }

    pub(super) fn king_attacked(&self, col: Color) -> bool {
        self.king(col).is_some_and(|k| self.is_attacked(k, col.flip()))
    }

    /// Side to move is in check.
    pub fn in_check(&self) -> bool { self.king_attacked(self.turn) }

    /// Side that just moved has left its king attacked.
    pub fn mover_in_check(&self) -> bool { self.king_attacked(self.turn.flip()) }

    /// All pseudo-legal moves for the side to move.
    pub fn pseudo_legal_moves(&self) -> Vec<Move> {
        let mut out = Vec::with_capacity(64);
        let us = self.turn;
        for from in Square::all() {
            let Some(pc) = self.piece_at(from) else { continue };
            if pc.col != us { continue; }
            match pc.pc {
                Piece::Pawn => self.gen_pawn(from, &mut out),
                Piece::Knight => self.gen_steps(from, Piece::Knight, &KNIGHT_STEPS, &mut out),
                Piece::King => {
                    self.gen_steps(from, Piece::King, &KING_STEPS, &mut out);
                    self.gen_castles(from, &mut out);
                }
                Piece::Bishop => self.gen_slides(from, Piece::Bishop, &BISHOP_DIRS, &mut out),
                Piece::Rook => self.gen_slides(from, Piece::Rook, &ROOK_DIRS, &mut out),
                Piece::Queen => {
                    self.gen_slides(from, Piece::Queen, &ROOK_DIRS, &mut out);
                    self.gen_slides(from, Piece::Queen, &BISHOP_DIRS, &mut out);
                }
            }
        }
        out
    }

    fn gen_pawn(&self, from: Square, out: &mut Vec<Move>) {
        let us = self.turn;
        let fwd = us.forward();
        let last_rank = if us == Color::White { 7 } else { 0 };
        let start_rank = if us == Color::White { 1 } else { 6 };
        let push = |to: Square, kind: MoveKind, out: &mut Vec<Move>| {
            if to.rank() == last_rank {
                for promo in Piece::PROMOTIONS { out.push(Move::promoting(from, to, kind, promo)); }
            } else {
                out.push(Move::new(from, to, Piece::Pawn, kind));
            }
        };

        if let Some(one) = from.offset(0, fwd) {
            if self.piece_at(one).is_none() {
                push(one, MoveKind::Quiet, out);
                if from.rank() == start_rank {
                    if let Some(two) = one.offset(0, fwd) {
                        if self.piece_at(two).is_none() {
                            out.push(Move::new(from, two, Piece::Pawn, MoveKind::DoublePush));
                        }
                    }
                }
            }
        }
        for df in [-1, 1] {
            let Some(to) = from.offset(df, fwd) else { continue };
            match self.piece_at(to) {
                Some(victim) if victim.col != us => push(to, MoveKind::Capture, out),
                None if self.ep == Some(to) => out.push(Move::new(from, to, Piece::Pawn, MoveKind::EnPassant)),
                _ => {}
            }
        }
    }

    fn gen_steps(&self, from: Square, piece: Piece, steps: &[(i8, i8)], out: &mut Vec<Move>) {
        for &(df, dr) in steps {
            let Some(to) = from.offset(df, dr) else { continue };
            match self.piece_at(to) {
                None => out.push(Move::new(from, to, piece, MoveKind::Quiet)),
                Some(pc) if pc.col != self.turn => out.push(Move::new(from, to, piece, MoveKind::Capture)),
                _ => {}
            }
        }
    }

    fn gen_slides(&self, from: Square, piece: Piece, dirs: &[(i8, i8)], out: &mut Vec<Move>) {
        for &(df, dr) in dirs {
            let mut cur = from.offset(df, dr);
            while let Some(to) = cur {
                match self.piece_at(to) {
                    None => out.push(Move::new(from, to, piece, MoveKind::Quiet)),
                    Some(pc) => {
                        if pc.col != self.turn { out.push(Move::new(from, to, piece, MoveKind::Capture)); }
                        break;
                    }
                }
                cur = to.offset(df, dr);
            }
        }
    }

    fn gen_castles(&self, from: Square, out: &mut Vec<Move>) {
        let us = self.turn;
        let home = if us == Color::White { 0 } else { 7 };
        if from.file() != 4 || from.rank() != home { return; }
        let them = us.flip();
        let rook = Some(ColPiece::new(us, Piece::Rook));
        let empty = |files: &[u8]| files.iter().all(|&f| Square::new(f, home).is_some_and(|s| self.piece_at(s).is_none()));
        let safe = |files: &[u8]| files.iter().all(|&f| Square::new(f, home).is_some_and(|s| !self.is_attacked(s, them)));

        // destination safety is left to the post-apply check test
        if self.castle.has(CastleRights::kingside(us))
            && Square::new(7, home).and_then(|s| self.piece_at(s)) == rook
            && empty(&[5, 6])
            && safe(&[4, 5])
        {
            if let Some(to) = Square::new(6, home) { out.push(Move::new(from, to, Piece::King, MoveKind::Castle)); }
        }
        if self.castle.has(CastleRights::queenside(us))
            && Square::new(0, home).and_then(|s| self.piece_at(s)) == rook
            && empty(&[1, 2, 3])
            && safe(&[4, 3])
        {
            if let Some(to) = Square::new(2, home) { out.push(Move::new(from, to, Piece::King, MoveKind::Castle)); }
        }
    }

    /// Apply a pseudo-legal move generated from this position.
    pub fn make(&mut self, mv: Move) {
        let us = self.turn;
        let keys = zobrist::keys();
        let captured_sq = if mv.kind == MoveKind::EnPassant { Self::ep_victim(mv.to, us) } else { mv.to };
        let captured = self.squares[captured_sq.index()];
        self.history.push(Undo { captured, castle: self.castle, ep: self.ep, halfmove: self.halfmove, fullmove: self.fullmove, hash: self.hash });

        self.hash ^= keys.ep(self.ep) ^ keys.castle(self.castle);

        if captured.is_some() { self.remove(captured_sq); }
        self.remove(mv.from);
        let landed = ColPiece::new(us, mv.promotion.unwrap_or(mv.piece));
        self.place(mv.to, landed);

        if mv.kind == MoveKind::Castle {
            let (rook_from, rook_to) = Self::castle_rook(mv.to);
            if let Some(rook) = self.remove(rook_from) { self.place(rook_to, rook); }
        }

        self.castle.retain(CastleRights::mask_for(mv.from) & CastleRights::mask_for(mv.to));
        self.ep = if mv.kind == MoveKind::DoublePush { mv.from.offset(0, us.forward()) } else { None };
        // counters saturate; unmake restores them from the undo record
        self.halfmove = if mv.piece == Piece::Pawn || captured.is_some() { 0 } else { self.halfmove.saturating_add(1) };
        if us == Color::Black { self.fullmove = self.fullmove.saturating_add(1); }
        self.turn = us.flip();

        self.hash ^= keys.side() ^ keys.ep(self.ep) ^ keys.castle(self.castle);
    }

    /// Revert `mv`, which must be the last move applied.
    pub fn unmake(&mut self, mv: Move) {
        let Some(undo) = self.history.pop() else {
            log::error!("unmake({mv}) without a matching make; position left unchanged");
            debug_assert!(false, "unmake({mv}) without a matching make");
            return;
        };
        let us = self.turn.flip();
        self.turn = us;

        if mv.kind == MoveKind::Castle {
            let (rook_from, rook_to) = Self::castle_rook(mv.to);
            if let Some(rook) = self.squares[rook_to.index()].take() { self.squares[rook_from.index()] = Some(rook); }
        }

        self.squares[mv.to.index()] = None;
        self.squares[mv.from.index()] = Some(ColPiece::new(us, mv.piece));
        if mv.piece == Piece::King { self.kings[us.index()] = Some(mv.from); }
        if let Some(victim) = undo.captured {
            let sq = if mv.kind == MoveKind::EnPassant { Self::ep_victim(mv.to, us) } else { mv.to };
            self.squares[sq.index()] = Some(victim);
        }

        self.castle = undo.castle;
        self.ep = undo.ep;
        self.halfmove = undo.halfmove;
        self.fullmove = undo.fullmove;
        self.hash = undo.hash;
    }

    /// Resolve a UCI move string against the legal moves of this position.
    pub fn find_move(&mut self, uci: &str) -> Result<Move, MoveParseError> {
        let malformed = || MoveParseError::Malformed(uci.to_string());
        if !(4..=5).contains(&uci.len()) || !uci.is_ascii() { return Err(malformed()); }
        let from: Square = uci[0..2].parse().map_err(|_| malformed())?;
        let to: Square = uci[2..4].parse().map_err(|_| malformed())?;
        let promo = match uci.chars().nth(4) {
            Some(c) => Some(Piece::from_char(c).filter(|p| Piece::PROMOTIONS.contains(p)).ok_or_else(malformed)?),
            None => None,
        };
        let candidate = self
            .pseudo_legal_moves()
            .into_iter()
            .find(|m| m.from == from && m.to == to && m.promotion == promo);
        match candidate {
            Some(mv) if self.is_legal(mv) => Ok(mv),
            _ => Err(MoveParseError::Illegal(uci.to_string())),
        }
    }

    /// Apply a sequence of UCI moves, stopping at the first bad one.
    pub fn play_uci<S: AsRef<str>>(&mut self, moves: &[S]) -> Result<(), MoveParseError> {
        for m in moves {
            let mv = self.find_move(m.as_ref())?;
            self.make(mv);
        }
        Ok(())
    }

    /// A pseudo-legal move that does not leave the mover in check.
    pub fn is_legal(&mut self, mv: Move) -> bool {
        self.with_move(mv, |p| !p.mover_in_check())
    }

    pub fn legal_moves(&mut self) -> Vec<Move> {
        let moves = self.pseudo_legal_moves();
        moves.into_iter().filter(|&m| self.is_legal(m)).collect()
    }
}

impl PerftBoard for Position {
    type Move = Move;

    fn pseudo_legal_moves(&self) -> Vec<Move> { Position::pseudo_legal_moves(self) }
    fn make(&mut self, mv: Move) { Position::make(self, mv) }
    fn unmake(&mut self, mv: Move) { Position::unmake(self, mv) }
    fn in_check(&self) -> bool { Position::in_check(self) }
    fn mover_in_check(&self) -> bool { Position::mover_in_check(self) }
    fn hash(&self) -> u64 { self.hash }
    fn recompute_hash(&self) -> u64 { zobrist::compute(self) }
}

impl FromStr for Position {
    type Err = FenError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::from_fen(s) }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  +-----------------+")?;
        for rank in (0..8u8).rev() {
            write!(f, "{} |", rank + 1)?;
            for file in 0..8u8 {
                let pc = Square::new(file, rank).and_then(|s| self.piece_at(s));
                write!(f, " {}", pc.map_or('.', char::from))?;
            }
            writeln!(f, " |")?;
        }
        writeln!(f, "  +-----------------+")?;
        writeln!(f, "    a b c d e f g h")?;
        let ep = self.ep.map_or_else(|| "-".to_string(), |s| s.to_string());
        write!(
            f,
            "side: {}  castling: {}  ep: {}  hash: {:016x}",
            char::from(self.turn),
            self.castle,
            ep,
            self.hash
        )
    }
}
