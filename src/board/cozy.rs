use cozy_chess::Board as CozyBoard;

use super::position::Position;

/// Independent legal-move generator used to cross-check node counts.
#[derive(Clone, Debug)]
pub struct ReferenceBoard {
    board: CozyBoard,
}

impl ReferenceBoard {
    pub fn startpos() -> Self {
        Self { board: CozyBoard::default() }
    }

    pub fn from_fen(fen: &str) -> Result<Self, String> {
        CozyBoard::from_fen(fen, false).map(|b| Self { board: b }).map_err(|e| format!("FEN error: {e:?}"))
    }

    /// Mirror a position (counters included) through its FEN.
    pub fn from_position(pos: &Position) -> Result<Self, String> { Self::from_fen(&pos.to_fen()) }

    pub fn legal_moves_count(&self) -> usize {
        let mut ct = 0usize;
        self.board.generate_moves(|moves| { ct += moves.len(); false });
        ct
    }

    /// Legal move paths of exactly `depth` plies.
    pub fn perft(&self, depth: u32) -> u64 { perft(&self.board, depth) }
}

fn perft(board: &CozyBoard, depth: u32) -> u64 {
    if depth == 0 { return 1; }
    let mut nodes = 0u64;
    board.generate_moves(|moves| {
        if depth == 1 {
            nodes += moves.len() as u64;
            return false;
        }
        for m in moves {
            let mut child = board.clone();
            child.play(m);
            nodes += perft(&child, depth - 1);
        }
        false
    });
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_startpos_counts() {
        let b = ReferenceBoard::startpos();
        assert_eq!(b.legal_moves_count(), 20);
        assert_eq!(b.perft(2), 400);
        assert_eq!(b.perft(3), 8902);
    }

    #[test]
    fn mirrors_loaded_position() {
        let pos = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -").unwrap();
        let b = ReferenceBoard::from_position(&pos).unwrap();
        assert_eq!(b.perft(2), 191);
    }
}
