use perftcheck::board::cozy::ReferenceBoard;
use perftcheck::harness::STANDARD_SUITE;
use perftcheck::{perft, Position};
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Every pseudo-legal move is undone exactly and keeps the hash consistent while applied.
fn assert_make_unmake_exact(pos: &mut Position) {
    let before = pos.clone();
    for mv in pos.pseudo_legal_moves() {
        pos.make(mv);
        assert_eq!(pos.hash(), pos.recompute_hash(), "hash drift after {mv} from {}", before.to_fen());
        pos.unmake(mv);
        assert!(*pos == before, "make/unmake of {mv} did not restore {}", before.to_fen());
    }
}

#[test]
fn random_walks_keep_state_consistent() {
    for (i, (name, fen)) in STANDARD_SUITE.iter().enumerate() {
        let mut rng = SmallRng::seed_from_u64(0x5EED + i as u64);
        let start = Position::from_fen(fen).unwrap();
        let mut pos = start.clone();
        let mut played = Vec::new();
        for _ in 0..150 {
            assert_make_unmake_exact(&mut pos);
            let legal = pos.legal_moves();
            let Some(&mv) = legal.choose(&mut rng) else { break };
            pos.make(mv);
            played.push(mv);
            assert!(!pos.mover_in_check(), "{name}: legal move {mv} left king attacked");
        }
        for mv in played.into_iter().rev() { pos.unmake(mv); }
        assert_eq!(pos.to_fen(), start.to_fen(), "{name}");
        assert!(pos == start, "{name}: unwinding the walk did not restore the start");
    }
}

#[test]
fn random_positions_agree_with_reference() {
    let mut rng = SmallRng::seed_from_u64(42);
    for (name, fen) in STANDARD_SUITE {
        let mut pos = Position::from_fen(fen).unwrap();
        for ply in 0..24 {
            let legal = pos.legal_moves();
            let Some(&mv) = legal.choose(&mut rng) else { break };
            pos.make(mv);
            if ply % 6 != 5 { continue; }
            let reference = ReferenceBoard::from_position(&pos).unwrap();
            assert_eq!(perft(&mut pos, 2).nodes, reference.perft(2), "{name} at {}", pos.to_fen());
        }
    }
}

#[test]
fn legal_move_count_matches_reference() {
    let mut pos = Position::from_fen(STANDARD_SUITE[1].1).unwrap();
    let reference = ReferenceBoard::from_position(&pos).unwrap();
    assert_eq!(pos.legal_moves().len(), reference.legal_moves_count());
}
