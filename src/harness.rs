//! Run harness: loads positions, runs perft at increasing depths, times and formats results.

use std::time::Instant;

use log::info;
use serde::Serialize;

use crate::board::cozy::ReferenceBoard;
use crate::board::{FenError, Move, MoveParseError, Position};
use crate::perft::{divide, perft, perft_parallel, DepthResult};

/// Canonical perft positions (see chessprogramming.org "Perft Results").
pub const STANDARD_SUITE: [(&str, &str); 6] = [
    ("startpos", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"),
    ("kiwipete", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -"),
    ("position3", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -"),
    ("position4", "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq -"),
    ("position5", "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8"),
    ("position6", "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10"),
];

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("bad position: {0}")]
    Fen(#[from] FenError),
    #[error("bad move: {0}")]
    Move(#[from] MoveParseError),
    #[error("reference board: {0}")]
    Reference(String),
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("node count mismatch at depth {depth}: ours {ours}, reference {reference}")]
    CrossCheck { depth: u32, ours: u64, reference: u64 },
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Depths 1..=max_depth are run.
    pub max_depth: u32,
    /// Root-split worker threads; 1 runs the sequential engine.
    pub threads: usize,
    /// Compare node counts with the cozy-chess reference.
    pub cross_check: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self { Self { max_depth: 5, threads: 1, cross_check: false } }
}

#[derive(Debug, Clone, Serialize)]
pub struct DepthReport {
    pub depth: u32,
    pub result: DepthResult,
    pub elapsed_secs: f64,
    /// Microseconds per thousand nodes.
    pub us_per_knode: f64,
    pub nps: f64,
}

impl DepthReport {
    pub fn new(depth: u32, result: DepthResult, elapsed_secs: f64) -> Self {
        let nodes = result.nodes.max(1) as f64;
        let nps = if elapsed_secs > 0.0 { result.nodes as f64 / elapsed_secs } else { f64::INFINITY };
        Self { depth, result, elapsed_secs, us_per_knode: elapsed_secs * 1e9 / nodes, nps }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionReport {
    pub name: String,
    pub fen: String,
    pub depths: Vec<DepthReport>,
}

/// Run one depth, sequentially or root-split on a dedicated pool.
pub fn run_depth(pos: &mut Position, depth: u32, threads: usize) -> Result<DepthResult, HarnessError> {
    if threads <= 1 { return Ok(perft(pos, depth)); }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let snapshot: &Position = pos;
    Ok(pool.install(|| perft_parallel(snapshot, depth)))
}

/// Run depths 1..=max_depth on an already loaded position.
///
/// `on_depth` is called after each depth completes.
pub fn run_loaded(
    name: &str,
    pos: &mut Position,
    config: &HarnessConfig,
    mut on_depth: impl FnMut(&DepthReport),
) -> Result<PositionReport, HarnessError> {
    let fen = pos.to_fen();
    info!("running {name} ({fen}) to depth {}", config.max_depth);
    let reference = if config.cross_check { Some(ReferenceBoard::from_position(pos).map_err(HarnessError::Reference)?) } else { None };

    let mut depths = Vec::with_capacity(config.max_depth as usize);
    for depth in 1..=config.max_depth {
        let t0 = Instant::now();
        let result = run_depth(pos, depth, config.threads)?;
        let report = DepthReport::new(depth, result, t0.elapsed().as_secs_f64());
        info!("{name} depth {depth}: {} nodes in {:.3}s", result.nodes, report.elapsed_secs);
        if let Some(r) = &reference {
            let expected = r.perft(depth);
            if expected != result.nodes {
                return Err(HarnessError::CrossCheck { depth, ours: result.nodes, reference: expected });
            }
        }
        on_depth(&report);
        depths.push(report);
    }
    Ok(PositionReport { name: name.to_string(), fen, depths })
}

#[derive(Debug, Clone)]
pub struct DivideReport {
    pub depth: u32,
    pub rows: Vec<(Move, DepthResult)>,
    pub total: DepthResult,
    pub elapsed_secs: f64,
}

/// Per-root-move breakdown at exactly `config.max_depth`.
///
/// Divide always walks the root moves in order on one thread; asking for more is an error.
pub fn run_divide(pos: &mut Position, config: &HarnessConfig) -> Result<DivideReport, HarnessError> {
    let depth = config.max_depth;
    if depth == 0 { return Err(HarnessError::Unsupported("divide needs depth >= 1")); }
    if config.threads > 1 { return Err(HarnessError::Unsupported("divide runs on a single thread")); }
    let reference = if config.cross_check { Some(ReferenceBoard::from_position(pos).map_err(HarnessError::Reference)?) } else { None };

    let t0 = Instant::now();
    let rows = divide(pos, depth);
    let elapsed_secs = t0.elapsed().as_secs_f64();
    let total: DepthResult = rows.iter().map(|(_, r)| *r).sum();
    info!("divide depth {depth}: {} root moves, {} nodes", rows.len(), total.nodes);
    if let Some(r) = &reference {
        let expected = r.perft(depth);
        if expected != total.nodes {
            return Err(HarnessError::CrossCheck { depth, ours: total.nodes, reference: expected });
        }
    }
    Ok(DivideReport { depth, rows, total, elapsed_secs })
}

/// Load `fen` (fatal if malformed) and run it.
pub fn run_position(name: &str, fen: &str, config: &HarnessConfig) -> Result<PositionReport, HarnessError> {
    let mut pos = Position::from_fen(fen)?;
    run_loaded(name, &mut pos, config, |_| {})
}

pub fn banner() -> String {
    let rule = "=".repeat(65);
    format!("{rule}\n||{:^61}||\n{rule}", "Starting perft")
}

pub fn position_header(index: usize, name: &str) -> String {
    let title = format!("Position {index} ({name})");
    let rule = "-".repeat(title.len() + 6);
    format!("+{rule}+\n|   {title}   |\n+{rule}+")
}

pub fn table_header() -> String {
    format!(
        "         {:>10} {:>10} {:>8} {:>10} {:>8} {:>8} {:>8} {:>7}",
        "Nodes", "Captures", "EP", "Castles", "Promos", "Checks", "Mates", "Zobrist"
    )
}

pub fn format_row(r: &DepthReport) -> String {
    let d = &r.result;
    format!(
        "perft({})={:>10} {:>10} {:>8} {:>10} {:>8} {:>8} {:>8} {:>7} ({:.2}s | {:.0}us/kn)",
        r.depth, d.nodes, d.captures, d.en_passant, d.castles, d.promotions, d.checks, d.checkmates, d.hash_mismatches,
        r.elapsed_secs, r.us_per_knode
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_positions_load() {
        for (name, fen) in STANDARD_SUITE {
            assert!(Position::from_fen(fen).is_ok(), "{name} failed to load");
        }
    }

    #[test]
    fn run_position_reports_each_depth() {
        let cfg = HarnessConfig { max_depth: 3, threads: 1, cross_check: true };
        let rep = run_position("startpos", STANDARD_SUITE[0].1, &cfg).unwrap();
        let nodes: Vec<u64> = rep.depths.iter().map(|d| d.result.nodes).collect();
        assert_eq!(nodes, vec![20, 400, 8902]);
        assert_eq!(rep.fen, "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    }

    #[test]
    fn malformed_fen_fails_before_traversal() {
        let err = run_position("bad", "not a fen", &HarnessConfig::default()).unwrap_err();
        assert!(matches!(err, HarnessError::Fen(FenError::MissingFields(3))));
    }

    #[test]
    fn threaded_depth_matches_sequential() {
        let mut pos = Position::from_fen(STANDARD_SUITE[3].1).unwrap();
        let seq = run_depth(&mut pos, 3, 1).unwrap();
        let par = run_depth(&mut pos, 3, 3).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn divide_honours_cross_check_and_rejects_threads() {
        let mut pos = Position::from_fen(STANDARD_SUITE[1].1).unwrap();
        let cfg = HarnessConfig { max_depth: 2, threads: 1, cross_check: true };
        let rep = run_divide(&mut pos, &cfg).unwrap();
        assert_eq!((rep.rows.len(), rep.total.nodes), (48, 2039));

        let threaded = HarnessConfig { threads: 4, ..cfg };
        assert!(matches!(run_divide(&mut pos, &threaded), Err(HarnessError::Unsupported(_))));
        let shallow = HarnessConfig { max_depth: 0, ..cfg };
        assert!(matches!(run_divide(&mut pos, &shallow), Err(HarnessError::Unsupported(_))));
    }

    #[test]
    fn row_formatting() {
        let rep = DepthReport::new(1, DepthResult { nodes: 20, ..DepthResult::default() }, 0.5);
        let row = format_row(&rep);
        assert!(row.starts_with("perft(1)=        20"));
        assert!(row.contains("0.50s"));
        assert!(table_header().contains("Zobrist"));
        assert!(position_header(1, "startpos").contains("Position 1 (startpos)"));
    }
}
