use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use perftcheck::board::{Position, START_POSITION};
use perftcheck::harness::{self, HarnessConfig, PositionReport, STANDARD_SUITE};

#[derive(clap::Parser, Debug)]
#[command(name = "perft", version, about = "Perft driver with leaf statistics and hash checks")]
struct Args {
    /// Maximum depth; depths 1..=DEPTH are run
    #[arg(value_name = "DEPTH", default_value_t = 5)]
    depth: u32,
    /// FEN string or "startpos"; omit to run the standard six-position suite
    #[arg(value_name = "FEN")]
    fen: Option<String>,
    /// UCI moves applied to the position before counting
    #[arg(long, num_args = 1..)]
    moves: Vec<String>,
    /// Number of threads for root-split
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Print the per-root-move breakdown at DEPTH (single-threaded)
    #[arg(long, default_value_t = false)]
    divide: bool,
    /// Compare node counts against cozy-chess
    #[arg(long, default_value_t = false)]
    cross_check: bool,
    /// Emit JSON instead of tables
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    no_progress: bool,
}

fn load(fen: &str, moves: &[String]) -> Result<Position> {
    let fen = if fen == "startpos" { START_POSITION } else { fen };
    let mut pos = Position::from_fen(fen).with_context(|| format!("invalid FEN '{fen}'"))?;
    pos.play_uci(moves).context("applying --moves")?;
    Ok(pos)
}

fn run_divide(mut pos: Position, config: &HarnessConfig, json: bool) -> Result<()> {
    let rep = harness::run_divide(&mut pos, config)?;
    if json {
        let moves: Vec<serde_json::Value> = rep
            .rows
            .iter()
            .map(|(mv, r)| serde_json::json!({ "move": mv.to_uci(), "result": r }))
            .collect();
        let payload = serde_json::json!({ "fen": pos.to_fen(), "depth": rep.depth, "moves": moves, "total": rep.total });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for (mv, r) in &rep.rows { println!("{mv}: {}", r.nodes); }
        println!();
        println!("moves: {}  nodes: {}  elapsed: {:.3}s", rep.rows.len(), rep.total.nodes, rep.elapsed_secs);
    }
    if rep.total.hash_mismatches > 0 {
        bail!("{} leaf positions had inconsistent incremental hashes", rep.total.hash_mismatches);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = HarnessConfig { max_depth: args.depth, threads: args.threads.max(1), cross_check: args.cross_check };

    let positions: Vec<(String, String)> = match &args.fen {
        Some(f) => vec![(if f == "startpos" { "startpos".to_string() } else { "custom".to_string() }, f.clone())],
        None => {
            if !args.moves.is_empty() { bail!("--moves needs a FEN or 'startpos'"); }
            STANDARD_SUITE.iter().map(|(n, f)| (n.to_string(), f.to_string())).collect()
        }
    };

    if args.divide {
        let Some(fen) = &args.fen else { bail!("--divide needs a FEN or 'startpos'") };
        return run_divide(load(fen, &args.moves)?, &config, args.json);
    }

    // malformed notation is fatal before anything runs
    let mut loaded = Vec::with_capacity(positions.len());
    for (name, fen) in &positions { loaded.push((name.clone(), load(fen, &args.moves)?)); }

    if !args.json { println!("{}", harness::banner()); }
    let mut reports: Vec<PositionReport> = Vec::with_capacity(loaded.len());
    for (i, (name, mut pos)) in loaded.into_iter().enumerate() {
        if !args.json {
            println!("\n\n{}", harness::position_header(i + 1, &name));
            println!("{pos}");
            println!("{}", harness::table_header());
        }
        let pb = if args.json || args.no_progress {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(u64::from(config.max_depth));
            pb.set_style(ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")?);
            pb
        };
        pb.set_message(format!("{name} depth 1"));
        let json = args.json;
        let report = harness::run_loaded(&name, &mut pos, &config, |r| {
            if !json { pb.suspend(|| println!("{}", harness::format_row(r))); }
            pb.set_message(format!("{name} depth {}", r.depth + 1));
            pb.inc(1);
        })?;
        pb.finish_and_clear();
        reports.push(report);
    }

    if args.json { println!("{}", serde_json::to_string_pretty(&reports)?); }

    let mismatches: u64 = reports.iter().flat_map(|r| r.depths.iter()).map(|d| d.result.hash_mismatches).sum();
    if mismatches > 0 { bail!("{mismatches} leaf positions had inconsistent incremental hashes"); }
    Ok(())
}
