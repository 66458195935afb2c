use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rookery::{divide, BoardState, EngineConfig, SearchEngine, SearchLimits, TimeGovernor, STARTPOS};
use std::path::PathBuf;
use std::time::Instant;

const BENCH_POSITIONS: &[&str] = &[
    STARTPOS,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
];

#[derive(Debug, Parser)]
#[command(version, about = "A UCI chess engine")]
struct Cli {
    /// JSON file with engine settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transposition table size in MB, overrides the config file
    #[arg(long)]
    hash: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Speak UCI on stdin/stdout (the default)
    Uci,

    /// Count leaf nodes per root move
    Perft {
        depth: u32,

        #[arg(long, default_value = STARTPOS)]
        fen: String,
    },

    /// Search a fixed set of positions and report the node count
    Bench {
        #[arg(default_value_t = 6)]
        depth: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(hash) = cli.hash {
        config.hash_mb = hash;
    }

    env_logger::Builder::new()
        .filter_level(config.level_filter())
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command.unwrap_or(Command::Uci) {
        Command::Uci => rookery::uci::UciEngine::new(config).run(),
        Command::Perft { depth, fen } => run_perft(&fen, depth)?,
        Command::Bench { depth } => run_bench(&config, depth)?,
    }

    Ok(())
}

fn run_perft(fen: &str, depth: u32) -> Result<()> {
    let board = BoardState::from_fen(fen)?;
    let start = Instant::now();

    let mut total = 0;
    for (mv, nodes) in divide(&board, depth) {
        println!("{}: {}", mv, nodes);
        total += nodes;
    }

    let elapsed = start.elapsed();
    println!();
    println!("Nodes searched: {}", total);
    info!("perft {} took {:?} ({:.0} nps)", depth, elapsed, total as f64 / elapsed.as_secs_f64().max(1e-9));
    Ok(())
}

fn run_bench(config: &EngineConfig, depth: i32) -> Result<()> {
    let mut engine = SearchEngine::new(config.hash_mb);
    let governor = TimeGovernor::unlimited();
    let start = Instant::now();
    let mut total = 0;

    for fen in BENCH_POSITIONS {
        let mut board = BoardState::from_fen(fen)?;
        engine.new_game();
        let result = engine.search(&mut board, &[], SearchLimits::depth(depth), &governor, |_| {});
        info!(
            "{}: bestmove {} score {} nodes {}",
            fen,
            result.best_move.map_or_else(|| "0000".to_string(), |m| m.to_uci()),
            result.score,
            result.nodes
        );
        total += result.nodes;
    }

    let elapsed = start.elapsed();
    let nps = (total as f64 / elapsed.as_secs_f64().max(1e-9)) as u64;
    println!("{} nodes {} nps", total, nps);
    Ok(())
}
