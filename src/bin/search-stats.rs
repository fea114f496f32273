use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hopkins::engine::SearchConfig;
use hopkins::{Board, Hopkins, START_BOARD_FEN};

/// Searches a position to each of the given depths and prints the selected
/// move together with the search counters.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Position to search, in FEN
    #[arg(long, default_value = START_BOARD_FEN)]
    fen: String,

    /// Depths to search, one search each
    #[arg(short, long, value_delimiter = ',', default_values_t = [1, 2, 3, 4])]
    depths: Vec<u32>,

    /// Score depth 0 statically instead of resolving captures
    #[arg(long)]
    no_quiescence: bool,

    /// Quiescence plies in which quiet checks are searched
    #[arg(long, default_value_t = 0)]
    quiescence_checks: u32,

    /// Search moves in generated order
    #[arg(long)]
    no_move_ordering: bool,
}

fn main() -> hopkins::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let board = Board::from_fen(&args.fen)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("parsing {:?}", args.fen))?;

    let config = SearchConfig::default()
        .with_quiescence(!args.no_quiescence)
        .with_quiescence_checks(args.quiescence_checks)
        .with_move_ordering(!args.no_move_ordering);

    for &depth in &args.depths {
        search_stats(&board, config, depth)?;
    }

    Ok(())
}

fn search_stats(board: &Board, config: SearchConfig, depth: u32) -> hopkins::Result<()> {
    let mut engine = Hopkins::with_config(board.clone(), config.with_depth(depth));

    let start = Instant::now();
    let (mve, score) = engine.search_to_depth(depth)?;
    let elapsed = start.elapsed();

    let stats = engine.stats().context("search did not hand back its counters")?;
    let mve = mve.map_or_else(|| "none".to_string(), |mve| mve.to_string());

    println!(
        "Stats after searching to depth {depth}:\nmove: {mve} ({score})\ntime: {elapsed:?}\n{stats:#?}"
    );
    Ok(())
}
