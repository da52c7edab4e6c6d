//! Minimal perft diagnostic: counts (or divides) leaf nodes from a FEN to a
//! given depth. Replaces the old UCI console loop as the crate's reference
//! move-generation check, per the search core's external interfaces.

use talon::board::Board;
use talon::logger;
use talon::moves::magic::loader::load_magic_tables;
use talon::moves::perft::{perft, perft_divide};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

fn usage() -> ExitCode {
    eprintln!("usage: talon-perft <depth> [fen] [--divide]");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    logger::init_logging("logs/perft.log", "perft=info");

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return usage();
    }

    let depth: u32 = match args[1].parse() {
        Ok(d) => d,
        Err(_) => return usage(),
    };

    let divide = args.iter().any(|a| a == "--divide");
    let fen = args
        .iter()
        .skip(2)
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string());

    let mut board = match Board::from_str(&fen) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("invalid FEN {fen:?}: {e}");
            return usage();
        }
    };

    let tables = load_magic_tables();
    let start = Instant::now();
    let nodes = if divide {
        perft_divide(&mut board, &tables, depth)
    } else {
        perft(&mut board, &tables, depth)
    };
    let elapsed = start.elapsed();

    let nps = if elapsed.as_secs_f64() > 0.0 {
        (nodes as f64 / elapsed.as_secs_f64()) as u64
    } else {
        0
    };
    println!(
        "depth {depth}: {nodes} nodes in {:.3}s ({nps} nps)",
        elapsed.as_secs_f64()
    );

    ExitCode::SUCCESS
}
