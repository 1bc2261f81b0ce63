use clap::Parser;
use matchline::search::Sparring;
use matchline::uci::SparringEngine;

#[derive(Parser, Debug)]
#[command(name = "sparring", about = "Bundled UCI sparring engine for matchline")]
struct Args {
    /// Seed for move-choice noise (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; logs go to stderr
    env_logger::init();
    let args = Args::parse();
    let searcher = args.seed.map_or_else(Sparring::default, Sparring::seeded);
    let mut engine = SparringEngine::new(searcher);
    engine.run_loop()?;
    Ok(())
}
