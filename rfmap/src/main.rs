mod coverage_map;
mod los_map;
mod options;
mod p2p;
mod setup;

use anyhow::Result;
use clap::Parser;
use options::{Cli, Command};
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::init();
    match &cli.cmd {
        Command::P2p(p2p) => p2p.run(&cli.global),
        Command::Los(los) => los.run(&cli.global),
        Command::Coverage(coverage) => coverage.run(&cli.global),
    }
}
