use clap::Parser;
use tradeledger::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
