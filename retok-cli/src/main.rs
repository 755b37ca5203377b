//! retok command-line entry point

use clap::Parser;
use retok_cli::commands::Commands;

/// Repair the tokenization of text with a sequence model
#[derive(Debug, Parser)]
#[command(name = "retok", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<()> {
    Cli::parse().command.execute()
}
