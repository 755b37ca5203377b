//! CLI command implementations

use clap::Subcommand;

pub mod describe;
pub mod repair;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Repair the tokenization of line-oriented text files
    Repair(repair::RepairArgs),

    /// Print what the model command reports about itself
    Describe(describe::DescribeArgs),
}

impl Commands {
    /// Execute the selected command
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Repair(args) => args.execute(),
            Commands::Describe(args) => args.execute(),
        }
    }
}
