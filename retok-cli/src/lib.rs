//! retok CLI library
//!
//! Command-line interface for repairing the tokenization of text files with
//! an external sequence model.

pub mod bridge;
pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod progress;

pub use error::{CliError, CliResult};
