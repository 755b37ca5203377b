//! Repair command implementation

use crate::{
    bridge::CommandAdapter,
    config::CliConfig,
    error::CliError,
    input::{resolve_patterns, FileReader},
    output::{OutputFormatter, TextFormatter},
    progress::ProgressReporter,
};
use anyhow::{Context, Result};
use clap::Args;
use retok_engine::{InferenceAdapter, PassthroughAdapter, Task, TaskOptions, TokenizationRepairer};
use std::path::PathBuf;

/// Arguments for the repair command
#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Input files or patterns (supports glob)
    #[arg(short, long, value_name = "FILE/PATTERN", required = true)]
    pub input: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Program serving the model (default: whitespace normalisation only)
    #[arg(long, value_name = "CMD", env = "RETOK_MODEL_COMMAND")]
    pub model_command: Option<String>,

    /// Argument passed to the model program (repeatable)
    #[arg(long = "model-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub model_args: Vec<String>,

    /// Sequences per model call
    #[arg(short, long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Keep input order instead of sorting windows by length
    #[arg(long)]
    pub unsorted: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl RepairArgs {
    /// Execute the repair command
    pub fn execute(&self) -> Result<()> {
        self.init_logging()?;

        log::info!("Starting tokenization repair");
        log::debug!("Arguments: {:?}", self);

        let config = match &self.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::default(),
        };
        let files = resolve_patterns(&self.input)?;

        let command = self.model_command.clone().or(config.model.command.clone());
        let (adapter, max_length): (Box<dyn InferenceAdapter>, Option<usize>) = match command {
            Some(program) => {
                let args = if self.model_args.is_empty() {
                    config.model.args.clone()
                } else {
                    self.model_args.clone()
                };
                let adapter = CommandAdapter::connect(&program, &args)?;
                let max_length = adapter.description().max_length;
                (Box::new(adapter), Some(max_length))
            }
            None => {
                log::info!("No model command given, normalising whitespace only");
                (Box::new(PassthroughAdapter), None)
            }
        };

        let reporter = ProgressReporter::new(self.quiet);
        let repairer = self.build_repairer(adapter, max_length, &config, reporter.clone())?;

        let mut formatter = TextFormatter::open(self.output.as_deref())?;
        for file in &files {
            reporter.set_file(&file.display().to_string());
            let lines = FileReader::read_lines(file)?;
            if lines.is_empty() {
                continue;
            }

            let repaired = repairer
                .repair_batch(&lines)
                .with_context(|| format!("Failed to repair {}", file.display()))?;
            for line in &repaired {
                formatter.write_line(line)?;
            }
            log::info!("Repaired {} lines of {}", repaired.len(), file.display());
        }
        formatter.finish()?;
        reporter.close();

        Ok(())
    }

    fn build_repairer(
        &self,
        adapter: Box<dyn InferenceAdapter>,
        max_length: Option<usize>,
        config: &CliConfig,
        reporter: ProgressReporter,
    ) -> Result<TokenizationRepairer<Box<dyn InferenceAdapter>>> {
        let task = adapter.task();
        let mut builder = TokenizationRepairer::builder(adapter)
            .batch_size(self.batch_size.unwrap_or(config.repair.batch_size))
            .sort_by_length(config.repair.sort_by_length && !self.unsorted)
            .show_progress(!self.quiet)
            .progress(reporter);

        if let Some(max_length) = max_length {
            builder = builder.max_length(max_length);
        }
        if task == Task::Classification {
            builder =
                builder.task_options(TaskOptions::Classification(config.classification.options()));
        }

        builder
            .build()
            .map_err(|e| CliError::ConfigError(e.to_string()).into())
    }

    /// Initialize logging based on verbosity level
    fn init_logging(&self) -> Result<()> {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        if !self.quiet {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
                .try_init()?;
        }

        Ok(())
    }
}
