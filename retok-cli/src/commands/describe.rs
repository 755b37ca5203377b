//! Describe command implementation

use crate::bridge::CommandAdapter;
use anyhow::Result;
use clap::Args;
use retok_engine::WindowGeometry;

/// Arguments for the describe command
#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Program serving the model
    #[arg(long, value_name = "CMD", env = "RETOK_MODEL_COMMAND")]
    pub model_command: String,

    /// Argument passed to the model program (repeatable)
    #[arg(long = "model-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub model_args: Vec<String>,
}

impl DescribeArgs {
    /// Execute the describe command
    pub fn execute(&self) -> Result<()> {
        let adapter = CommandAdapter::connect(&self.model_command, &self.model_args)?;
        let description = adapter.description();
        let geometry = WindowGeometry::from_max_length(description.max_length)?;

        println!("task: {:?}", description.task);
        println!("max_length: {}", geometry.max_length());
        println!("window_size: {}", geometry.window_size());
        println!("context_size: {}", geometry.context_size());
        match &description.vocabulary {
            Some(tokens) => println!("vocabulary: {} tokens", tokens.len()),
            None => println!("vocabulary: none"),
        }

        Ok(())
    }
}
