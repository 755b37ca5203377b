//! Configuration module

use crate::error::CliError;
use anyhow::{Context, Result};
use retok_engine::{config::defaults, ClassificationOptions, ThresholdCalibration};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CLI configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct CliConfig {
    /// Batching configuration
    #[serde(default)]
    pub repair: RepairSection,

    /// Calibration passed to classification models
    #[serde(default)]
    pub classification: ClassificationSection,

    /// External model command
    #[serde(default)]
    pub model: ModelSection,
}

/// Batching configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepairSection {
    /// Sequences per model call
    pub batch_size: usize,

    /// Sort windows by length before batching
    pub sort_by_length: bool,
}

impl Default for RepairSection {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            sort_by_length: true,
        }
    }
}

/// Classification calibration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassificationSection {
    /// Softmax temperature for sequences that contain spaces
    pub temperature: f32,

    /// Softmax temperature for sequences without any space
    pub temperature_no_spaces: f32,

    /// Decision thresholds for sequences that contain spaces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdCalibration>,

    /// Decision thresholds for sequences without any space
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds_no_spaces: Option<ThresholdCalibration>,
}

impl Default for ClassificationSection {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            temperature_no_spaces: 1.0,
            thresholds: None,
            thresholds_no_spaces: None,
        }
    }
}

impl ClassificationSection {
    /// Options sent to classification models
    pub fn options(&self) -> ClassificationOptions {
        ClassificationOptions {
            temperature: self.temperature,
            temperature_no_spaces: self.temperature_no_spaces,
            thresholds: self.thresholds.clone(),
            thresholds_no_spaces: self.thresholds_no_spaces.clone(),
        }
    }
}

/// External model command
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ModelSection {
    /// Program serving the model (None = whitespace normalisation only)
    pub command: Option<String>,

    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl CliConfig {
    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| CliError::ConfigError(e.to_string()))
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}
