//! Configuration for the repairer

use crate::{
    adapter::{Task, TaskOptions},
    error::ConfigError,
    window::{WindowGeometry, MARKER_SLOTS},
};

/// Default configuration constants
pub mod defaults {
    /// Sequences per model call
    pub const BATCH_SIZE: usize = 16;

    /// Characters per model sequence, markers excluded
    pub const DEFAULT_MAX_LENGTH: usize = 512;
}

/// Repair configuration; immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct RepairConfig {
    /// Sequences per model call
    pub batch_size: usize,
    /// Sort windows by length before batching
    pub sort_by_length: bool,
    /// Notify the progress observer
    pub show_progress: bool,
    /// Window geometry
    pub geometry: WindowGeometry,
    /// Options passed with every batch (None = defaults for the adapter's task)
    pub task_options: Option<TaskOptions>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            sort_by_length: true,
            show_progress: false,
            geometry: WindowGeometry::from_max_length(defaults::DEFAULT_MAX_LENGTH)
                .unwrap_or_else(|_| unreachable!()),
            task_options: None,
        }
    }
}

impl RepairConfig {
    /// Create a configuration builder
    pub fn builder() -> RepairConfigBuilder {
        RepairConfigBuilder::default()
    }

    /// Validate the configuration on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }

    /// Validate against the adapter that will serve the model
    pub(crate) fn validate_for(&self, task: Task, has_vocabulary: bool) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(options) = &self.task_options {
            if options.task() != task {
                return Err(ConfigError::TaskMismatch {
                    adapter: task,
                    options: options.task(),
                });
            }
        }

        if task == Task::Generation && !has_vocabulary {
            return Err(ConfigError::MissingVocabulary);
        }

        Ok(())
    }

    /// Options for `task`, falling back to its defaults
    pub(crate) fn options_for(&self, task: Task) -> TaskOptions {
        self.task_options
            .clone()
            .unwrap_or_else(|| TaskOptions::for_task(task))
    }
}

/// Fluent builder for [`RepairConfig`]
#[derive(Debug, Default)]
pub struct RepairConfigBuilder {
    batch_size: Option<usize>,
    sort_by_length: Option<bool>,
    show_progress: Option<bool>,
    max_length: Option<usize>,
    model_capacity: Option<usize>,
    window_size: Option<usize>,
    task_options: Option<TaskOptions>,
}

impl RepairConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of sequences per model call
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Sort windows by length before batching
    pub fn sort_by_length(mut self, sort: bool) -> Self {
        self.sort_by_length = Some(sort);
        self
    }

    /// Enable progress notifications
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = Some(show);
        self
    }

    /// Set the characters per model sequence, markers excluded
    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self.model_capacity = None;
        self
    }

    /// Set the model capacity including the begin/end markers
    pub fn model_capacity(mut self, capacity: usize) -> Self {
        self.model_capacity = Some(capacity);
        self.max_length = None;
        self
    }

    /// Override the window core size (default: three quarters of max length)
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = Some(size);
        self
    }

    /// Set the task options passed with every batch
    pub fn task_options(mut self, options: TaskOptions) -> Self {
        self.task_options = Some(options);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RepairConfig, ConfigError> {
        let mut config = RepairConfig::default();

        let max_length = match (self.model_capacity, self.max_length) {
            (Some(capacity), _) => {
                if capacity <= MARKER_SLOTS {
                    return Err(ConfigError::CapacityTooSmall { capacity });
                }
                Some(capacity - MARKER_SLOTS)
            }
            (None, length) => length,
        };

        config.geometry = match (max_length, self.window_size) {
            (Some(max_length), Some(window_size)) => WindowGeometry::new(max_length, window_size)?,
            (Some(max_length), None) => WindowGeometry::from_max_length(max_length)?,
            (None, Some(window_size)) => {
                WindowGeometry::new(defaults::DEFAULT_MAX_LENGTH, window_size)?
            }
            (None, None) => config.geometry,
        };

        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(sort) = self.sort_by_length {
            config.sort_by_length = sort;
        }
        if let Some(show) = self.show_progress {
            config.show_progress = show;
        }
        config.task_options = self.task_options;

        config.validate()?;
        Ok(config)
    }
}
