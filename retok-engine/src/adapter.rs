//! Contract with the sequence model
//!
//! The model is opaque: the engine hands it a batch of substrings together
//! with task options and expects one [`InferenceOutput`] per substring, in
//! order.

use crate::{
    error::AdapterError,
    inference::{ClassificationResult, InferenceOutput, InferenceResult},
    vocab::CharVocabulary,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What kind of results a model produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Task {
    /// One repair label per character
    Classification,
    /// A generated character sequence
    Generation,
}

/// Calibrated per-class decision thresholds
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdCalibration {
    /// Minimum probability per class
    pub thresholds: Vec<f32>,
    /// Class chosen when no threshold is met
    pub default_class: u32,
}

/// Calibration for classification models
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassificationOptions {
    /// Softmax temperature for sequences that contain spaces
    pub temperature: f32,
    /// Softmax temperature for sequences without any space
    pub temperature_no_spaces: f32,
    /// Thresholds for sequences that contain spaces
    pub thresholds: Option<ThresholdCalibration>,
    /// Thresholds for sequences without any space
    pub thresholds_no_spaces: Option<ThresholdCalibration>,
}

impl Default for ClassificationOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            temperature_no_spaces: 1.0,
            thresholds: None,
            thresholds_no_spaces: None,
        }
    }
}

/// Decoding strategy of generation models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum SearchStrategy {
    /// Pick the best token at every step
    #[default]
    Greedy,
    /// Beam search; the adapter returns ranked candidates
    Beam {
        /// Number of beams
        width: usize,
    },
}

/// Options for generation models
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerationOptions {
    /// Decoding strategy
    pub search: SearchStrategy,
}

/// Task specific keyword configuration passed with every batch
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "task", rename_all = "snake_case"))]
pub enum TaskOptions {
    /// Options for classification models
    Classification(ClassificationOptions),
    /// Options for generation models
    Generation(GenerationOptions),
}

impl TaskOptions {
    /// Default options for a task
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Classification => TaskOptions::Classification(ClassificationOptions::default()),
            Task::Generation => TaskOptions::Generation(GenerationOptions::default()),
        }
    }

    /// The task these options belong to
    pub fn task(&self) -> Task {
        match self {
            TaskOptions::Classification(_) => Task::Classification,
            TaskOptions::Generation(_) => Task::Generation,
        }
    }
}

/// One batch of substrings to run through the model
#[derive(Debug, Clone)]
pub struct InferenceRequest<'a> {
    sequences: Vec<&'a str>,
    options: &'a TaskOptions,
}

impl<'a> InferenceRequest<'a> {
    /// Create a request
    pub fn new(sequences: Vec<&'a str>, options: &'a TaskOptions) -> Self {
        Self { sequences, options }
    }

    /// The substrings, in batch order
    pub fn sequences(&self) -> &[&'a str] {
        &self.sequences
    }

    /// Task options
    pub fn options(&self) -> &TaskOptions {
        self.options
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// True if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Per sequence: true if it contains no space at all
    pub fn no_spaces(&self) -> Vec<bool> {
        self.sequences.iter().map(|s| !s.contains(' ')).collect()
    }

    /// Per sequence: the characters a constrained decoder may copy
    pub fn stripped(&self) -> Vec<String> {
        self.sequences
            .iter()
            .map(|s| crate::clean::remove_spaces(s))
            .collect()
    }
}

/// A sequence model behind an order-preserving batch interface
pub trait InferenceAdapter {
    /// The kind of results this model produces
    fn task(&self) -> Task;

    /// Character vocabulary; required for generation models
    fn vocabulary(&self) -> Option<&CharVocabulary> {
        None
    }

    /// Run the model on a batch, returning one output per sequence
    fn infer(&self, request: &InferenceRequest<'_>) -> Result<Vec<InferenceOutput>, AdapterError>;
}

impl<A: InferenceAdapter + ?Sized> InferenceAdapter for Box<A> {
    fn task(&self) -> Task {
        (**self).task()
    }

    fn vocabulary(&self) -> Option<&CharVocabulary> {
        (**self).vocabulary()
    }

    fn infer(&self, request: &InferenceRequest<'_>) -> Result<Vec<InferenceOutput>, AdapterError> {
        (**self).infer(request)
    }
}

/// Classification adapter that labels every character "keep".
///
/// Repairing with it only normalises whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughAdapter;

impl InferenceAdapter for PassthroughAdapter {
    fn task(&self) -> Task {
        Task::Classification
    }

    fn infer(&self, request: &InferenceRequest<'_>) -> Result<Vec<InferenceOutput>, AdapterError> {
        request
            .sequences()
            .iter()
            .map(|sequence| -> Result<InferenceOutput, AdapterError> {
                let positions = sequence.chars().count() + 2;
                let result = ClassificationResult::new(
                    vec![0; positions],
                    vec![vec![1.0, 0.0, 0.0]; positions],
                )?;
                Ok(InferenceOutput::Single(InferenceResult::Classification(
                    result,
                )))
            })
            .collect()
    }
}
