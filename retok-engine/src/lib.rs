//! Sliding-window inference and merge engine for tokenization repair
//!
//! Inputs longer than a model's context are split into windows whose cores
//! tile the input, sent to an [`InferenceAdapter`] in length-sorted batches,
//! and merged back into one result per input before rendering.

#![warn(missing_docs)]

pub mod adapter;
pub mod alignment;
pub mod assembler;
pub mod clean;
pub mod config;
pub mod error;
pub mod inference;
pub mod input;
pub mod processor;
pub mod progress;
pub mod render;
pub mod scheduler;
pub mod vocab;
pub mod window;

// Re-export key types
pub use adapter::{
    ClassificationOptions, GenerationOptions, InferenceAdapter, InferenceRequest,
    PassthroughAdapter, SearchStrategy, Task, TaskOptions, ThresholdCalibration,
};
pub use assembler::ResultMerger;
pub use clean::{clean_sequence, remove_spaces};
pub use config::{RepairConfig, RepairConfigBuilder};
pub use error::{
    AdapterError, AlignmentError, ConfigError, MergeError, RenderError, RepairError, Result,
    ResultError, VocabularyError,
};
pub use inference::{ClassificationResult, GenerationResult, InferenceOutput, InferenceResult};
pub use input::{RepairInput, RepairOutput};
pub use processor::{RepairIter, TokenizationRepairer, TokenizationRepairerBuilder};
pub use progress::ProgressObserver;
pub use render::{render, repair_whitespace, whitespace_operations, RepairLabel};
pub use scheduler::{BatchEntry, BatchScheduler, Schedule};
pub use vocab::CharVocabulary;
pub use window::{Window, WindowGeometry, WindowPlan};
