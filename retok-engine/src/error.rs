//! Layered error types
//!
//! Deterministic failures of the geometry, alignment and rendering stages each
//! get their own enum; [`RepairError`] is what callers of the repairer see.

use thiserror::Error;

/// Boxed error returned by inference adapters.
pub type AdapterError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid engine configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Window size outside `1..=max_length`
    #[error("window size {window_size} must be in 1..={max_length}")]
    InvalidWindowSize {
        /// Requested window size
        window_size: usize,
        /// Maximum characters per model call
        max_length: usize,
    },

    /// Model capacity too small to hold the begin/end markers plus one character
    #[error("model capacity {capacity} leaves no room for input characters")]
    CapacityTooSmall {
        /// Number of positions the model accepts
        capacity: usize,
    },

    /// Batch size of zero
    #[error("batch size must be greater than 0")]
    ZeroBatchSize,

    /// Task options do not fit the adapter's task
    #[error("adapter performs {adapter:?} but {options:?} options were configured")]
    TaskMismatch {
        /// Task reported by the adapter
        adapter: crate::adapter::Task,
        /// Task the options were written for
        options: crate::adapter::Task,
    },

    /// Generation adapters must expose their character vocabulary
    #[error("generation adapter does not provide a character vocabulary")]
    MissingVocabulary,
}

/// Inconsistent inference result data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    /// Classification labels and logit vectors differ in count
    #[error("{predictions} predictions but {logits} logit vectors")]
    LogitCount {
        /// Number of labels
        predictions: usize,
        /// Number of logit vectors
        logits: usize,
    },

    /// Generated tokens and log-probabilities differ in count
    #[error("{tokens} tokens but {log_probs} log-probabilities")]
    LogProbCount {
        /// Number of token ids
        tokens: usize,
        /// Number of log-probabilities
        log_probs: usize,
    },
}

/// Unusable character vocabulary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    /// More tokens than a `u32` id can address
    #[error("vocabulary too large")]
    TooLarge,

    /// A regular token spelled with more or less than one character
    #[error("token {0:?} is not a single character")]
    NotSingleCharacter(String),

    /// A required special token (or the space) is absent
    #[error("vocabulary has no {0} token")]
    MissingToken(&'static str),
}

/// Failure to line a decoded window up with the original text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    /// The decoded stream has fewer non-space characters than context plus core
    #[error("decoded stream ended after {found} characters, expected at least {expected}")]
    Truncated {
        /// Characters required (left context + core)
        expected: usize,
        /// Non-space characters present in the stream
        found: usize,
    },

    /// A decoded character differs from the original one at the same position
    #[error("character {position} decoded as {found:?}, original has {expected:?}")]
    Mismatch {
        /// Index among the non-space characters of the window
        position: usize,
        /// Original character
        expected: char,
        /// Decoded character
        found: char,
    },

    /// More trailing characters than the right context can explain
    #[error("decoded stream has {extra} characters past the right context")]
    Overrun {
        /// Number of unexplained characters
        extra: usize,
    },

    /// Token id that the vocabulary cannot decode
    #[error("token id {0} is not part of the vocabulary")]
    UnknownToken(u32),
}

/// Planner/merger consistency violations for one input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    /// Number of window results differs from the plan
    #[error("plan has {expected} windows but {actual} results arrived")]
    WindowCountMismatch {
        /// Planned window count
        expected: usize,
        /// Received result count
        actual: usize,
    },

    /// Classification and generation results mixed for one input
    #[error("window {window} has a different result variant than window 0")]
    MixedVariants {
        /// Offending window position
        window: usize,
    },

    /// A classification result whose length does not fit its window
    #[error("window {window} result has {actual} positions, expected {expected}")]
    LengthMismatch {
        /// Window position
        window: usize,
        /// Expanded window length plus markers
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// Two windows wrote the same core position
    #[error("position {position} written by window {window} was already filled")]
    OverlappingWindows {
        /// Character offset in the input
        position: usize,
        /// Window that attempted the second write
        window: usize,
    },

    /// A position no window wrote
    #[error("position {position} was not covered by any window")]
    UnfilledPosition {
        /// Character offset in the input
        position: usize,
    },

    /// Generation result without begin/end markers
    #[error("window {window} result is not wrapped in begin/end markers")]
    MissingMarkers {
        /// Window position
        window: usize,
    },

    /// Generation results need a vocabulary to be merged
    #[error("merging generation results requires a character vocabulary")]
    MissingVocabulary,

    /// The decoded window could not be aligned with the original text
    #[error("window {window} could not be aligned: {window_text:?} decoded as {decoded:?}")]
    Alignment {
        /// Window position
        window: usize,
        /// Original text sent to the model (context included)
        window_text: String,
        /// Decoded model output
        decoded: String,
        /// Underlying alignment failure
        #[source]
        source: AlignmentError,
    },
}

/// Failures while turning a merged result into text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Label count differs from the character count
    #[error("got {labels} labels for {chars} characters")]
    LabelCount {
        /// Number of labels
        labels: usize,
        /// Number of characters
        chars: usize,
    },

    /// Class index outside the repair label set
    #[error("invalid repair label {0}")]
    InvalidLabel(u32),

    /// Delete label on a character that is not a space
    #[error("cannot delete non-space character {character:?} at {position}")]
    DeleteNonSpace {
        /// Character offset
        position: usize,
        /// The character
        character: char,
    },

    /// Generation result without begin/end markers
    #[error("generated sequence is not wrapped in begin/end markers")]
    MissingMarkers,

    /// Generation result rendered without a vocabulary
    #[error("rendering a generation result requires a vocabulary")]
    MissingVocabulary,

    /// More non-space output tokens than input characters
    #[error("output has more characters than the input ({0})")]
    Exhausted(usize),

    /// Token id the vocabulary cannot decode
    #[error("token id {0} is not part of the vocabulary")]
    UnknownToken(u32),

    /// Output characters differ from the input characters
    #[error("output diverged from input: {input:?} -> {output:?}")]
    Diverged {
        /// Cleaned input
        input: String,
        /// Rendered output
        output: String,
    },

    /// Two strings differ in more than whitespace
    #[error("{from:?} and {to:?} differ in more than whitespace")]
    NotWhitespaceVariant {
        /// Source string
        from: String,
        /// Target string
        to: String,
    },
}

/// Errors surfaced by [`TokenizationRepairer`](crate::TokenizationRepairer)
#[derive(Error, Debug)]
pub enum RepairError {
    /// Input rejected before planning
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The adapter failed; propagated unchanged
    #[error("inference adapter failed")]
    Adapter {
        /// Adapter error
        #[source]
        source: AdapterError,
    },

    /// The adapter returned the wrong number of outputs
    #[error("adapter returned {actual} outputs for {expected} sequences")]
    AdapterContract {
        /// Sequences in the batch
        expected: usize,
        /// Outputs returned
        actual: usize,
    },

    /// A beam search output without candidates
    #[error("adapter returned an empty candidate list for input {input_index}")]
    EmptyCandidates {
        /// Input the window belongs to
        input_index: usize,
    },

    /// A window result was routed to an occupied or missing slot
    #[error("window {window_position} of input {input_index}: {reason}")]
    Routing {
        /// Input index
        input_index: usize,
        /// Window position
        window_position: usize,
        /// What went wrong
        reason: String,
    },

    /// Merging the windows of one input failed
    #[error("merging input {input_index} failed")]
    Merge {
        /// Input index
        input_index: usize,
        /// Merge failure
        #[source]
        source: MergeError,
    },

    /// Rendering the merged result of one input failed
    #[error("rendering input {input_index} failed")]
    Render {
        /// Input index
        input_index: usize,
        /// Render failure
        #[source]
        source: RenderError,
    },

    /// I/O error from the file interface
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for repair operations
pub type Result<T> = std::result::Result<T, RepairError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_merge_error_keeps_alignment_source() {
        let err = MergeError::Alignment {
            window: 1,
            window_text: "abc".into(),
            decoded: "abd".into(),
            source: AlignmentError::Mismatch {
                position: 2,
                expected: 'c',
                found: 'd',
            },
        };

        assert!(err.to_string().contains("window 1"));
        let source = err.source().unwrap();
        assert!(source.to_string().contains("'c'"));
    }

    #[test]
    fn test_repair_error_wraps_merge_error() {
        let err = RepairError::Merge {
            input_index: 3,
            source: MergeError::UnfilledPosition { position: 42 },
        };

        assert_eq!(err.to_string(), "merging input 3 failed");
        assert!(err.source().unwrap().to_string().contains("42"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: RepairError = ConfigError::ZeroBatchSize.into();
        assert!(matches!(err, RepairError::Config(ConfigError::ZeroBatchSize)));
    }
}
