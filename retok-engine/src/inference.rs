//! Inference result types
//!
//! Both variants include the begin/end marker positions. Results are
//! immutable once constructed.

use crate::error::ResultError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-character classification labels with their logits
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawClassification"))]
pub struct ClassificationResult {
    predictions: Vec<u32>,
    logits: Vec<Vec<f32>>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawClassification {
    predictions: Vec<u32>,
    logits: Vec<Vec<f32>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawClassification> for ClassificationResult {
    type Error = ResultError;

    fn try_from(raw: RawClassification) -> Result<Self, Self::Error> {
        Self::new(raw.predictions, raw.logits)
    }
}

impl ClassificationResult {
    /// Create a result; `predictions` and `logits` must have equal length.
    pub fn new(predictions: Vec<u32>, logits: Vec<Vec<f32>>) -> Result<Self, ResultError> {
        if predictions.len() != logits.len() {
            return Err(ResultError::LogitCount {
                predictions: predictions.len(),
                logits: logits.len(),
            });
        }
        Ok(Self {
            predictions,
            logits,
        })
    }

    /// Class label per position, markers included
    pub fn predictions(&self) -> &[u32] {
        &self.predictions
    }

    /// Logit vector per position, markers included
    pub fn logits(&self) -> &[Vec<f32>] {
        &self.logits
    }

    /// Number of positions including markers
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    /// True if there are no positions at all
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Labels with the two marker positions removed
    pub fn inner_predictions(&self) -> &[u32] {
        strip_markers(&self.predictions)
    }
}

/// Generated token ids with their log-probabilities
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawGeneration"))]
pub struct GenerationResult {
    token_ids: Vec<u32>,
    token_log_probs: Vec<f32>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawGeneration {
    token_ids: Vec<u32>,
    token_log_probs: Vec<f32>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGeneration> for GenerationResult {
    type Error = ResultError;

    fn try_from(raw: RawGeneration) -> Result<Self, Self::Error> {
        Self::new(raw.token_ids, raw.token_log_probs)
    }
}

impl GenerationResult {
    /// Create a result; every token needs a log-probability.
    pub fn new(token_ids: Vec<u32>, token_log_probs: Vec<f32>) -> Result<Self, ResultError> {
        if token_ids.len() != token_log_probs.len() {
            return Err(ResultError::LogProbCount {
                tokens: token_ids.len(),
                log_probs: token_log_probs.len(),
            });
        }
        Ok(Self {
            token_ids,
            token_log_probs,
        })
    }

    /// Token ids including begin/end markers
    pub fn token_ids(&self) -> &[u32] {
        &self.token_ids
    }

    /// Log-probability per token
    pub fn token_log_probs(&self) -> &[f32] {
        &self.token_log_probs
    }

    /// Number of tokens including markers
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    /// True if there are no tokens at all
    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// Token ids with the markers removed
    pub fn inner_token_ids(&self) -> &[u32] {
        strip_markers(&self.token_ids)
    }

    /// Log-probabilities with the markers removed
    pub fn inner_log_probs(&self) -> &[f32] {
        strip_markers(&self.token_log_probs)
    }

    /// Sum of the token log-probabilities
    pub fn log_prob(&self) -> f32 {
        self.token_log_probs.iter().sum()
    }
}

/// Result of running the model on one sequence
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum InferenceResult {
    /// One label per character
    Classification(ClassificationResult),
    /// Generated character tokens
    Generation(GenerationResult),
}

impl InferenceResult {
    /// Name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceResult::Classification(_) => "classification",
            InferenceResult::Generation(_) => "generation",
        }
    }

    /// True if both results are the same variant
    pub fn same_variant(&self, other: &InferenceResult) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl From<ClassificationResult> for InferenceResult {
    fn from(result: ClassificationResult) -> Self {
        InferenceResult::Classification(result)
    }
}

impl From<GenerationResult> for InferenceResult {
    fn from(result: GenerationResult) -> Self {
        InferenceResult::Generation(result)
    }
}

/// What an adapter returns for one sequence
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum InferenceOutput {
    /// A single result
    Single(InferenceResult),
    /// Candidates ranked best first (beam search)
    Ranked(Vec<InferenceResult>),
}

impl InferenceOutput {
    /// Reduce to the best-ranked result. `None` for an empty candidate list.
    pub fn into_top(self) -> Option<InferenceResult> {
        match self {
            InferenceOutput::Single(result) => Some(result),
            InferenceOutput::Ranked(candidates) => candidates.into_iter().next(),
        }
    }
}

impl From<InferenceResult> for InferenceOutput {
    fn from(result: InferenceResult) -> Self {
        InferenceOutput::Single(result)
    }
}

fn strip_markers<T>(values: &[T]) -> &[T] {
    if values.len() < 2 {
        return &[];
    }
    &values[1..values.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(ids: &[u32]) -> InferenceResult {
        GenerationResult::new(ids.to_vec(), vec![-0.5; ids.len()])
            .unwrap()
            .into()
    }

    #[test]
    fn test_constructors_check_lengths() {
        assert_eq!(
            ClassificationResult::new(vec![0, 1], vec![vec![0.0]]),
            Err(ResultError::LogitCount {
                predictions: 2,
                logits: 1
            })
        );
        assert_eq!(
            GenerationResult::new(vec![1, 2], vec![0.0]),
            Err(ResultError::LogProbCount {
                tokens: 2,
                log_probs: 1
            })
        );
    }

    #[test]
    fn test_inner_slices_strip_markers() {
        let result = ClassificationResult::new(vec![0, 1, 2, 0], vec![vec![0.0]; 4]).unwrap();
        assert_eq!(result.inner_predictions(), &[1, 2]);

        let empty = ClassificationResult::new(vec![0], vec![vec![0.0]]).unwrap();
        assert!(empty.inner_predictions().is_empty());
    }

    #[test]
    fn test_top_candidate_is_first() {
        let ranked = InferenceOutput::Ranked(vec![generation(&[1, 7, 2]), generation(&[1, 8, 2])]);
        assert_eq!(ranked.into_top(), Some(generation(&[1, 7, 2])));

        assert_eq!(InferenceOutput::Ranked(Vec::new()).into_top(), None);
    }

    #[test]
    fn test_same_variant() {
        let class: InferenceResult = ClassificationResult::new(vec![0, 0], vec![vec![0.0]; 2])
            .unwrap()
            .into();
        assert!(class.same_variant(&class.clone()));
        assert!(!class.same_variant(&generation(&[1, 2])));
        assert_eq!(class.kind(), "classification");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_inconsistent_lengths() {
        let json = r#"{"type":"generation","token_ids":[1,2],"token_log_probs":[0.0]}"#;
        assert!(serde_json::from_str::<InferenceResult>(json).is_err());

        let json = r#"{"type":"generation","token_ids":[1,2],"token_log_probs":[0.0,0.0]}"#;
        assert!(serde_json::from_str::<InferenceResult>(json).is_ok());
    }
}
