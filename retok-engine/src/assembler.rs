//! Result assembly
//!
//! Stitches the per-window results of one input back into a single result
//! spanning the whole input. Classification results are placed by geometry;
//! generation results are cut with the alignment matcher because the decoded
//! stream does not have a fixed length.

use crate::{
    alignment::match_core,
    clean::CharIndex,
    error::MergeError,
    inference::{ClassificationResult, GenerationResult, InferenceResult},
    vocab::CharVocabulary,
    window::{Window, WindowPlan},
};

/// Merges window results according to a [`WindowPlan`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger<'v> {
    vocabulary: Option<&'v CharVocabulary>,
}

impl<'v> ResultMerger<'v> {
    /// Merger for classification results only
    pub fn new() -> Self {
        Self { vocabulary: None }
    }

    /// Merger that can also align generation results
    pub fn with_vocabulary(vocabulary: &'v CharVocabulary) -> Self {
        Self {
            vocabulary: Some(vocabulary),
        }
    }

    /// Merge the results of all windows of `input`, ordered by window position
    pub fn merge(
        &self,
        plan: &WindowPlan,
        mut results: Vec<InferenceResult>,
        input: &str,
    ) -> Result<InferenceResult, MergeError> {
        if results.len() != plan.len() {
            return Err(MergeError::WindowCountMismatch {
                expected: plan.len(),
                actual: results.len(),
            });
        }
        if let Some(first) = results.first() {
            if let Some(window) = results.iter().position(|r| !r.same_variant(first)) {
                return Err(MergeError::MixedVariants { window });
            }
        }

        if results.len() == 1 {
            if let Some(result) = results.pop() {
                return Ok(result);
            }
        }

        let windows = plan.windows();
        let mut classifications = Vec::with_capacity(results.len());
        let mut generations = Vec::with_capacity(results.len());
        for result in results {
            match result {
                InferenceResult::Classification(r) => classifications.push(r),
                InferenceResult::Generation(r) => generations.push(r),
            }
        }

        if generations.is_empty() {
            merge_classification(plan, windows, &classifications).map(Into::into)
        } else {
            let vocabulary = self.vocabulary.ok_or(MergeError::MissingVocabulary)?;
            merge_generation(windows, &generations, input, vocabulary).map(Into::into)
        }
    }
}

fn merge_classification(
    plan: &WindowPlan,
    windows: &[Window],
    results: &[ClassificationResult],
) -> Result<ClassificationResult, MergeError> {
    let length = plan.input_length();
    let num_classes = results
        .first()
        .and_then(|r| r.logits().first())
        .map_or(0, Vec::len);

    let mut predictions = vec![0u32; length];
    let mut logits = vec![Vec::new(); length];
    let mut filled = vec![false; length];

    for (window, result) in windows.iter().zip(results) {
        let expected = window.expanded_len() + 2;
        if result.len() != expected {
            return Err(MergeError::LengthMismatch {
                window: window.index,
                expected,
                actual: result.len(),
            });
        }

        let offset = window.left_context_len() + 1;
        let core = offset..offset + window.core_len();
        let labels = &result.predictions()[core.clone()];
        let vectors = &result.logits()[core];

        for (i, position) in window.core().enumerate() {
            if filled[position] {
                return Err(MergeError::OverlappingWindows {
                    position,
                    window: window.index,
                });
            }
            filled[position] = true;
            predictions[position] = labels[i];
            logits[position] = vectors[i].clone();
        }
    }

    if let Some(position) = filled.iter().position(|&f| !f) {
        return Err(MergeError::UnfilledPosition { position });
    }

    let marker_logits = vec![0.0; num_classes];
    let predictions = std::iter::once(0)
        .chain(predictions)
        .chain(std::iter::once(0))
        .collect();
    let logits = std::iter::once(marker_logits.clone())
        .chain(logits)
        .chain(std::iter::once(marker_logits))
        .collect();

    ClassificationResult::new(predictions, logits).map_err(|_| MergeError::LengthMismatch {
        window: 0,
        expected: length + 2,
        actual: length + 2,
    })
}

fn merge_generation(
    windows: &[Window],
    results: &[GenerationResult],
    input: &str,
    vocabulary: &CharVocabulary,
) -> Result<GenerationResult, MergeError> {
    let chars = CharIndex::new(input);
    let mut token_ids = vec![vocabulary.bos_id()];
    let mut log_probs = vec![0.0];

    for (window, result) in windows.iter().zip(results) {
        let ids = result.token_ids();
        if ids.len() < 2
            || ids[0] != vocabulary.bos_id()
            || ids[ids.len() - 1] != vocabulary.eos_id()
        {
            return Err(MergeError::MissingMarkers {
                window: window.index,
            });
        }

        let body = result.inner_token_ids();
        let left = chars.slice(window.context_start..window.start);
        let core = chars.slice(window.core());
        let right = chars.slice(window.end..window.context_end);

        let at_input_start = window.start == 0;
        let span = match_core(body, vocabulary, left, core, right, at_input_start).map_err(
            |source| MergeError::Alignment {
                window: window.index,
                window_text: chars.slice(window.expanded()).to_string(),
                decoded: vocabulary.decode_lossy(body),
                source,
            },
        )?;

        token_ids.extend_from_slice(&body[span.clone()]);
        log_probs.extend_from_slice(&result.inner_log_probs()[span]);
    }

    token_ids.push(vocabulary.eos_id());
    log_probs.push(0.0);

    GenerationResult::new(token_ids, log_probs).map_err(|_| MergeError::MissingMarkers { window: 0 })
}
