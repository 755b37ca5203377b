//! Scripted adapters shared by the integration tests

#![allow(dead_code)]

use retok_engine::{
    AdapterError, CharVocabulary, ClassificationResult, GenerationResult, InferenceAdapter,
    InferenceOutput, InferenceRequest, Task,
};
use std::cell::RefCell;

fn one_hot(label: u32) -> Vec<f32> {
    let mut logits = vec![0.0; 3];
    logits[label as usize] = 1.0;
    logits
}

/// Splits CamelCase words and detaches spaces in front of punctuation.
///
/// The label of a character only depends on its neighbours, so splitting an
/// input into windows must not change the result.
#[derive(Default)]
pub struct CamelCaseClassifier {
    seen: RefCell<Vec<usize>>,
}

impl CamelCaseClassifier {
    /// Character counts of every sequence received so far
    pub fn seen(&self) -> Vec<usize> {
        self.seen.borrow().clone()
    }

    pub fn labels(sequence: &str) -> Vec<u32> {
        let chars: Vec<char> = sequence.chars().collect();
        (0..chars.len())
            .map(|i| {
                let prev = i.checked_sub(1).map(|p| chars[p]);
                let next = chars.get(i + 1).copied();
                match chars[i] {
                    ch if ch.is_uppercase() && prev.is_some_and(|p| p != ' ') => 1,
                    ' ' if matches!(next, Some('.' | ',')) => 2,
                    _ => 0,
                }
            })
            .collect()
    }
}

impl InferenceAdapter for CamelCaseClassifier {
    fn task(&self) -> Task {
        Task::Classification
    }

    fn infer(&self, request: &InferenceRequest<'_>) -> Result<Vec<InferenceOutput>, AdapterError> {
        request
            .sequences()
            .iter()
            .map(|sequence| -> Result<InferenceOutput, AdapterError> {
                self.seen.borrow_mut().push(sequence.chars().count());
                let labels: Vec<u32> = std::iter::once(0)
                    .chain(Self::labels(sequence))
                    .chain(std::iter::once(0))
                    .collect();
                let logits = labels.iter().map(|&l| one_hot(l)).collect();
                Ok(InferenceOutput::Single(
                    ClassificationResult::new(labels, logits)?.into(),
                ))
            })
            .collect()
    }
}

/// Generation model that puts exactly one space after every period that is
/// followed by another character, and removes all other spaces.
pub struct PeriodSpacer {
    vocabulary: CharVocabulary,
    beams: usize,
}

impl PeriodSpacer {
    pub fn new(alphabet: &str) -> Self {
        Self {
            vocabulary: CharVocabulary::from_alphabet(alphabet.chars()),
            beams: 0,
        }
    }

    /// Return ranked candidates, the best one first
    pub fn with_beams(mut self, beams: usize) -> Self {
        self.beams = beams;
        self
    }

    pub fn respace(sequence: &str) -> String {
        let chars: Vec<char> = sequence.chars().filter(|&c| c != ' ').collect();
        let mut output = String::new();
        for (i, &ch) in chars.iter().enumerate() {
            output.push(ch);
            if ch == '.' && i + 1 < chars.len() {
                output.push(' ');
            }
        }
        output
    }

    fn generate(&self, text: &str) -> GenerationResult {
        let ids = self.vocabulary.encode(text);
        let log_probs = vec![-0.25; ids.len()];
        GenerationResult::new(ids, log_probs).unwrap()
    }
}

impl InferenceAdapter for PeriodSpacer {
    fn task(&self) -> Task {
        Task::Generation
    }

    fn vocabulary(&self) -> Option<&CharVocabulary> {
        Some(&self.vocabulary)
    }

    fn infer(&self, request: &InferenceRequest<'_>) -> Result<Vec<InferenceOutput>, AdapterError> {
        Ok(request
            .sequences()
            .iter()
            .map(|sequence| {
                let best = self.generate(&Self::respace(sequence)).into();
                if self.beams == 0 {
                    return InferenceOutput::Single(best);
                }
                // worse candidates keep the input untouched
                let mut ranked = vec![best];
                for _ in 1..self.beams {
                    ranked.push(self.generate(sequence).into());
                }
                InferenceOutput::Ranked(ranked)
            })
            .collect())
    }
}
