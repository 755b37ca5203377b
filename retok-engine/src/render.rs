//! Rendering merged results into repaired text

use crate::{
    clean::{clean_sequence, remove_spaces},
    error::RenderError,
    inference::{GenerationResult, InferenceResult},
    vocab::{CharVocabulary, Token},
};

/// Per-character whitespace repair label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RepairLabel {
    /// Leave the character as it is
    Keep = 0,
    /// Insert a space before the character
    InsertSpace = 1,
    /// Delete the character, which must be a space
    DeleteSpace = 2,
}

impl TryFrom<u32> for RepairLabel {
    type Error = RenderError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RepairLabel::Keep),
            1 => Ok(RepairLabel::InsertSpace),
            2 => Ok(RepairLabel::DeleteSpace),
            other => Err(RenderError::InvalidLabel(other)),
        }
    }
}

impl From<RepairLabel> for u32 {
    fn from(label: RepairLabel) -> Self {
        label as u32
    }
}

/// Apply one repair label per character of `text`
pub fn repair_whitespace(text: &str, labels: &[u32]) -> Result<String, RenderError> {
    let chars = text.chars().count();
    if labels.len() != chars {
        return Err(RenderError::LabelCount {
            labels: labels.len(),
            chars,
        });
    }

    let mut repaired = String::with_capacity(text.len() + text.len() / 4);
    for (position, (ch, &label)) in text.chars().zip(labels).enumerate() {
        match RepairLabel::try_from(label)? {
            RepairLabel::Keep => repaired.push(ch),
            RepairLabel::InsertSpace => {
                repaired.push(' ');
                repaired.push(ch);
            }
            RepairLabel::DeleteSpace if ch == ' ' => {}
            RepairLabel::DeleteSpace => {
                return Err(RenderError::DeleteNonSpace {
                    position,
                    character: ch,
                })
            }
        }
    }

    Ok(clean_sequence(&repaired))
}

/// Turn a generated token sequence into text.
///
/// Unknown tokens are replaced by the input character they stand for. The
/// output must contain exactly the non-space characters of `input`.
pub fn render_generation(
    result: &GenerationResult,
    input: &str,
    vocab: &CharVocabulary,
) -> Result<String, RenderError> {
    let ids = result.token_ids();
    if ids.len() < 2 || ids[0] != vocab.bos_id() || ids[ids.len() - 1] != vocab.eos_id() {
        return Err(RenderError::MissingMarkers);
    }

    let stripped: Vec<char> = remove_spaces(input).chars().collect();
    let mut output = String::with_capacity(input.len());
    let mut pointer = 0;

    for &id in result.inner_token_ids() {
        let ch = match vocab.token(id) {
            Some(Token::Space) => {
                output.push(' ');
                continue;
            }
            Some(Token::Unknown) => *stripped
                .get(pointer)
                .ok_or(RenderError::Exhausted(stripped.len()))?,
            Some(Token::Char(ch)) => ch,
            Some(Token::Special) | None => return Err(RenderError::UnknownToken(id)),
        };
        output.push(ch);
        pointer += 1;
    }

    let output = clean_sequence(&output);
    if pointer != stripped.len() || remove_spaces(&output).chars().ne(stripped.iter().copied()) {
        return Err(RenderError::Diverged {
            input: input.to_string(),
            output,
        });
    }

    Ok(output)
}

/// Render a merged result for its cleaned input
pub fn render(
    result: &InferenceResult,
    input: &str,
    vocab: Option<&CharVocabulary>,
) -> Result<String, RenderError> {
    match result {
        InferenceResult::Classification(result) => {
            repair_whitespace(input, result.inner_predictions())
        }
        InferenceResult::Generation(result) => {
            let vocab = vocab.ok_or(RenderError::MissingVocabulary)?;
            render_generation(result, input, vocab)
        }
    }
}

/// Labels that turn `from` into `to` when both differ only in spaces
pub fn whitespace_operations(from: &str, to: &str) -> Result<Vec<u32>, RenderError> {
    let not_variant = || RenderError::NotWhitespaceVariant {
        from: from.to_string(),
        to: to.to_string(),
    };

    let target: Vec<char> = to.chars().collect();
    let mut labels = Vec::with_capacity(from.len());
    let mut j = 0;

    for ch in from.chars() {
        if ch == ' ' {
            if target.get(j) == Some(&' ') {
                labels.push(RepairLabel::Keep.into());
                j += 1;
            } else {
                labels.push(RepairLabel::DeleteSpace.into());
            }
            continue;
        }

        let label = if target.get(j) == Some(&' ') {
            j += 1;
            RepairLabel::InsertSpace
        } else {
            RepairLabel::Keep
        };
        if target.get(j) != Some(&ch) {
            return Err(not_variant());
        }
        j += 1;
        labels.push(label.into());
    }

    if j != target.len() {
        return Err(not_variant());
    }
    Ok(labels)
}
