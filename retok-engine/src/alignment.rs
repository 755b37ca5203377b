//! Alignment of decoded windows with the original text
//!
//! A generation model reproduces the characters of its input and only moves
//! spaces around. To find the part of a decoded window that belongs to the
//! window's core, the matcher counts non-space tokens: the first `|left|`
//! belong to the left context, the next `|core|` to the core, the rest to the
//! right context. Every counted token is checked against the original
//! character at the same position; the unknown token matches any character.

use crate::{
    error::AlignmentError,
    vocab::{CharVocabulary, Token},
};
use std::ops::Range;

fn non_space_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter(|&ch| ch != ' ')
}

/// Find the slice of `token_ids` (markers already stripped) that covers the
/// core window.
///
/// The slice starts right after the last left-context token, so spaces
/// between context and core stay with the core. A window without left
/// context starts at token 0, except at the start of the input
/// (`at_input_start`), where leading spaces are dropped. The slice ends right
/// after the last core token; trailing spaces belong to the next window.
pub fn match_core(
    token_ids: &[u32],
    vocab: &CharVocabulary,
    left: &str,
    core: &str,
    right: &str,
    at_input_start: bool,
) -> Result<Range<usize>, AlignmentError> {
    let left_len = non_space_chars(left).count();
    let core_end = left_len + non_space_chars(core).count();
    let expected: Vec<char> = non_space_chars(left)
        .chain(non_space_chars(core))
        .chain(non_space_chars(right))
        .collect();

    if core_end == left_len {
        return Ok(0..0);
    }

    let mut from = (left_len == 0 && !at_input_start).then_some(0);
    let mut to = None;
    let mut count = 0;
    let mut extra = 0;

    for (idx, &id) in token_ids.iter().enumerate() {
        let decoded = match vocab.token(id) {
            Some(Token::Space) => continue,
            Some(Token::Unknown) => None,
            Some(Token::Char(ch)) => Some(ch),
            Some(Token::Special) | None => return Err(AlignmentError::UnknownToken(id)),
        };

        let Some(&original) = expected.get(count) else {
            extra += 1;
            continue;
        };
        if let Some(found) = decoded {
            if found != original {
                return Err(AlignmentError::Mismatch {
                    position: count,
                    expected: original,
                    found,
                });
            }
        }

        if count == 0 && from.is_none() && left_len == 0 {
            from = Some(idx);
        }
        count += 1;
        if count == left_len {
            from = Some(idx + 1);
        }
        if count == core_end {
            to = Some(idx + 1);
        }
    }

    if extra > 0 {
        return Err(AlignmentError::Overrun { extra });
    }

    match (from, to) {
        (Some(from), Some(to)) => Ok(from..to),
        _ => Err(AlignmentError::Truncated {
            expected: core_end,
            found: count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> CharVocabulary {
        CharVocabulary::from_alphabet("abcdefghijklmnopqrstuvwxyz".chars())
    }

    fn body(vocab: &CharVocabulary, text: &str) -> Vec<u32> {
        let ids = vocab.encode(text);
        ids[1..ids.len() - 1].to_vec()
    }

    fn slice(vocab: &CharVocabulary, ids: &[u32], range: Range<usize>) -> String {
        vocab.decode_lossy(&ids[range])
    }

    #[test]
    fn test_core_between_contexts() {
        let vocab = vocab();
        // original "abcdefgh": left "ab", core "cdef", right "gh"
        let ids = body(&vocab, "ab cd efgh");

        let range = match_core(&ids, &vocab, "ab", "cdef", "gh", false).unwrap();
        assert_eq!(slice(&vocab, &ids, range), " cd ef");
    }

    #[test]
    fn test_spaces_in_reference_are_ignored() {
        let vocab = vocab();
        let ids = body(&vocab, "abcdefgh");

        let range = match_core(&ids, &vocab, "a b", " cd ef", "g h", false).unwrap();
        assert_eq!(slice(&vocab, &ids, range), "cdef");
    }

    #[test]
    fn test_no_left_context_drops_leading_spaces() {
        let vocab = vocab();
        let ids = body(&vocab, " abc de");

        let range = match_core(&ids, &vocab, "", "abc", "de", true).unwrap();
        assert_eq!(range, 1..4);
    }

    // Without context margins every later window has an empty left context;
    // its leading spaces are part of its core.
    #[test]
    fn test_no_left_context_inside_input_keeps_leading_spaces() {
        let vocab = vocab();
        let ids = body(&vocab, " cd");

        let range = match_core(&ids, &vocab, "", "cd", "", false).unwrap();
        assert_eq!(range, 0..3);
        assert_eq!(slice(&vocab, &ids, range), " cd");
    }

    #[test]
    fn test_space_only_left_context_keeps_leading_spaces() {
        let vocab = vocab();
        let ids = body(&vocab, " cd e");

        let range = match_core(&ids, &vocab, " ", "cd", "e", false).unwrap();
        assert_eq!(slice(&vocab, &ids, range), " cd");
    }

    #[test]
    fn test_trailing_spaces_belong_to_next_window() {
        let vocab = vocab();
        let ids = body(&vocab, "ab  cd");

        let range = match_core(&ids, &vocab, "", "ab", "cd", true).unwrap();
        assert_eq!(range, 0..2);
    }

    #[test]
    fn test_right_context_may_be_cut_short() {
        let vocab = vocab();
        let ids = body(&vocab, "a bc d");

        let range = match_core(&ids, &vocab, "a", "bc", "def", false).unwrap();
        assert_eq!(slice(&vocab, &ids, range), " bc");
    }

    #[test]
    fn test_unknown_token_matches_any_character() {
        let vocab = vocab();
        let ids = body(&vocab, "ab X cd");

        let range = match_core(&ids, &vocab, "ab", "X", "cd", false).unwrap();
        assert_eq!(ids[range.clone()], [vocab.space_id(), vocab.unk_id()]);
    }

    #[test]
    fn test_truncated_stream() {
        let vocab = vocab();
        let ids = body(&vocab, "ab c");

        assert_eq!(
            match_core(&ids, &vocab, "ab", "cde", "", false),
            Err(AlignmentError::Truncated {
                expected: 5,
                found: 3
            })
        );
    }

    #[test]
    fn test_mismatched_character() {
        let vocab = vocab();
        let ids = body(&vocab, "abxd");

        assert_eq!(
            match_core(&ids, &vocab, "ab", "cd", "", false),
            Err(AlignmentError::Mismatch {
                position: 2,
                expected: 'c',
                found: 'x'
            })
        );
    }

    #[test]
    fn test_overrun_past_right_context() {
        let vocab = vocab();
        let ids = body(&vocab, "abcdz");

        assert_eq!(
            match_core(&ids, &vocab, "a", "bc", "d", false),
            Err(AlignmentError::Overrun { extra: 1 })
        );
    }

    #[test]
    fn test_marker_inside_stream_is_rejected() {
        let vocab = vocab();
        let ids = vec![vocab.char_to_id('a'), vocab.eos_id()];

        assert_eq!(
            match_core(&ids, &vocab, "", "ab", "", true),
            Err(AlignmentError::UnknownToken(vocab.eos_id()))
        );
    }

    // A model that only moves spaces inside the context margin still aligns.
    #[test]
    fn test_space_edits_inside_context_margin() {
        let vocab = vocab();
        let original_left = "the cat";
        let ids = body(&vocab, "thec at sat on");

        let range = match_core(&ids, &vocab, original_left, "sat", "on", false).unwrap();
        assert_eq!(slice(&vocab, &ids, range), " sat");
    }

    // Dropping a character next to a space in the context margin shifts the
    // count; the matcher reports it instead of slicing the wrong characters.
    #[test]
    fn test_dropped_character_inside_context_margin() {
        let vocab = vocab();
        let ids = body(&vocab, "the ca sat on");

        let err = match_core(&ids, &vocab, "the cat", "sat", "on", false).unwrap_err();
        assert!(matches!(err, AlignmentError::Mismatch { position: 5, .. }));
    }

    // An extra character inserted into the left margin is caught as well.
    #[test]
    fn test_inserted_character_inside_context_margin() {
        let vocab = vocab();
        let ids = body(&vocab, "the cats sat on");

        assert_eq!(
            match_core(&ids, &vocab, "the cat", "sat", "on", false),
            Err(AlignmentError::Mismatch {
                position: 7,
                expected: 'a',
                found: 's'
            })
        );
    }
}
