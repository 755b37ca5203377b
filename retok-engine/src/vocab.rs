//! Character vocabulary of generation models
//!
//! Only the lookup side of a tokenizer is needed here: decoding ids to
//! characters and knowing which ids are markers, spaces or unknown.

use crate::error::VocabularyError;
use std::collections::HashMap;

/// Unknown-token spelling
pub const UNK: &str = "<unk>";
/// Begin-of-sequence spelling
pub const BOS: &str = "<bos>";
/// End-of-sequence spelling
pub const EOS: &str = "<eos>";
/// Padding spelling
pub const PAD: &str = "<pad>";

/// A decoded token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A literal character (never a space)
    Char(char),
    /// The space token
    Space,
    /// Unknown-token placeholder
    Unknown,
    /// Begin, end or padding marker
    Special,
}

/// Bidirectional mapping between characters and token ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharVocabulary {
    chars: Vec<Option<char>>,
    ids: HashMap<char, u32>,
    unk_id: u32,
    bos_id: u32,
    eos_id: u32,
    pad_id: u32,
    space_id: u32,
}

impl CharVocabulary {
    /// Build a vocabulary with the special tokens at ids 0..4, the space at
    /// id 4 and the alphabet after it. Duplicates and spaces in `alphabet`
    /// are skipped.
    pub fn from_alphabet<I>(alphabet: I) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        let mut tokens: Vec<String> = [UNK, BOS, EOS, PAD, " "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut seen = std::collections::HashSet::new();
        for ch in alphabet {
            if ch != ' ' && seen.insert(ch) {
                tokens.push(ch.to_string());
            }
        }

        // the token list above always contains every special token
        Self::from_tokens(tokens).unwrap_or_else(|_| unreachable!())
    }

    /// Build a vocabulary from its token list (index = id). Every token must
    /// be a single character or one of the special spellings, and the
    /// special tokens plus the space must all be present.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, VocabularyError> {
        let mut chars = Vec::with_capacity(tokens.len());
        let mut ids = HashMap::new();
        let (mut unk, mut bos, mut eos, mut pad, mut space) = (None, None, None, None, None);

        for (id, token) in tokens.iter().enumerate() {
            let id = u32::try_from(id).map_err(|_| VocabularyError::TooLarge)?;
            match token.as_str() {
                UNK => unk = Some(id),
                BOS => bos = Some(id),
                EOS => eos = Some(id),
                PAD => pad = Some(id),
                _ => {}
            }

            let mut token_chars = token.chars();
            let ch = match (token_chars.next(), token_chars.next()) {
                (Some(ch), None) => Some(ch),
                _ if [UNK, BOS, EOS, PAD].contains(&token.as_str()) => None,
                _ => return Err(VocabularyError::NotSingleCharacter(token.clone())),
            };

            if let Some(ch) = ch {
                if ch == ' ' {
                    space = Some(id);
                }
                ids.entry(ch).or_insert(id);
            }
            chars.push(ch);
        }

        let missing = VocabularyError::MissingToken;
        Ok(Self {
            chars,
            ids,
            unk_id: unk.ok_or_else(|| missing(UNK))?,
            bos_id: bos.ok_or_else(|| missing(BOS))?,
            eos_id: eos.ok_or_else(|| missing(EOS))?,
            pad_id: pad.ok_or_else(|| missing(PAD))?,
            space_id: space.ok_or_else(|| missing("space"))?,
        })
    }

    /// Unknown-token id
    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }

    /// Begin-of-sequence id
    pub fn bos_id(&self) -> u32 {
        self.bos_id
    }

    /// End-of-sequence id
    pub fn eos_id(&self) -> u32 {
        self.eos_id
    }

    /// Padding id
    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// Space id
    pub fn space_id(&self) -> u32 {
        self.space_id
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True if the vocabulary has no tokens
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Id of a character, `unk_id` if it is not in the vocabulary
    pub fn char_to_id(&self, ch: char) -> u32 {
        self.ids.get(&ch).copied().unwrap_or(self.unk_id)
    }

    /// Character of a non-special id
    pub fn id_to_char(&self, id: u32) -> Option<char> {
        self.chars.get(id as usize).copied().flatten()
    }

    /// Classify a token id; `None` for ids outside the vocabulary
    pub fn token(&self, id: u32) -> Option<Token> {
        if id == self.space_id {
            Some(Token::Space)
        } else if id == self.unk_id {
            Some(Token::Unknown)
        } else if id == self.bos_id || id == self.eos_id || id == self.pad_id {
            Some(Token::Special)
        } else {
            self.id_to_char(id).map(Token::Char)
        }
    }

    /// Encode text as BOS, one id per character, EOS
    pub fn encode(&self, text: &str) -> Vec<u32> {
        std::iter::once(self.bos_id)
            .chain(text.chars().map(|ch| self.char_to_id(ch)))
            .chain(std::iter::once(self.eos_id))
            .collect()
    }

    /// Decode ids for diagnostics; unknown tokens become `�`, markers are
    /// dropped.
    pub fn decode_lossy(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter_map(|&id| match self.token(id) {
                Some(Token::Char(ch)) => Some(ch),
                Some(Token::Space) => Some(' '),
                Some(Token::Unknown) | None => Some('\u{FFFD}'),
                Some(Token::Special) => None,
            })
            .collect()
    }
}
