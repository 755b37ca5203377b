//! Input normalisation

/// Trim the text and collapse every whitespace run into a single space
pub fn clean_sequence(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !cleaned.is_empty() {
            cleaned.push(' ');
        }
        cleaned.push_str(word);
    }
    cleaned
}

/// The text with every space removed
pub fn remove_spaces(text: &str) -> String {
    text.chars().filter(|&ch| ch != ' ').collect()
}

/// Character-offset view of a string
#[derive(Debug, Clone)]
pub struct CharIndex<'a> {
    text: &'a str,
    offsets: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    /// Index the character boundaries of `text`
    pub fn new(text: &'a str) -> Self {
        let offsets = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, offsets }
    }

    /// Number of characters
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// True for the empty string
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Substring between two character offsets, clamped to the text
    pub fn slice(&self, range: std::ops::Range<usize>) -> &'a str {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        &self.text[self.offsets[start]..self.offsets[end]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_index_slices_by_character() {
        let index = CharIndex::new("añb€c");
        assert_eq!(index.len(), 5);
        assert_eq!(index.slice(1..4), "ñb€");
        assert_eq!(index.slice(3..99), "€c");
        assert_eq!(index.slice(4..2), "");
    }

    #[test]
    fn test_clean_sequence() {
        assert_eq!(clean_sequence("  a  b\tc\n"), "a b c");
        assert_eq!(clean_sequence(""), "");
        assert_eq!(clean_sequence(" \t "), "");
        assert_eq!(clean_sequence("already clean"), "already clean");
    }

    #[test]
    fn test_remove_spaces() {
        assert_eq!(remove_spaces("a b  c"), "abc");
    }
}
