//! Input and output shapes of a repair call

/// Text to repair: one string or a batch of strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairInput {
    /// A single string
    Text(String),
    /// Several strings, repaired together
    Batch(Vec<String>),
}

/// Repaired text, in the shape of the [`RepairInput`] it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutput {
    /// Repaired single string
    Text(String),
    /// Repaired strings in input order
    Batch(Vec<String>),
}

impl RepairInput {
    /// Create input from a single string
    pub fn from_text<S: Into<String>>(text: S) -> Self {
        RepairInput::Text(text.into())
    }

    /// Create input from several strings
    pub fn from_batch<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RepairInput::Batch(texts.into_iter().map(Into::into).collect())
    }

    /// Number of strings
    pub fn len(&self) -> usize {
        match self {
            RepairInput::Text(_) => 1,
            RepairInput::Batch(texts) => texts.len(),
        }
    }

    /// True for an empty batch
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The strings, flattened
    pub fn into_texts(self) -> Vec<String> {
        match self {
            RepairInput::Text(text) => vec![text],
            RepairInput::Batch(texts) => texts,
        }
    }
}

impl RepairOutput {
    /// The repaired strings, flattened
    pub fn into_texts(self) -> Vec<String> {
        match self {
            RepairOutput::Text(text) => vec![text],
            RepairOutput::Batch(texts) => texts,
        }
    }
}

impl From<String> for RepairInput {
    fn from(text: String) -> Self {
        RepairInput::Text(text)
    }
}

impl From<&str> for RepairInput {
    fn from(text: &str) -> Self {
        RepairInput::Text(text.to_string())
    }
}

impl From<Vec<String>> for RepairInput {
    fn from(texts: Vec<String>) -> Self {
        RepairInput::Batch(texts)
    }
}

impl From<Vec<&str>> for RepairInput {
    fn from(texts: Vec<&str>) -> Self {
        RepairInput::from_batch(texts)
    }
}
