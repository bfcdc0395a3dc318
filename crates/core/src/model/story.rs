use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoryError {
    #[error("story text contains no words")]
    Empty,
}

/// A story to read or listen to.
///
/// Holds the full text plus the ordered word sequence derived by whitespace
/// splitting. The word sequence is what playback highlighting and
/// boundary-offset mapping operate on; it is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    text: String,
    words: Vec<String>,
}

impl Story {
    /// Build a story from raw text.
    ///
    /// # Errors
    ///
    /// Returns `StoryError::Empty` if the text contains no words.
    pub fn new(text: impl Into<String>) -> Result<Self, StoryError> {
        let text = text.into().trim().to_string();
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            return Err(StoryError::Empty);
        }
        Ok(Self { text, words })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }
}
