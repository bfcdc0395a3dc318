use thiserror::Error;

use crate::model::quiz::QuizQuestion;
use crate::model::story::Story;

//
// ─── LESSON REQUEST ────────────────────────────────────────────────────────────
//

/// Difficulty of the generated story and quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

/// How the user works through the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonMode {
    Read,
    Listen,
}

impl LessonMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonMode::Read => "read",
            LessonMode::Listen => "listen",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonRequestError {
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("word count must be positive")]
    ZeroWordCount,
    #[error("question count must be positive")]
    ZeroQuestionCount,
}

/// Parameters the user picks before a lesson is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRequest {
    level: Level,
    topic: String,
    word_count: u32,
    question_count: u32,
    vocabulary_count: u32,
    mode: LessonMode,
}

impl LessonRequest {
    /// Validate and build a lesson request.
    ///
    /// # Errors
    ///
    /// Returns `LessonRequestError` when the topic is blank or a count that
    /// must be positive is zero. A zero vocabulary count is allowed (the
    /// vocabulary list is optional).
    pub fn new(
        level: Level,
        topic: impl Into<String>,
        word_count: u32,
        question_count: u32,
        vocabulary_count: u32,
        mode: LessonMode,
    ) -> Result<Self, LessonRequestError> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(LessonRequestError::EmptyTopic);
        }
        if word_count == 0 {
            return Err(LessonRequestError::ZeroWordCount);
        }
        if question_count == 0 {
            return Err(LessonRequestError::ZeroQuestionCount);
        }

        Ok(Self {
            level,
            topic,
            word_count,
            question_count,
            vocabulary_count,
            mode,
        })
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn word_count(&self) -> u32 {
        self.word_count
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn vocabulary_count(&self) -> u32 {
        self.vocabulary_count
    }

    #[must_use]
    pub fn mode(&self) -> LessonMode {
        self.mode
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A word/definition pair from the generated vocabulary list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    word: String,
    definition: String,
}

impl VocabularyEntry {
    #[must_use]
    pub fn new(word: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            word: word.into().trim().to_string(),
            definition: definition.into().trim().to_string(),
        }
    }

    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// An entry is usable only when it actually names a word.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.word.is_empty()
    }
}

/// A sanitized lesson: the story plus its normalized quiz and vocabulary.
///
/// Built at the generation boundary after quiz normalization, so every
/// question already satisfies the correct-answer-is-an-option invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    story: Story,
    quiz: Vec<QuizQuestion>,
    vocabulary: Vec<VocabularyEntry>,
}

impl Lesson {
    #[must_use]
    pub fn new(story: Story, quiz: Vec<QuizQuestion>, vocabulary: Vec<VocabularyEntry>) -> Self {
        Self {
            story,
            quiz,
            vocabulary,
        }
    }

    #[must_use]
    pub fn story(&self) -> &Story {
        &self.story
    }

    #[must_use]
    pub fn quiz(&self) -> &[QuizQuestion] {
        &self.quiz
    }

    #[must_use]
    pub fn vocabulary(&self) -> &[VocabularyEntry] {
        &self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_trims_and_validates_topic() {
        let request = LessonRequest::new(Level::Beginner, "  animals ", 80, 3, 5, LessonMode::Read)
            .unwrap();
        assert_eq!(request.topic(), "animals");

        let err = LessonRequest::new(Level::Beginner, "   ", 80, 3, 5, LessonMode::Read)
            .unwrap_err();
        assert!(matches!(err, LessonRequestError::EmptyTopic));
    }

    #[test]
    fn request_rejects_zero_counts() {
        assert!(matches!(
            LessonRequest::new(Level::Advanced, "food", 0, 3, 5, LessonMode::Listen),
            Err(LessonRequestError::ZeroWordCount)
        ));
        assert!(matches!(
            LessonRequest::new(Level::Advanced, "food", 80, 0, 5, LessonMode::Listen),
            Err(LessonRequestError::ZeroQuestionCount)
        ));
        // A lesson without vocabulary is fine.
        assert!(LessonRequest::new(Level::Advanced, "food", 80, 3, 0, LessonMode::Listen).is_ok());
    }

    #[test]
    fn vocabulary_entry_usability() {
        assert!(VocabularyEntry::new("perro", "dog").is_usable());
        assert!(!VocabularyEntry::new("  ", "dog").is_usable());
    }
}
