use thiserror::Error;

use crate::model::quiz::QuizQuestion;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer slot {index} out of range for {len} questions")]
    OutOfRange { index: usize, len: usize },
}

/// One answer slot per question, initialized empty and filled by selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAnswerSet {
    answers: Vec<String>,
}

impl UserAnswerSet {
    #[must_use]
    pub fn new(question_count: usize) -> Self {
        Self {
            answers: vec![String::new(); question_count],
        }
    }

    /// Record the selected option text for a question.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::OutOfRange` if `index` has no slot.
    pub fn select(&mut self, index: usize, answer: impl Into<String>) -> Result<(), AnswerError> {
        let len = self.answers.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(AnswerError::OutOfRange { index, len })?;
        *slot = answer.into();
        Ok(())
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Number of slots holding a non-empty selection.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|answer| !answer.is_empty()).count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answered_count() == self.answers.len()
    }
}

/// Result of grading a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    correct: usize,
    total: usize,
}

impl QuizScore {
    #[must_use]
    pub fn new(correct: usize, total: usize) -> Self {
        Self { correct, total }
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Percentage of correct answers, rounded to the nearest whole number.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let scaled = self.correct * 100 + self.total / 2;
        u32::try_from(scaled / self.total).unwrap_or(u32::MAX)
    }
}

/// Grade user answers against the questions' answer keys.
///
/// Each slot counts when it matches the question's `correct_answer` after
/// trimming. Extra slots beyond the question list never count.
#[must_use]
pub fn score_quiz(questions: &[QuizQuestion], answers: &UserAnswerSet) -> QuizScore {
    let correct = questions
        .iter()
        .zip(answers.answers())
        .filter(|(question, answer)| question.is_correct(answer))
        .count();
    QuizScore::new(correct, questions.len())
}
