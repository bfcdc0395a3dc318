use chrono::{DateTime, Utc};

use tale_core::Clock;
use tale_core::model::{QuizQuestion, QuizScore, UserAnswerSet, score_quiz};

use crate::error::QuizSessionError;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Result of answering one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub is_complete: bool,
}

/// Aggregate summary for a completed quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSummary {
    score: QuizScore,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl QuizSummary {
    #[must_use]
    pub fn score(&self) -> QuizScore {
        self.score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// In-memory walk through a normalized quiz.
///
/// Steps through questions in order, recording the selected option text
/// for each into the answer set, and grades at the end.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    answers: UserAnswerSet,
    current: usize,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Create a session over the given questions.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Empty` if no questions are provided.
    pub fn new(
        questions: Vec<QuizQuestion>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizSessionError> {
        if questions.is_empty() {
            return Err(QuizSessionError::Empty);
        }
        let answers = UserAnswerSet::new(questions.len());
        Ok(Self {
            questions,
            answers,
            current: 0,
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &UserAnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.current.min(self.questions.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        if self.is_complete() {
            return None;
        }
        self.questions.get(self.current)
    }

    /// Record the answer for the current question and advance.
    ///
    /// `answered_at` should come from the services layer clock.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` if the quiz is already done.
    pub fn answer_current(
        &mut self,
        answer: impl Into<String>,
        answered_at: DateTime<Utc>,
    ) -> Result<AnswerOutcome, QuizSessionError> {
        if self.is_complete() {
            return Err(QuizSessionError::Completed);
        }
        let Some(question) = self.questions.get(self.current) else {
            return Err(QuizSessionError::Completed);
        };

        let answer = answer.into();
        let correct = question.is_correct(&answer);
        self.answers.select(self.current, answer)?;

        self.current += 1;
        if self.current >= self.questions.len() {
            self.completed_at = Some(answered_at);
        }

        Ok(AnswerOutcome {
            correct,
            is_complete: self.is_complete(),
        })
    }

    /// Grade the answers recorded so far.
    #[must_use]
    pub fn score(&self) -> QuizScore {
        score_quiz(&self.questions, &self.answers)
    }

    /// Build the summary for a completed quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` if the quiz is still running.
    pub fn summary(&self) -> Result<QuizSummary, QuizSessionError> {
        let completed_at = self.completed_at.ok_or(QuizSessionError::Completed)?;
        Ok(QuizSummary {
            score: self.score(),
            started_at: self.started_at,
            completed_at,
        })
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Orchestrates quiz sessions with clock-sourced timestamps.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    /// Start a session over the given questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Empty` if no questions are provided.
    pub fn start(&self, questions: Vec<QuizQuestion>) -> Result<QuizSession, QuizSessionError> {
        QuizSession::new(questions, self.clock.now())
    }

    /// Answer the current question of `session`.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` if the quiz is already done.
    pub fn answer_current(
        &self,
        session: &mut QuizSession,
        answer: impl Into<String>,
    ) -> Result<AnswerOutcome, QuizSessionError> {
        session.answer_current(answer, self.clock.now())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
