//! Shared error types for the services crate.

use thiserror::Error;

use tale_core::model::{AnswerError, StoryError};

/// Errors emitted by `LessonService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServiceError {
    #[error("lesson generation is not configured")]
    Disabled,
    #[error("the content service returned an empty response")]
    EmptyResponse,
    #[error("the content service returned an unreadable lesson payload")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("the generated story was empty")]
    EmptyStory(#[from] StoryError),
    #[error("the content service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl LessonServiceError {
    /// Whether retrying the request could plausibly help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            LessonServiceError::HttpStatus(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            LessonServiceError::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

/// Errors emitted by quiz sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("no questions available for a quiz")]
    Empty,
    #[error("quiz already completed")]
    Completed,
    #[error(transparent)]
    Answers(#[from] AnswerError),
}
