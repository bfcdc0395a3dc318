use thiserror::Error;

use crate::model::{AnswerError, LessonRequestError, StoryError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Story(#[from] StoryError),
    #[error(transparent)]
    LessonRequest(#[from] LessonRequestError),
    #[error(transparent)]
    Answers(#[from] AnswerError),
}
