mod answers;
mod lesson;
mod quiz;
mod story;

pub use answers::{AnswerError, QuizScore, UserAnswerSet, score_quiz};
pub use lesson::{
    Lesson, LessonMode, LessonRequest, LessonRequestError, Level, VocabularyEntry,
};
pub use quiz::{QuizQuestion, RawQuizQuestion};
pub use story::{Story, StoryError};
