#![forbid(unsafe_code)]

pub mod error;
pub mod lesson_service;
pub mod playback;
pub mod quiz_session;
pub mod speech;

pub use tale_core::Clock;

pub use error::{LessonServiceError, QuizSessionError};
pub use lesson_service::{LessonService, LessonServiceConfig};
pub use playback::PlaybackService;
pub use quiz_session::{AnswerOutcome, QuizSession, QuizSessionService, QuizSummary};
pub use speech::{
    DriverCapabilities, DriverEvent, ScriptedSpeechDriver, SimulatedSpeechDriver, SpeechDriver,
    UtteranceRequest,
};
