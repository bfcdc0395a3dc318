//! The speech engine boundary.
//!
//! The playback coordinator talks to text-to-speech through `SpeechDriver`
//! so that real platform engines, the simulated driver, and test doubles
//! are interchangeable. A driver reports progress and termination through
//! an event channel handed to `speak`; it never calls back into the
//! coordinator directly.

mod scripted;
mod simulated;

pub use scripted::ScriptedSpeechDriver;
pub use simulated::SimulatedSpeechDriver;

use tokio::sync::mpsc;

use tale_core::playback::SpeechErrorKind;

/// What an engine promises about itself.
///
/// `boundary_events_reliable` is false for engines known to emit no (or
/// garbage) word-boundary callbacks; the coordinator then skips arbitration
/// and paces by timer from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    pub boundary_events_reliable: bool,
}

/// One utterance handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    pub text: String,
    pub language: String,
    pub rate_multiplier: f32,
}

/// Progress and termination notifications from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// Playback reached this character offset in the utterance text.
    Boundary { char_index: usize },
    /// The utterance finished on its own.
    Ended,
    /// The utterance failed or was cut off by the engine.
    Failed(SpeechErrorKind),
}

/// A text-to-speech engine.
///
/// One utterance may be queued or active at a time process-wide; callers
/// are expected to `cancel` before speaking again. Implementations must
/// stop emitting events for an utterance promptly after it is cancelled.
pub trait SpeechDriver: Send + Sync {
    fn capabilities(&self) -> DriverCapabilities;

    /// Queue the utterance. Progress and termination are reported through
    /// `events`; a dropped receiver must be tolerated.
    fn speak(&self, request: UtteranceRequest, events: mpsc::UnboundedSender<DriverEvent>);

    /// Cancel the in-flight utterance, if any. Idempotent.
    fn cancel(&self);
}
