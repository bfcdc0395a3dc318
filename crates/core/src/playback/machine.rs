use std::time::Duration;

use crate::playback::boundary::word_index_at_offset;
use crate::playback::pacing::{PacingProfile, PlaybackRate};
use crate::playback::speech::SpeechErrorKind;

//
// ─── PHASES & STRATEGY ─────────────────────────────────────────────────────────
//

/// Lifecycle phase of a playback session.
///
/// `Starting` is the arbitration window: speech has been requested and the
/// machine is waiting to learn whether the engine delivers boundary events
/// before the deadline. Exactly one of the two active phases follows, and
/// every terminal path returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Starting,
    BoundaryActive,
    FallbackActive,
}

/// Which synchronization strategy won arbitration for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    Boundary,
    Fallback,
}

//
// ─── EFFECTS & VIEW ────────────────────────────────────────────────────────────
//

/// Work the timer/driver shell must carry out after an event is applied.
///
/// The machine never performs I/O itself; it tells its owner what to
/// schedule or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEffect {
    /// Arm the arbitration deadline timer.
    ArmArbitration(Duration),
    /// Start the recurring fallback tick at this interval.
    StartPacer(Duration),
    /// The fallback tick is no longer wanted.
    StopPacer,
    /// Cancel the in-flight utterance.
    CancelSpeech,
    /// Arm the post-stop grace timer that re-enables error reporting.
    ArmStopGrace(Duration),
}

/// Read-only snapshot for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackView {
    pub current_word_index: Option<usize>,
    pub is_speaking: bool,
    pub error: Option<&'static str>,
}

/// Timing knobs for arbitration and stop handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTuning {
    /// How long to wait for a first boundary event before committing to
    /// fallback pacing.
    pub arbitration_window: Duration,
    /// How long after a user stop the next driver error is discarded.
    pub stop_grace: Duration,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            arbitration_window: Duration::from_millis(900),
            stop_grace: Duration::from_millis(120),
        }
    }
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

/// State machine for one playback session.
///
/// Owns everything both synchronization strategies mutate: the phase, the
/// first-boundary latch, the current word index, and the fallback pause
/// budget. Events that arrive for a strategy that did not win arbitration
/// (or after teardown) are dropped without effect, which is what makes
/// stale timer ticks and late engine callbacks harmless.
#[derive(Debug)]
pub struct PlaybackMachine {
    words: Vec<String>,
    profile: PacingProfile,
    tuning: PlaybackTuning,
    phase: PlaybackPhase,
    strategy: Option<SyncStrategy>,
    current_word_index: Option<usize>,
    pause_budget_ms: u64,
    first_boundary_heard: bool,
    stopped_by_user: bool,
    error: Option<SpeechErrorKind>,
}

impl PlaybackMachine {
    /// Begin a session over `words` at the given rate.
    ///
    /// When the engine's boundary events are reliable the machine enters
    /// `Starting` and asks for the arbitration deadline; otherwise it
    /// commits to fallback pacing immediately, with the highlight already
    /// on the first word.
    #[must_use]
    pub fn start(
        words: Vec<String>,
        rate: PlaybackRate,
        tuning: PlaybackTuning,
        boundary_events_reliable: bool,
    ) -> (Self, Vec<PlaybackEffect>) {
        let mut machine = Self {
            words,
            profile: PacingProfile::for_rate(rate),
            tuning,
            phase: PlaybackPhase::Starting,
            strategy: None,
            current_word_index: None,
            pause_budget_ms: 0,
            first_boundary_heard: false,
            stopped_by_user: false,
            error: None,
        };

        let effects = if boundary_events_reliable {
            vec![PlaybackEffect::ArmArbitration(tuning.arbitration_window)]
        } else {
            machine.activate_fallback()
        };
        (machine, effects)
    }

    //
    // ─── EVENTS ────────────────────────────────────────────────────────────
    //

    /// A boundary event from the speech engine, carrying a character offset
    /// into the story text.
    pub fn on_boundary(&mut self, char_index: usize) -> Vec<PlaybackEffect> {
        match self.phase {
            PlaybackPhase::Starting => {
                // First boundary wins arbitration.
                self.phase = PlaybackPhase::BoundaryActive;
                self.strategy = Some(SyncStrategy::Boundary);
                self.first_boundary_heard = true;
                self.current_word_index = word_index_at_offset(&self.words, char_index);
                Vec::new()
            }
            PlaybackPhase::BoundaryActive => {
                self.current_word_index = word_index_at_offset(&self.words, char_index);
                Vec::new()
            }
            // Fallback already won, or the session is gone.
            PlaybackPhase::FallbackActive | PlaybackPhase::Idle => Vec::new(),
        }
    }

    /// The arbitration deadline elapsed with no boundary event heard.
    pub fn on_arbitration_elapsed(&mut self) -> Vec<PlaybackEffect> {
        if self.phase == PlaybackPhase::Starting && !self.first_boundary_heard {
            self.activate_fallback()
        } else {
            Vec::new()
        }
    }

    /// One fallback pacing tick.
    ///
    /// An active pause budget (earned by the previously crossed word's
    /// punctuation) is spent first; the index only advances once the budget
    /// is exhausted. Advancing past the last word is natural completion.
    pub fn on_pacer_tick(&mut self) -> Vec<PlaybackEffect> {
        if self.phase != PlaybackPhase::FallbackActive {
            return Vec::new();
        }
        if self.pause_budget_ms > 0 {
            self.pause_budget_ms = self.pause_budget_ms.saturating_sub(self.profile.ms_per_word());
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.advance_fallback(&mut effects);
        effects
    }

    /// The engine reported the utterance finished on its own.
    pub fn on_speech_ended(&mut self) -> Vec<PlaybackEffect> {
        if self.phase == PlaybackPhase::Idle {
            return Vec::new();
        }
        self.reset_to_idle();
        vec![PlaybackEffect::StopPacer]
    }

    /// The engine reported a failure.
    ///
    /// Inside the post-stop grace window this is the echo of our own
    /// cancellation and is discarded. Every other failure ends the session
    /// with a user-visible message, even one arriving after fallback pacing
    /// already finished on its own.
    pub fn on_speech_error(&mut self, kind: SpeechErrorKind) -> Vec<PlaybackEffect> {
        if self.stopped_by_user {
            return Vec::new();
        }
        self.reset_to_idle();
        self.error = Some(kind);
        vec![PlaybackEffect::StopPacer, PlaybackEffect::CancelSpeech]
    }

    /// User-initiated stop. Idempotent once idle.
    pub fn stop(&mut self) -> Vec<PlaybackEffect> {
        if self.phase == PlaybackPhase::Idle {
            return Vec::new();
        }
        self.reset_to_idle();
        self.error = None;
        self.stopped_by_user = true;
        vec![
            PlaybackEffect::StopPacer,
            PlaybackEffect::CancelSpeech,
            PlaybackEffect::ArmStopGrace(self.tuning.stop_grace),
        ]
    }

    /// The post-stop grace window elapsed; errors report normally again.
    pub fn on_grace_elapsed(&mut self) -> Vec<PlaybackEffect> {
        self.stopped_by_user = false;
        Vec::new()
    }

    //
    // ─── STATE ACCESS ──────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    #[must_use]
    pub fn strategy(&self) -> Option<SyncStrategy> {
        self.strategy
    }

    #[must_use]
    pub fn current_word_index(&self) -> Option<usize> {
        self.current_word_index
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.phase != PlaybackPhase::Idle
    }

    #[must_use]
    pub fn error(&self) -> Option<SpeechErrorKind> {
        self.error
    }

    #[must_use]
    pub fn view(&self) -> PlaybackView {
        PlaybackView {
            current_word_index: self.current_word_index,
            is_speaking: self.is_speaking(),
            error: self.error.map(SpeechErrorKind::user_message),
        }
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────
    //

    fn activate_fallback(&mut self) -> Vec<PlaybackEffect> {
        self.phase = PlaybackPhase::FallbackActive;
        self.strategy = Some(SyncStrategy::Fallback);
        let mut effects = vec![PlaybackEffect::StartPacer(self.profile.tick_interval())];
        self.advance_fallback(&mut effects);
        effects
    }

    /// Move the fallback highlight to the next word, or complete.
    ///
    /// The newly entered word's trailing punctuation sets the pause budget
    /// that delays the following advance. Completion deliberately does not
    /// cancel the utterance: the engine may still be speaking, and cutting
    /// it off would be audible; its own end callback arrives in `Idle` and
    /// is dropped.
    fn advance_fallback(&mut self, effects: &mut Vec<PlaybackEffect>) {
        let next = self.current_word_index.map_or(0, |index| index + 1);
        if next >= self.words.len() {
            self.reset_to_idle();
            effects.push(PlaybackEffect::StopPacer);
            return;
        }
        self.pause_budget_ms = self.profile.pause_after_ms(&self.words[next]);
        self.current_word_index = Some(next);
    }

    fn reset_to_idle(&mut self) {
        self.phase = PlaybackPhase::Idle;
        self.strategy = None;
        self.current_word_index = None;
        self.pause_budget_ms = 0;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn start_fallback(text: &str, rate: PlaybackRate) -> (PlaybackMachine, Vec<PlaybackEffect>) {
        PlaybackMachine::start(words(text), rate, PlaybackTuning::default(), false)
    }

    fn start_arbitrating(text: &str) -> PlaybackMachine {
        let (machine, effects) =
            PlaybackMachine::start(words(text), PlaybackRate::Normal, PlaybackTuning::default(), true);
        assert_eq!(machine.phase(), PlaybackPhase::Starting);
        assert_eq!(
            effects,
            vec![PlaybackEffect::ArmArbitration(Duration::from_millis(900))]
        );
        machine
    }

    /// Run a fallback session to completion, returning each index visited.
    fn visited_indices(machine: &mut PlaybackMachine) -> Vec<usize> {
        let mut visited = Vec::new();
        if let Some(index) = machine.current_word_index() {
            visited.push(index);
        }
        let mut safety = 0;
        while machine.phase() != PlaybackPhase::Idle {
            safety += 1;
            assert!(safety < 10_000, "fallback pacing did not terminate");
            machine.on_pacer_tick();
            if let Some(index) = machine.current_word_index() {
                if visited.last() != Some(&index) {
                    visited.push(index);
                }
            }
        }
        visited
    }

    #[test]
    fn fallback_visits_every_word_once_in_order() {
        for rate in PlaybackRate::ALL {
            let (mut machine, effects) =
                start_fallback("One fine day, the fox crossed the river. The end.", rate);
            assert_eq!(machine.phase(), PlaybackPhase::FallbackActive);
            assert_eq!(machine.strategy(), Some(SyncStrategy::Fallback));
            assert!(effects.contains(&PlaybackEffect::StartPacer(
                PacingProfile::for_rate(rate).tick_interval()
            )));

            let visited = visited_indices(&mut machine);
            let expected: Vec<usize> = (0..10).collect();
            assert_eq!(visited, expected, "rate {}", rate.as_str());
            assert_eq!(machine.current_word_index(), None);
            assert!(!machine.is_speaking());
        }
    }

    #[test]
    fn fallback_starts_on_the_first_word_immediately() {
        let (machine, _) = start_fallback("uno dos tres", PlaybackRate::Normal);
        assert_eq!(machine.current_word_index(), Some(0));
        assert!(machine.is_speaking());
    }

    #[test]
    fn sentence_pause_budget_delays_advancement() {
        let (mut machine, _) = start_fallback("Stop. go", PlaybackRate::Normal);
        let profile = PacingProfile::for_rate(PlaybackRate::Normal);
        assert_eq!(machine.current_word_index(), Some(0));

        // 600ms budget at 340ms/word: two ticks spend it, the third advances.
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(0));
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(0));
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(1));
        assert_eq!(profile.sentence_pause_ms(), 600);
    }

    #[test]
    fn clause_pause_is_shorter_than_sentence_pause() {
        let (mut machine, _) = start_fallback("wait, done", PlaybackRate::Normal);
        // 300ms budget at 340ms/word: a single tick spends it.
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(0));
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(1));
    }

    #[test]
    fn unpunctuated_words_advance_every_tick() {
        let (mut machine, _) = start_fallback("uno dos tres", PlaybackRate::Fast);
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(1));
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(2));
        machine.on_pacer_tick();
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        assert_eq!(machine.current_word_index(), None);
    }

    #[test]
    fn first_boundary_wins_arbitration() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_boundary(0);
        assert_eq!(machine.phase(), PlaybackPhase::BoundaryActive);
        assert_eq!(machine.strategy(), Some(SyncStrategy::Boundary));
        assert_eq!(machine.current_word_index(), Some(0));

        // The deadline firing afterwards must not demote the session.
        machine.on_arbitration_elapsed();
        assert_eq!(machine.phase(), PlaybackPhase::BoundaryActive);
    }

    #[test]
    fn deadline_commits_to_fallback() {
        let mut machine = start_arbitrating("The cat sat");
        let effects = machine.on_arbitration_elapsed();
        assert_eq!(machine.phase(), PlaybackPhase::FallbackActive);
        assert_eq!(machine.current_word_index(), Some(0));
        assert!(effects
            .iter()
            .any(|effect| matches!(effect, PlaybackEffect::StartPacer(_))));
    }

    #[test]
    fn boundary_after_fallback_won_is_ignored() {
        let mut machine = start_arbitrating("The cat sat on the mat");
        machine.on_arbitration_elapsed();
        machine.on_pacer_tick();
        let index_before = machine.current_word_index();
        machine.on_boundary(20);
        assert_eq!(machine.current_word_index(), index_before);
        assert_eq!(machine.strategy(), Some(SyncStrategy::Fallback));
    }

    #[test]
    fn boundary_offsets_track_words() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_boundary(0);
        machine.on_boundary(4);
        assert_eq!(machine.current_word_index(), Some(1));
        machine.on_boundary(8);
        assert_eq!(machine.current_word_index(), Some(2));
    }

    #[test]
    fn pacer_tick_outside_fallback_is_dropped() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_boundary(0);
        machine.on_pacer_tick();
        assert_eq!(machine.current_word_index(), Some(0));
        assert_eq!(machine.phase(), PlaybackPhase::BoundaryActive);
    }

    #[test]
    fn speech_ended_returns_to_idle() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_boundary(0);
        let effects = machine.on_speech_ended();
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        assert_eq!(machine.current_word_index(), None);
        assert!(!machine.is_speaking());
        assert_eq!(effects, vec![PlaybackEffect::StopPacer]);
    }

    #[test]
    fn stop_clears_state_and_suppresses_errors_during_grace() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_boundary(4);
        let effects = machine.stop();
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        assert_eq!(machine.current_word_index(), None);
        assert!(!machine.is_speaking());
        assert!(effects.contains(&PlaybackEffect::CancelSpeech));
        assert!(effects.contains(&PlaybackEffect::ArmStopGrace(Duration::from_millis(120))));

        // The engine's delayed "interrupted" echo is discarded.
        machine.on_speech_error(SpeechErrorKind::Interrupted);
        assert_eq!(machine.error(), None);
        assert_eq!(machine.view().error, None);
    }

    #[test]
    fn errors_report_again_after_grace_elapses() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_boundary(0);
        machine.stop();
        machine.on_speech_error(SpeechErrorKind::Interrupted);
        assert_eq!(machine.error(), None);

        machine.on_grace_elapsed();
        machine.on_speech_error(SpeechErrorKind::SynthesisFailed);
        assert_eq!(machine.error(), Some(SpeechErrorKind::SynthesisFailed));
    }

    #[test]
    fn driver_error_surfaces_message_and_goes_idle() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_boundary(0);
        let effects = machine.on_speech_error(SpeechErrorKind::VoiceUnavailable);
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        assert_eq!(machine.current_word_index(), None);
        assert_eq!(
            machine.view().error,
            Some(SpeechErrorKind::VoiceUnavailable.user_message())
        );
        assert!(effects.contains(&PlaybackEffect::CancelSpeech));
    }

    #[test]
    fn late_error_without_a_stop_still_surfaces() {
        // Fallback pacing can finish while the engine is still speaking; a
        // failure reported afterwards was not user-inflicted and must show.
        let (mut machine, _) = start_fallback("uno dos", PlaybackRate::Fast);
        machine.on_pacer_tick();
        machine.on_pacer_tick();
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        machine.on_speech_error(SpeechErrorKind::Network);
        assert_eq!(machine.error(), Some(SpeechErrorKind::Network));
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let mut machine = start_arbitrating("The cat sat");
        machine.on_speech_ended();
        assert!(machine.stop().is_empty());
    }

    #[test]
    fn fallback_completion_does_not_cancel_speech() {
        let (mut machine, _) = start_fallback("uno dos", PlaybackRate::Fast);
        machine.on_pacer_tick();
        let effects = machine.on_pacer_tick();
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        assert!(!effects.contains(&PlaybackEffect::CancelSpeech));
        // The engine's own end callback arriving later changes nothing.
        assert!(machine.on_speech_ended().is_empty());
    }

    #[test]
    fn single_word_story_completes_after_one_tick() {
        let (mut machine, _) = start_fallback("Hola", PlaybackRate::Normal);
        assert_eq!(machine.current_word_index(), Some(0));
        machine.on_pacer_tick();
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        assert_eq!(machine.current_word_index(), None);
    }
}
