//! The playback coordinator.
//!
//! Owns the speech driver, the playback state machine, and every timer a
//! session needs. All driver callbacks and timer firings funnel through one
//! lock-guarded application point tagged with a session epoch; anything
//! scheduled by a previous session is dropped there. The presentation
//! layer observes sessions only through the published `PlaybackView`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use tale_core::model::Story;
use tale_core::playback::{
    PlaybackEffect, PlaybackMachine, PlaybackPhase, PlaybackRate, PlaybackTuning, PlaybackView,
};

use crate::speech::{DriverEvent, SpeechDriver, UtteranceRequest};

struct CoordinatorState {
    machine: Option<PlaybackMachine>,
    epoch: u64,
}

struct PlaybackShared {
    driver: Arc<dyn SpeechDriver>,
    tuning: PlaybackTuning,
    language: String,
    state: Mutex<CoordinatorState>,
    view: watch::Sender<PlaybackView>,
}

/// Serializes all access to the process-wide speech engine and publishes
/// the authoritative word highlight.
///
/// Cheap to clone; clones share the same session. Must be used from within
/// a tokio runtime, since playback schedules timer tasks.
#[derive(Clone)]
pub struct PlaybackService {
    shared: Arc<PlaybackShared>,
}

impl PlaybackService {
    #[must_use]
    pub fn new(driver: Arc<dyn SpeechDriver>) -> Self {
        Self::with_settings(driver, PlaybackTuning::default(), "en")
    }

    #[must_use]
    pub fn with_settings(
        driver: Arc<dyn SpeechDriver>,
        tuning: PlaybackTuning,
        language: impl Into<String>,
    ) -> Self {
        let (view, _) = watch::channel(PlaybackView::default());
        Self {
            shared: Arc::new(PlaybackShared {
                driver,
                tuning,
                language: language.into(),
                state: Mutex::new(CoordinatorState {
                    machine: None,
                    epoch: 0,
                }),
                view,
            }),
        }
    }

    /// Subscribe to view updates. The receiver is read-only by construction.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackView> {
        self.shared.view.subscribe()
    }

    /// Current snapshot of the session.
    #[must_use]
    pub fn view(&self) -> PlaybackView {
        *self.shared.view.borrow()
    }

    /// Start speaking `story` at the given rate.
    ///
    /// Any session already in flight is cancelled first (its timers become
    /// stale through the epoch bump and its utterance is cancelled), so two
    /// sessions can never race to write the word index.
    pub fn play(&self, story: &Story, rate: PlaybackRate) {
        let capabilities = self.shared.driver.capabilities();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let (epoch, effects, view, had_session) = {
            let mut state = self.lock_state();
            let had_session = state.machine.is_some();
            state.epoch += 1;
            let (machine, effects) = PlaybackMachine::start(
                story.words().to_vec(),
                rate,
                self.shared.tuning,
                capabilities.boundary_events_reliable,
            );
            let view = machine.view();
            state.machine = Some(machine);
            (state.epoch, effects, view, had_session)
        };

        log::debug!(
            "playback: session {epoch} starting ({} words, rate {})",
            story.word_count(),
            rate.as_str()
        );
        if had_session {
            self.shared.driver.cancel();
        }
        self.shared.view.send_replace(view);
        self.shared.driver.speak(
            UtteranceRequest {
                text: story.text().to_string(),
                language: self.shared.language.clone(),
                rate_multiplier: rate.multiplier(),
            },
            events_tx,
        );
        self.spawn_event_pump(epoch, events_rx);
        self.run_effects(epoch, effects);
    }

    /// Stop the current session.
    ///
    /// Synchronous from the caller's perspective: the index is cleared and
    /// the idle view published before this returns. The engine's own
    /// cancellation stays asynchronous; its error echo lands inside the
    /// grace window and is discarded.
    pub fn stop(&self) {
        let (epoch, effects, view) = {
            let mut state = self.lock_state();
            let epoch = state.epoch;
            let Some(machine) = state.machine.as_mut() else {
                return;
            };
            let effects = machine.stop();
            if effects.is_empty() {
                return;
            }
            (epoch, effects, machine.view())
        };

        log::debug!("playback: session {epoch} stopped by user");
        self.shared.view.send_replace(view);
        self.run_effects(epoch, effects);
    }

    /// Apply one event to the current session if `epoch` is still live.
    ///
    /// Returns the phase after application, or `None` for a stale session.
    fn apply(
        &self,
        epoch: u64,
        event: impl FnOnce(&mut PlaybackMachine) -> Vec<PlaybackEffect>,
    ) -> Option<PlaybackPhase> {
        let (effects, phase, view) = {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                return None;
            }
            let machine = state.machine.as_mut()?;
            let effects = event(machine);
            (effects, machine.phase(), machine.view())
        };
        self.shared.view.send_replace(view);
        self.run_effects(epoch, effects);
        Some(phase)
    }

    fn run_effects(&self, epoch: u64, effects: Vec<PlaybackEffect>) {
        for effect in effects {
            match effect {
                PlaybackEffect::ArmArbitration(window) => self.spawn_arbitration(epoch, window),
                PlaybackEffect::StartPacer(interval) => self.spawn_pacer(epoch, interval),
                // The pacer loop watches the phase itself and winds down.
                PlaybackEffect::StopPacer => {}
                PlaybackEffect::CancelSpeech => self.shared.driver.cancel(),
                PlaybackEffect::ArmStopGrace(window) => self.spawn_grace(epoch, window),
            }
        }
    }

    fn spawn_event_pump(&self, epoch: u64, mut events: mpsc::UnboundedReceiver<DriverEvent>) {
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let applied = service.apply(epoch, |machine| match event {
                    DriverEvent::Boundary { char_index } => machine.on_boundary(char_index),
                    DriverEvent::Ended => machine.on_speech_ended(),
                    DriverEvent::Failed(kind) => {
                        log::warn!("playback: speech driver reported {kind}");
                        machine.on_speech_error(kind)
                    }
                });
                if applied.is_none() {
                    break;
                }
            }
        });
    }

    fn spawn_arbitration(&self, epoch: u64, window: Duration) {
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let phase = service.apply(epoch, PlaybackMachine::on_arbitration_elapsed);
            if phase == Some(PlaybackPhase::FallbackActive) {
                log::debug!("playback: no boundary events within the arbitration window, pacing by timer");
            }
        });
    }

    fn spawn_pacer(&self, epoch: u64, interval: Duration) {
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match service.apply(epoch, PlaybackMachine::on_pacer_tick) {
                    Some(PlaybackPhase::FallbackActive) => {}
                    // Stale epoch, stopped, errored, or ran off the last word.
                    _ => break,
                }
            }
        });
    }

    fn spawn_grace(&self, epoch: u64, window: Duration) {
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            service.apply(epoch, PlaybackMachine::on_grace_elapsed);
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.shared
            .state
            .lock()
            .expect("playback state lock poisoned")
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{ScriptedSpeechDriver, SimulatedSpeechDriver};

    fn story(text: &str) -> Story {
        Story::new(text).unwrap()
    }

    async fn wait_for(
        rx: &mut watch::Receiver<PlaybackView>,
        predicate: impl FnMut(&PlaybackView) -> bool,
    ) -> PlaybackView {
        let view = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(predicate))
            .await
            .expect("view did not reach the expected state")
            .expect("view channel closed");
        *view
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_driven_session_highlights_and_completes() {
        let driver = Arc::new(ScriptedSpeechDriver::new(vec![
            (Duration::from_millis(20), DriverEvent::Boundary { char_index: 0 }),
            (Duration::from_millis(350), DriverEvent::Boundary { char_index: 4 }),
            (Duration::from_millis(700), DriverEvent::Boundary { char_index: 8 }),
            (Duration::from_millis(1000), DriverEvent::Ended),
        ]));
        let service = PlaybackService::new(driver);
        let mut rx = service.subscribe();

        service.play(&story("The cat sat"), PlaybackRate::Normal);
        assert!(service.view().is_speaking);

        wait_for(&mut rx, |view| view.current_word_index == Some(2)).await;
        let done = wait_for(&mut rx, |view| !view.is_speaking).await;
        assert_eq!(done.current_word_index, None);
        assert_eq!(done.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_driver_falls_back_and_finishes_on_its_own() {
        // The driver never says anything: arbitration must hand the session
        // to the pacing timer, which walks the whole story and goes idle.
        let driver = Arc::new(ScriptedSpeechDriver::new(Vec::new()));
        let service = PlaybackService::new(driver);
        let mut rx = service.subscribe();

        service.play(&story("uno dos tres"), PlaybackRate::Normal);
        wait_for(&mut rx, |view| view.current_word_index == Some(2)).await;
        let done = wait_for(&mut rx, |view| !view.is_speaking).await;
        assert_eq!(done.current_word_index, None);
        assert_eq!(done.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unreliable_driver_skips_arbitration() {
        let driver = Arc::new(SimulatedSpeechDriver::new(300).without_boundary_events());
        let service = PlaybackService::new(driver);

        service.play(&story("uno dos tres"), PlaybackRate::Fast);
        // No waiting: fallback began inside play() and word 0 is lit.
        let view = service.view();
        assert_eq!(view.current_word_index, Some(0));
        assert!(view.is_speaking);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clears_immediately_and_discards_the_interrupted_echo() {
        let driver = Arc::new(
            ScriptedSpeechDriver::new(vec![
                (Duration::from_millis(20), DriverEvent::Boundary { char_index: 0 }),
                (Duration::from_secs(30), DriverEvent::Ended),
            ])
            .with_interrupted_on_cancel(),
        );
        let service = PlaybackService::new(driver);
        let mut rx = service.subscribe();

        service.play(&story("The cat sat"), PlaybackRate::Normal);
        wait_for(&mut rx, |view| view.current_word_index == Some(0)).await;

        service.stop();
        // Synchronous teardown: no awaiting between stop and these asserts.
        let view = service.view();
        assert_eq!(view.current_word_index, None);
        assert!(!view.is_speaking);

        // Let the driver's Failed(Interrupted) echo arrive and the grace
        // window pass; no user-visible error may appear.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(service.view().error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_failure_surfaces_its_message() {
        let driver = Arc::new(ScriptedSpeechDriver::new(vec![(
            Duration::from_millis(50),
            DriverEvent::Failed(tale_core::playback::SpeechErrorKind::VoiceUnavailable),
        )]));
        let service = PlaybackService::new(driver);
        let mut rx = service.subscribe();

        service.play(&story("The cat sat"), PlaybackRate::Normal);
        let view = wait_for(&mut rx, |view| view.error.is_some()).await;
        assert!(!view.is_speaking);
        assert_eq!(
            view.error,
            Some(tale_core::playback::SpeechErrorKind::VoiceUnavailable.user_message())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_session_silences_the_old_one() {
        let driver = Arc::new(SimulatedSpeechDriver::new(200));
        let service = PlaybackService::new(driver);
        let mut rx = service.subscribe();

        service.play(
            &story("one two three four five six seven eight nine ten"),
            PlaybackRate::Normal,
        );
        wait_for(&mut rx, |view| view.current_word_index == Some(1)).await;

        // Replace the session mid-flight with a much shorter story.
        service.play(&story("alpha beta"), PlaybackRate::Normal);
        let done = wait_for(&mut rx, |view| !view.is_speaking).await;
        assert_eq!(done.current_word_index, None);
        assert_eq!(done.error, None);

        // If the first session's timers or callbacks were still alive they
        // would re-light the highlight; the view must stay idle.
        tokio::time::sleep(Duration::from_secs(10)).await;
        let settled = service.view();
        assert_eq!(settled.current_word_index, None);
        assert!(!settled.is_speaking);
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_session_end_to_end_with_simulated_driver() {
        let driver = Arc::new(SimulatedSpeechDriver::new(150));
        let service = PlaybackService::new(driver);
        let mut rx = service.subscribe();

        service.play(&story("El gato duerme"), PlaybackRate::Slow);
        wait_for(&mut rx, |view| view.current_word_index == Some(2)).await;
        let done = wait_for(&mut rx, |view| !view.is_speaking).await;
        assert_eq!(done.error, None);
    }
}
