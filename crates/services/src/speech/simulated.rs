use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::speech::{DriverCapabilities, DriverEvent, SpeechDriver, UtteranceRequest};

/// A speech engine stand-in that produces timing without audio.
///
/// Emits one boundary event per word on a fixed schedule (scaled by the
/// requested rate) and then `Ended`. Useful wherever no platform engine is
/// available: the terminal app's listen-along mode and integration tests.
/// Configure it as boundary-unreliable to exercise the fallback pacing
/// path end to end.
#[derive(Debug, Clone)]
pub struct SimulatedSpeechDriver {
    ms_per_word: u64,
    reliable: bool,
    // Bumped on every speak/cancel; a stale utterance task sees the change
    // and goes quiet. This is the whole cancellation mechanism.
    generation: Arc<AtomicU64>,
}

impl SimulatedSpeechDriver {
    #[must_use]
    pub fn new(ms_per_word: u64) -> Self {
        Self {
            ms_per_word,
            reliable: true,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pretend to be an engine whose boundary events cannot be trusted.
    #[must_use]
    pub fn without_boundary_events(mut self) -> Self {
        self.reliable = false;
        self
    }
}

impl SpeechDriver for SimulatedSpeechDriver {
    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            boundary_events_reliable: self.reliable,
        }
    }

    fn speak(&self, request: UtteranceRequest, events: mpsc::UnboundedSender<DriverEvent>) {
        let generation = Arc::clone(&self.generation);
        let utterance = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let reliable = self.reliable;
        let step = word_delay(self.ms_per_word, request.rate_multiplier);

        tokio::spawn(async move {
            let mut char_index = 0usize;
            for word in request.text.split_whitespace() {
                if generation.load(Ordering::SeqCst) != utterance {
                    return;
                }
                if reliable {
                    let _ = events.send(DriverEvent::Boundary { char_index });
                }
                char_index += word.chars().count() + 1;
                tokio::time::sleep(step).await;
            }
            if generation.load(Ordering::SeqCst) == utterance {
                let _ = events.send(DriverEvent::Ended);
            }
        });
    }

    fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

fn word_delay(ms_per_word: u64, rate_multiplier: f32) -> Duration {
    let multiplier = if rate_multiplier > 0.0 { rate_multiplier } else { 1.0 };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ms = (ms_per_word as f32 / multiplier).round() as u64;
    Duration::from_millis(ms.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_one_boundary_per_word_then_ends() {
        let driver = SimulatedSpeechDriver::new(100);
        let (tx, mut rx) = mpsc::unbounded_channel();
        driver.speak(
            UtteranceRequest {
                text: "The cat sat".into(),
                language: "en".into(),
                rate_multiplier: 1.0,
            },
            tx,
        );

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                DriverEvent::Boundary { char_index: 0 },
                DriverEvent::Boundary { char_index: 4 },
                DriverEvent::Boundary { char_index: 8 },
                DriverEvent::Ended,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_silences_the_utterance() {
        let driver = SimulatedSpeechDriver::new(100);
        let (tx, mut rx) = mpsc::unbounded_channel();
        driver.speak(
            UtteranceRequest {
                text: "uno dos tres cuatro".into(),
                language: "es".into(),
                rate_multiplier: 1.0,
            },
            tx,
        );

        // First boundary arrives, then we cancel mid-utterance.
        assert_eq!(rx.recv().await, Some(DriverEvent::Boundary { char_index: 0 }));
        driver.cancel();

        // At most one already-scheduled boundary may still slip out; the
        // channel then closes with no Ended event.
        let mut trailing = Vec::new();
        while let Some(event) = rx.recv().await {
            trailing.push(event);
        }
        assert!(trailing.len() <= 1);
        assert!(!trailing.contains(&DriverEvent::Ended));
    }

    #[test]
    fn faster_rates_shorten_the_word_delay() {
        assert!(word_delay(300, 1.5) < word_delay(300, 1.0));
        assert!(word_delay(300, 0.5) > word_delay(300, 1.0));
        assert_eq!(word_delay(300, 0.0), Duration::from_millis(300));
    }
}
