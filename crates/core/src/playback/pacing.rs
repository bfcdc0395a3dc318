use std::time::Duration;

/// Playback speed selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackRate {
    Slow,
    Normal,
    Fast,
}

impl PlaybackRate {
    pub const ALL: [PlaybackRate; 3] = [PlaybackRate::Slow, PlaybackRate::Normal, PlaybackRate::Fast];

    /// Speed multiplier handed to the speech engine.
    #[must_use]
    pub fn multiplier(self) -> f32 {
        match self {
            PlaybackRate::Slow => 0.5,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::Fast => 1.5,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackRate::Slow => "slow",
            PlaybackRate::Normal => "normal",
            PlaybackRate::Fast => "fast",
        }
    }
}

/// Timer calibration for fallback pacing, derived from the playback rate.
///
/// `ms_per_word` drives the recurring tick; the pause values are budgets
/// spent while the highlight dwells on a word that closes a sentence or a
/// clause. Slower rates get both a larger per-word delay and larger pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingProfile {
    ms_per_word: u64,
    sentence_pause_ms: u64,
    comma_pause_ms: u64,
}

impl PacingProfile {
    #[must_use]
    pub fn for_rate(rate: PlaybackRate) -> Self {
        let multiplier = rate.multiplier();
        if multiplier <= 0.6 {
            Self {
                ms_per_word: 420,
                sentence_pause_ms: 900,
                comma_pause_ms: 450,
            }
        } else if multiplier < 1.1 {
            Self {
                ms_per_word: 340,
                sentence_pause_ms: 600,
                comma_pause_ms: 300,
            }
        } else {
            Self {
                ms_per_word: 150,
                sentence_pause_ms: 300,
                comma_pause_ms: 150,
            }
        }
    }

    #[must_use]
    pub fn ms_per_word(&self) -> u64 {
        self.ms_per_word
    }

    #[must_use]
    pub fn sentence_pause_ms(&self) -> u64 {
        self.sentence_pause_ms
    }

    #[must_use]
    pub fn comma_pause_ms(&self) -> u64 {
        self.comma_pause_ms
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.ms_per_word)
    }

    /// Pause budget earned by dwelling on `word`, based on its trailing
    /// punctuation. Closing quotes and brackets are looked through.
    #[must_use]
    pub fn pause_after_ms(&self, word: &str) -> u64 {
        let last_meaningful = word
            .chars()
            .rev()
            .find(|c| !matches!(c, '"' | '\'' | '\u{201d}' | '\u{2019}' | ')' | ']'));
        match last_meaningful {
            Some('.' | '!' | '?') => self.sentence_pause_ms,
            Some(',' | ';' | ':') => self.comma_pause_ms,
            _ => 0,
        }
    }
}
