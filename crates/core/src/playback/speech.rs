use std::fmt;

/// Failure categories a speech engine can report.
///
/// `Interrupted` covers engine-side cancellation of an utterance; when it is
/// the echo of a user-initiated stop the playback machine discards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechErrorKind {
    Interrupted,
    PermissionDenied,
    VoiceUnavailable,
    SynthesisFailed,
    Network,
    DeviceBusy,
}

impl SpeechErrorKind {
    /// The message shown to the user when this error ends a session.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            SpeechErrorKind::Interrupted => "Playback was interrupted.",
            SpeechErrorKind::PermissionDenied => {
                "Speech playback is not permitted on this device."
            }
            SpeechErrorKind::VoiceUnavailable => {
                "No voice is available for this language."
            }
            SpeechErrorKind::SynthesisFailed => "Speech playback failed.",
            SpeechErrorKind::Network => "Speech playback needs a network connection.",
            SpeechErrorKind::DeviceBusy => "The speech device is busy. Try again in a moment.",
        }
    }
}

impl fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpeechErrorKind::Interrupted => "interrupted",
            SpeechErrorKind::PermissionDenied => "permission-denied",
            SpeechErrorKind::VoiceUnavailable => "voice-unavailable",
            SpeechErrorKind::SynthesisFailed => "synthesis-failed",
            SpeechErrorKind::Network => "network",
            SpeechErrorKind::DeviceBusy => "device-busy",
        };
        f.write_str(name)
    }
}
