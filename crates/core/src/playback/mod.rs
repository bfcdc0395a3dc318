//! Spoken-word synchronization: the playback state machine, the pacing
//! profile behind the fallback timer, and boundary-offset mapping.

mod boundary;
mod machine;
mod pacing;
mod speech;

pub use boundary::word_index_at_offset;
pub use machine::{
    PlaybackEffect, PlaybackMachine, PlaybackPhase, PlaybackTuning, PlaybackView, SyncStrategy,
};
pub use pacing::{PacingProfile, PlaybackRate};
pub use speech::SpeechErrorKind;
