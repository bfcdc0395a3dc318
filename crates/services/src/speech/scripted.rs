use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};

use tale_core::playback::SpeechErrorKind;

use crate::speech::{DriverCapabilities, DriverEvent, SpeechDriver, UtteranceRequest};

#[derive(Default)]
struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Test double that replays a fixed event schedule.
///
/// Each entry is (time since `speak`, event). An empty schedule models an
/// engine that goes silent, which is exactly what arbitration has to cope
/// with. With `interrupted_on_cancel`, cancellation promptly emits
/// `Failed(Interrupted)` the way real engines echo a cancel, which is the
/// input the stop-grace window exists for.
pub struct ScriptedSpeechDriver {
    schedule: Vec<(Duration, DriverEvent)>,
    capabilities: DriverCapabilities,
    interrupted_on_cancel: bool,
    active: Mutex<Option<Arc<CancelFlag>>>,
}

impl ScriptedSpeechDriver {
    #[must_use]
    pub fn new(schedule: Vec<(Duration, DriverEvent)>) -> Self {
        Self {
            schedule,
            capabilities: DriverCapabilities {
                boundary_events_reliable: true,
            },
            interrupted_on_cancel: false,
            active: Mutex::new(None),
        }
    }

    /// Advertise unreliable boundary events.
    #[must_use]
    pub fn without_boundary_events(mut self) -> Self {
        self.capabilities.boundary_events_reliable = false;
        self
    }

    /// Echo `Failed(Interrupted)` when an utterance is cancelled.
    #[must_use]
    pub fn with_interrupted_on_cancel(mut self) -> Self {
        self.interrupted_on_cancel = true;
        self
    }
}

impl SpeechDriver for ScriptedSpeechDriver {
    fn capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    fn speak(&self, _request: UtteranceRequest, events: mpsc::UnboundedSender<DriverEvent>) {
        let flag = Arc::new(CancelFlag::default());
        if let Ok(mut active) = self.active.lock() {
            *active = Some(Arc::clone(&flag));
        }

        let schedule = self.schedule.clone();
        let interrupted_on_cancel = self.interrupted_on_cancel;
        tokio::spawn(async move {
            let mut elapsed = Duration::ZERO;
            for (at, event) in schedule {
                let wait = at.saturating_sub(elapsed);
                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    () = flag.notify.notified() => {}
                }
                if flag.cancelled.load(Ordering::SeqCst) {
                    if interrupted_on_cancel {
                        let _ = events.send(DriverEvent::Failed(SpeechErrorKind::Interrupted));
                    }
                    return;
                }
                elapsed = at;
                let _ = events.send(event);
            }
        });
    }

    fn cancel(&self) {
        let flag = match self.active.lock() {
            Ok(mut active) => active.take(),
            Err(_) => None,
        };
        if let Some(flag) = flag {
            flag.cancelled.store(true, Ordering::SeqCst);
            flag.notify.notify_waiters();
        }
    }
}
