use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::lockout::TriggerKind;
use crate::schedule::{AlarmId, WakeupFacility};

struct ArmedTimer {
    at: DateTime<Utc>,
    task: JoinHandle<()>,
}

/// Tokio-backed one-shot wake-up facility.
///
/// Each armed id gets its own sleep-until task that reports the fire over the
/// daemon's trigger channel and consumes its registration. Arming an armed id
/// replaces the pending task; cancelling aborts it before it can fire.
pub struct TimerWakeups {
    fires: mpsc::UnboundedSender<TriggerKind>,
    armed: Arc<Mutex<HashMap<AlarmId, ArmedTimer>>>,
}

impl TimerWakeups {
    pub fn new(fires: mpsc::UnboundedSender<TriggerKind>) -> Self {
        Self {
            fires,
            armed: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl WakeupFacility for TimerWakeups {
    fn arm(&self, id: AlarmId, at: DateTime<Utc>) {
        let wait = (at - Utc::now()).to_std().unwrap_or_default();
        let kind = match id {
            AlarmId::Morning => TriggerKind::Morning,
            AlarmId::Nightly => TriggerKind::Nightly,
        };
        let fires = self.fires.clone();
        let registry = Arc::clone(&self.armed);

        // Hold the registry lock across spawn + insert so an already-due task
        // cannot consume its registration before it exists
        let mut armed = self.armed.lock().expect("wakeup registry poisoned");
        let task = tokio::spawn(async move {
            tokio::time::sleep(wait).await;

            // Consume the registration, unless a re-arm already replaced it
            {
                let mut armed = registry.lock().expect("wakeup registry poisoned");
                if armed.get(&id).is_some_and(|t| t.at == at) {
                    armed.remove(&id);
                }
            }

            debug!("{:?} wake-up fired", id);
            if fires.send(kind).is_err() {
                warn!("{:?} wake-up fired after the daemon stopped listening", id);
            }
        });

        if let Some(previous) = armed.insert(id, ArmedTimer { at, task }) {
            previous.task.abort();
        }
    }

    fn cancel_if_armed(&self, id: AlarmId) {
        let mut armed = self.armed.lock().expect("wakeup registry poisoned");
        if let Some(timer) = armed.remove(&id) {
            timer.task.abort();
            debug!("Cancelled pending {:?} wake-up", id);
        }
    }

    fn armed_at(&self, id: AlarmId) -> Option<DateTime<Utc>> {
        self.armed
            .lock()
            .expect("wakeup registry poisoned")
            .get(&id)
            .map(|t| t.at)
    }

    // In-process timers need no OS grant
    fn has_exact_scheduling_capability(&self) -> bool {
        true
    }
}
