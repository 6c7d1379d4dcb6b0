use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::schedule::time_calc::next_fire_time;
use crate::settings::{AlarmSettings, SettingsStore};

/// Stable registration ids for the two recurring wake events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmId {
    Morning,
    Nightly,
}

/// External one-shot wake-up facility.
///
/// Arming an already-armed id overwrites the pending registration; cancelling
/// an id that is not armed is a no-op. A registration exists only between arm
/// and fire/cancel. Armed wake-ups must fire through device idle states,
/// which is why arming is gated on the exact-scheduling capability.
pub trait WakeupFacility: Send + Sync {
    fn arm(&self, id: AlarmId, at: DateTime<Utc>);

    fn cancel_if_armed(&self, id: AlarmId);

    /// Fire time of the pending registration, if one exists.
    fn armed_at(&self, id: AlarmId) -> Option<DateTime<Utc>>;

    fn has_exact_scheduling_capability(&self) -> bool;
}

/// Owns the cancel/(re)arm protocol for the morning and nightly wake events.
///
/// The facility is one-shot, so every fire handler must call `rearm` to
/// restore recurrence; startup does the same to recover after a crash or
/// reboot. A missed rearm silently ends future alarms until the next startup.
pub struct ScheduleController {
    store: Arc<dyn SettingsStore>,
    facility: Arc<dyn WakeupFacility>,
    clock: Arc<dyn Clock>,
}

impl ScheduleController {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        facility: Arc<dyn WakeupFacility>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            facility,
            clock,
        }
    }

    /// Cancel both wake events and arm the next occurrences for `settings`.
    ///
    /// Idempotent: calling twice with the same settings leaves the same two
    /// (id, fire time) registrations as calling once. Without the
    /// exact-scheduling capability this degrades to cancel-only rather than
    /// failing.
    pub fn rearm(&self, settings: &AlarmSettings) {
        self.cancel_event(AlarmId::Morning);
        self.cancel_event(AlarmId::Nightly);

        if !settings.enabled {
            info!("Alarm disabled, no wake-ups armed");
            return;
        }

        if !self.facility.has_exact_scheduling_capability() {
            warn!("Exact scheduling capability not granted, leaving wake-ups unarmed");
            return;
        }

        let now = self.clock.now().with_timezone(&Local);

        let morning = next_fire_time(&now, settings.alarm_hour, settings.alarm_minute);
        self.facility
            .arm(AlarmId::Morning, morning.with_timezone(&Utc));
        info!(
            "Morning alarm armed for {}",
            morning.format("%Y-%m-%d %H:%M")
        );

        if settings.nightly_enabled {
            let nightly = next_fire_time(&now, settings.nightly_hour, settings.nightly_minute);
            self.facility
                .arm(AlarmId::Nightly, nightly.with_timezone(&Utc));
            info!(
                "Nightly lockout armed for {}",
                nightly.format("%Y-%m-%d %H:%M")
            );
        }
    }

    /// Rearm from the latest persisted snapshot.
    ///
    /// Called from every fire handler and at startup (the boot recovery path).
    pub fn rearm_from_store(&self) -> Result<()> {
        let settings = self
            .store
            .read()
            .context("Failed to read settings for rearm")?;
        self.rearm(&settings);
        Ok(())
    }

    /// Toggle the persisted enabled flag, then rearm or cancel accordingly.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut settings = self.store.read().context("Failed to read settings")?;
        settings.enabled = enabled;
        self.store
            .write(&settings)
            .context("Failed to persist settings")?;
        self.rearm(&settings);
        Ok(())
    }

    fn cancel_event(&self, id: AlarmId) {
        // Query first: cancelling is only meaningful for an existing
        // registration, and absence is not an error.
        if self.facility.armed_at(id).is_some() {
            self.facility.cancel_if_armed(id);
            debug!("Cancelled pending {:?} wake-up", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct FakeFacility {
        armed: Mutex<HashMap<AlarmId, DateTime<Utc>>>,
        capability: bool,
        cancels: Mutex<Vec<AlarmId>>,
    }

    impl FakeFacility {
        fn granted() -> Self {
            Self {
                capability: true,
                ..Default::default()
            }
        }

        fn snapshot(&self) -> HashMap<AlarmId, DateTime<Utc>> {
            self.armed.lock().unwrap().clone()
        }
    }

    impl WakeupFacility for FakeFacility {
        fn arm(&self, id: AlarmId, at: DateTime<Utc>) {
            self.armed.lock().unwrap().insert(id, at);
        }

        fn cancel_if_armed(&self, id: AlarmId) {
            self.armed.lock().unwrap().remove(&id);
            self.cancels.lock().unwrap().push(id);
        }

        fn armed_at(&self, id: AlarmId) -> Option<DateTime<Utc>> {
            self.armed.lock().unwrap().get(&id).copied()
        }

        fn has_exact_scheduling_capability(&self) -> bool {
            self.capability
        }
    }

    fn make_controller(
        settings: AlarmSettings,
        facility: Arc<FakeFacility>,
    ) -> ScheduleController {
        let clock = FixedClock("2026-03-10T12:00:00Z".parse().unwrap());
        ScheduleController::new(
            Arc::new(MemorySettingsStore::new(settings)),
            facility,
            Arc::new(clock),
        )
    }

    fn enabled_settings() -> AlarmSettings {
        AlarmSettings {
            enabled: true,
            nightly_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_rearm_arms_both_events_when_enabled() {
        let facility = Arc::new(FakeFacility::granted());
        let controller = make_controller(enabled_settings(), facility.clone());

        controller.rearm(&enabled_settings());

        let armed = facility.snapshot();
        assert_eq!(armed.len(), 2);
        assert!(armed.contains_key(&AlarmId::Morning));
        assert!(armed.contains_key(&AlarmId::Nightly));

        let now: DateTime<Utc> = "2026-03-10T12:00:00Z".parse().unwrap();
        for at in armed.values() {
            assert!(*at > now);
        }
    }

    #[test]
    fn test_rearm_skips_nightly_when_disabled() {
        let facility = Arc::new(FakeFacility::granted());
        let settings = AlarmSettings {
            enabled: true,
            nightly_enabled: false,
            ..Default::default()
        };
        let controller = make_controller(settings.clone(), facility.clone());

        controller.rearm(&settings);

        let armed = facility.snapshot();
        assert_eq!(armed.len(), 1);
        assert!(armed.contains_key(&AlarmId::Morning));
    }

    #[test]
    fn test_rearm_is_idempotent() {
        let facility = Arc::new(FakeFacility::granted());
        let controller = make_controller(enabled_settings(), facility.clone());

        controller.rearm(&enabled_settings());
        let first = facility.snapshot();

        controller.rearm(&enabled_settings());
        let second = facility.snapshot();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rearm_cancels_everything_when_alarm_disabled() {
        let facility = Arc::new(FakeFacility::granted());
        let controller = make_controller(enabled_settings(), facility.clone());

        controller.rearm(&enabled_settings());
        assert_eq!(facility.snapshot().len(), 2);

        let disabled = AlarmSettings {
            enabled: false,
            ..enabled_settings()
        };
        controller.rearm(&disabled);
        assert!(facility.snapshot().is_empty());
    }

    #[test]
    fn test_rearm_degrades_to_noop_without_capability() {
        let facility = Arc::new(FakeFacility::default());
        let controller = make_controller(enabled_settings(), facility.clone());

        controller.rearm(&enabled_settings());
        assert!(facility.snapshot().is_empty());
    }

    #[test]
    fn test_cancel_only_issued_for_armed_events() {
        let facility = Arc::new(FakeFacility::granted());
        let controller = make_controller(enabled_settings(), facility.clone());

        // Nothing armed yet, so the first rearm must not issue any cancels
        controller.rearm(&enabled_settings());
        assert!(facility.cancels.lock().unwrap().is_empty());

        // Second rearm finds both registrations and cancels them first
        controller.rearm(&enabled_settings());
        assert_eq!(facility.cancels.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_set_enabled_persists_and_arms() {
        let facility = Arc::new(FakeFacility::granted());
        let store = Arc::new(MemorySettingsStore::new(AlarmSettings::default()));
        let clock = FixedClock("2026-03-10T12:00:00Z".parse().unwrap());
        let controller =
            ScheduleController::new(store.clone(), facility.clone(), Arc::new(clock));

        controller.set_enabled(true).unwrap();
        assert!(store.read().unwrap().enabled);
        assert!(facility.armed_at(AlarmId::Morning).is_some());

        controller.set_enabled(false).unwrap();
        assert!(!store.read().unwrap().enabled);
        assert!(facility.armed_at(AlarmId::Morning).is_none());
    }
}
