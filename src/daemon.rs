use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clock::SystemClock;
use crate::lockout::{LockoutSessionManager, TriggerKind};
use crate::platform::foreground::SystemUsageQuery;
use crate::platform::notify::{self, NotifyPresenter};
use crate::schedule::{AlarmId, ScheduleController, WakeupFacility};
use crate::settings::SettingsStore;
use crate::wakeup::TimerWakeups;

/// Run the wakeguard daemon until interrupted.
///
/// Startup rearms from the persisted settings, which is also the reboot
/// recovery path: a fire missed while the process was down is rescheduled for
/// its next occurrence rather than replayed.
pub async fn run_daemon(store: Arc<dyn SettingsStore>) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let (fire_tx, mut fires) = mpsc::unbounded_channel();
    let facility = Arc::new(TimerWakeups::new(fire_tx));

    let controller = ScheduleController::new(store.clone(), facility.clone(), clock.clone());
    let sessions = LockoutSessionManager::new(
        store.clone(),
        Arc::new(SystemUsageQuery),
        Arc::new(NotifyPresenter),
        clock,
    );

    let settings = store.read().context("Failed to read settings")?;
    if !store.onboarding_done().unwrap_or(false) {
        warn!("Setup incomplete: run 'wakeguard set' to configure the alarm");
    }
    controller.rearm(&settings);

    info!("Daemon running, press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(kind) = fires.recv() => {
                handle_fire(kind, &controller, &sessions).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    sessions.stop().await;
    facility.cancel_if_armed(AlarmId::Morning);
    facility.cancel_if_armed(AlarmId::Nightly);

    Ok(())
}

/// Handle one wake-up fire: restore recurrence, then start the lockout.
async fn handle_fire(
    kind: TriggerKind,
    controller: &ScheduleController,
    sessions: &LockoutSessionManager,
) {
    info!("{:?} wake-up fired", kind);

    // The facility is one-shot; rearming here is the only recurrence
    // mechanism
    if let Err(e) = controller.rearm_from_store() {
        error!("Failed to rearm after fire: {:#}", e);
    }

    if kind == TriggerKind::Morning {
        if let Err(e) = notify::send_notification(
            "Morning focus",
            "Good morning! Your focus apps are locked.",
        ) {
            warn!("Failed to send alarm notification: {:#}", e);
        }
    }

    match sessions.start(kind).await {
        Ok(deadline) => info!(
            "Lockout active until {}",
            deadline.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        Err(e) => error!("Failed to start lockout session: {:#}", e),
    }
}
