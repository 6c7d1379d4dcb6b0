use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::lockout::monitor::{ForegroundMonitor, MonitorConfig, UsageQuery};
use crate::lockout::window::{TriggerKind, unlock_deadline};
use crate::settings::SettingsStore;

/// Blocking overlay surfaced while a locked application is foregrounded.
///
/// Presentation is fire-and-forget and must be repeat-safe: the monitor
/// re-invokes it on every tick the locked app stays in front.
pub trait LockScreenPresenter: Send + Sync {
    fn present(&self, unlock_deadline: DateTime<Utc>);
}

/// Handle to the monitoring task of the one active lockout session.
struct ActiveSession {
    kind: TriggerKind,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Orchestrates one lockout session end-to-end.
///
/// At most one session is active at a time: starting a new one cancels and
/// replaces any running monitor task (last writer wins). The spawned task
/// races the poll loop against a hard-stop sleep for the full window, so the
/// session terminates at the deadline even if the loop itself misbehaves.
pub struct LockoutSessionManager {
    store: Arc<dyn SettingsStore>,
    usage: Arc<dyn UsageQuery>,
    presenter: Arc<dyn LockScreenPresenter>,
    clock: Arc<dyn Clock>,
    monitor_config: MonitorConfig,
    active: Mutex<Option<ActiveSession>>,
    running: Arc<AtomicBool>,
}

impl LockoutSessionManager {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        usage: Arc<dyn UsageQuery>,
        presenter: Arc<dyn LockScreenPresenter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_monitor_config(store, usage, presenter, clock, MonitorConfig::default())
    }

    pub fn with_monitor_config(
        store: Arc<dyn SettingsStore>,
        usage: Arc<dyn UsageQuery>,
        presenter: Arc<dyn LockScreenPresenter>,
        clock: Arc<dyn Clock>,
        monitor_config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            usage,
            presenter,
            clock,
            monitor_config,
            active: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a lockout session for a fired trigger, returning its deadline.
    ///
    /// Reads a fresh settings snapshot, so the locked set and the deadline
    /// reflect the settings at fire time and stay fixed for the whole window.
    pub async fn start(&self, kind: TriggerKind) -> Result<DateTime<Utc>> {
        let settings = self
            .store
            .read()
            .context("Failed to read settings for lockout session")?;

        let now = self.clock.now();
        let deadline = unlock_deadline(kind, &now.with_timezone(&Local), &settings)
            .with_timezone(&Utc);
        let locked = settings.locked_packages.clone();

        info!(
            "Starting {:?} lockout of {} apps until {}",
            kind,
            locked.len(),
            deadline.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );

        // At-most-one-active: the previous monitor task is cancelled and
        // awaited before the replacement is spawned.
        self.stop().await;

        let cancel = CancellationToken::new();
        let monitor = ForegroundMonitor::with_config(
            self.usage.clone(),
            self.clock.clone(),
            self.monitor_config,
        );
        let presenter = self.presenter.clone();
        let running = self.running.clone();
        let hard_stop = (deadline - now).to_std().unwrap_or_default();
        let task_cancel = cancel.clone();

        running.store(true, Ordering::SeqCst);
        let task = tokio::spawn(async move {
            let poll = monitor.poll(&locked, deadline, task_cancel.clone(), |until| {
                presenter.present(until)
            });

            tokio::select! {
                _ = poll => {
                    debug!("Monitor loop ended at its deadline");
                }
                _ = sleep(hard_stop) => {
                    debug!("Hard stop timer fired");
                    task_cancel.cancel();
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("{:?} lockout session ended", kind);
        });

        *self.active.lock().await = Some(ActiveSession { kind, cancel, task });
        Ok(deadline)
    }

    /// Cancel any running session and wait for its task to wind down.
    ///
    /// Idempotent: safe to call when idle and after the session already ended
    /// on its own.
    pub async fn stop(&self) {
        let prior = self.active.lock().await.take();
        if let Some(session) = prior {
            session.cancel.cancel();
            if let Err(e) = session.task.await {
                if !e.is_cancelled() {
                    warn!("Lockout monitor task failed: {}", e);
                }
            }
            self.running.store(false, Ordering::SeqCst);
            debug!("{:?} lockout session stopped", session.kind);
        }
    }

    /// Externally visible "lockout active" indicator.
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
