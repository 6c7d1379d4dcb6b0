use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;

/// Recent-usage query for foreground-application identity.
pub trait UsageQuery: Send + Sync {
    /// Identifier of the application most recently foregrounded strictly
    /// after `window_start`, or `None` when no qualifying sample exists.
    fn most_recent_foreground_app(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> anyhow::Result<Option<String>>;
}

/// Cadence and sampling window of the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Delay between ticks
    pub poll_interval: Duration,
    /// Trailing window handed to the usage query on each sample
    pub sample_window: chrono::Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            sample_window: chrono::Duration::milliseconds(2000),
        }
    }
}

/// Samples foreground-application identity at a fixed cadence and signals
/// whenever a locked application surfaces.
pub struct ForegroundMonitor {
    usage: Arc<dyn UsageQuery>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
}

impl ForegroundMonitor {
    pub fn with_config(
        usage: Arc<dyn UsageQuery>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            usage,
            clock,
            config,
        }
    }

    /// Sample the currently foregrounded application over the trailing window.
    ///
    /// A failed query counts as "no foreground app known this tick": the
    /// error is logged and swallowed so one bad sample never ends a session.
    pub fn sample_foreground_app(&self) -> Option<String> {
        self.sample_at(self.clock.now())
    }

    fn sample_at(&self, now: DateTime<Utc>) -> Option<String> {
        match self
            .usage
            .most_recent_foreground_app(now - self.config.sample_window, now)
        {
            Ok(app) => app,
            Err(e) => {
                debug!("Foreground sample failed: {:#}", e);
                None
            }
        }
    }

    /// Cooperative poll loop until `deadline` or cancellation.
    ///
    /// Each tick first checks the deadline (inclusive stop: at `now ==
    /// deadline` the loop ends without sampling again), then samples, and
    /// invokes `on_block` whenever the sampled app is a member of `locked`.
    /// `on_block` fires on every such tick while the locked app stays in the
    /// foreground; the block surface is expected to be re-presentable.
    pub async fn poll<F>(
        &self,
        locked: &BTreeSet<String>,
        deadline: DateTime<Utc>,
        cancel: CancellationToken,
        mut on_block: F,
    ) where
        F: FnMut(DateTime<Utc>),
    {
        loop {
            let now = self.clock.now();
            if now >= deadline {
                debug!("Lockout deadline reached");
                break;
            }

            if let Some(app) = self.sample_at(now) {
                if locked.contains(&app) {
                    debug!("Locked app in foreground: {}", app);
                    on_block(deadline);
                }
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval) => {}
                _ = cancel.cancelled() => {
                    debug!("Poll loop cancelled");
                    break;
                }
            }
        }
    }
}
