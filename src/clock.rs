use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// All scheduling and deadline math is pure given a timestamp; injecting the
/// clock keeps fire-time and lockout rules testable without real timers.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
