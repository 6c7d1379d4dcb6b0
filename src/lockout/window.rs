use chrono::{DateTime, Duration, TimeZone};

use crate::schedule::next_fire_time;
use crate::settings::AlarmSettings;

/// Which scheduled wake event started a lockout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Morning,
    Nightly,
}

/// Absolute instant at which a lockout started at `now` unlocks.
///
/// A morning lockout runs for the configured duration from its own fire time.
/// A nightly lockout instead ends `lockout_duration_minutes` after the *next*
/// morning alarm time, so that it bridges sleep through the following
/// morning's focus window. The morning fire time is recomputed here from the
/// current settings rather than reusing the armed registration.
pub fn unlock_deadline<Tz: TimeZone>(
    kind: TriggerKind,
    now: &DateTime<Tz>,
    settings: &AlarmSettings,
) -> DateTime<Tz> {
    let duration = Duration::minutes(i64::from(settings.lockout_duration_minutes));

    match kind {
        TriggerKind::Morning => now.clone() + duration,
        TriggerKind::Nightly => {
            next_fire_time(now, settings.alarm_hour, settings.alarm_minute) + duration
        }
    }
}
