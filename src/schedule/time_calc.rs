use chrono::{DateTime, NaiveTime, TimeZone};

/// Next absolute fire time for a recurring daily (hour, minute) target.
///
/// Returns today's instant at the target wall-clock time in `now`'s calendar,
/// rolled forward one calendar day when that instant is not strictly in the
/// future. DST gaps and ambiguities resolve through the calendar's own
/// local-datetime mapping (earliest instant on ambiguity); no separate
/// correction is applied.
pub fn next_fire_time<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32, minute: u32) -> DateTime<Tz> {
    let target = NaiveTime::from_hms_opt(hour, minute, 0)
        .expect("wall-clock target validated at the settings boundary");
    let tz = now.timezone();
    let today = now.date_naive();

    if let Some(at) = tz.from_local_datetime(&today.and_time(target)).earliest() {
        if at > *now {
            return at;
        }
    }

    let tomorrow = today.succ_opt().expect("calendar date overflow");
    tz.from_local_datetime(&tomorrow.and_time(target))
        .earliest()
        // Unresolvable local time (the target sits inside a DST gap): fall
        // back to one day from now rather than skipping the alarm entirely.
        .unwrap_or_else(|| now.clone() + chrono::Duration::days(1))
}
