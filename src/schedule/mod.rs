/// Recurring wake-event scheduling
///
/// This module provides functionality to:
/// - Compute the next absolute fire time for a daily wall-clock target
/// - Arm and cancel the two one-shot wake-ups (morning alarm, nightly lockout)
/// - Restore recurrence by rearming after every fire and at startup

pub mod controller;
pub mod time_calc;

pub use controller::{AlarmId, ScheduleController, WakeupFacility};
pub use time_calc::next_fire_time;
