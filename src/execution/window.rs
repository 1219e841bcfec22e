use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Time of day around which the daily digest goes out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyWindow {
    pub hour: u32,
    pub minute: u32,
    pub window_minutes: u32,
}

impl DailyWindow {
    pub fn contains<T: Timelike>(&self, now: &T) -> bool {
        is_within_daily_window(now, self.hour, self.minute, self.window_minutes)
    }
}

/// True when `now` is in `target_hour` and less than `window_minutes`
/// minutes away from `target_minute`.
///
/// Only minutes inside the same hour are compared, so a window that would
/// cross an hour boundary (00:02 with 5 minutes, checked at 23:59) never
/// matches. `now` must already be in the wanted timezone.
pub fn is_within_daily_window<T: Timelike>(
    now: &T,
    target_hour: u32,
    target_minute: u32,
    window_minutes: u32,
) -> bool {
    if now.hour() != target_hour {
        return false;
    }

    let diff = (i64::from(now.minute()) - i64::from(target_minute)).abs();
    diff < i64::from(window_minutes)
}
