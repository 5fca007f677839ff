//! Wall-clock helpers shared by the timer components

use chrono::Utc;

/// Current wall-clock time in UTC milliseconds
pub(crate) fn wall_clock_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Round a timestamp up to the next multiple of `tick_ms`
pub(crate) fn align_up(ms: i64, tick_ms: i64) -> i64 {
    let rem = ms.rem_euclid(tick_ms);
    if rem == 0 {
        ms
    } else {
        ms - rem + tick_ms
    }
}

/// Round a timestamp down to a multiple of `tick_ms`
pub(crate) fn align_down(ms: i64, tick_ms: i64) -> i64 {
    ms - ms.rem_euclid(tick_ms)
}
