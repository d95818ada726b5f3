//! Time helpers
//!
//! Frame callbacks carry a millisecond timestamp with an undefined base.
//! Clients only compare timestamps against each other, so the monotonic
//! clock is used to keep them immune to wall-clock jumps.

use std::time::Duration;

/// Current value of `CLOCK_MONOTONIC`.
pub fn get_monotonic_time() -> Duration {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid out-pointer and CLOCK_MONOTONIC is always available on Linux.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

/// Monotonic time in milliseconds, wrapping at `u32::MAX` like protocol timestamps.
pub fn get_time_msec() -> u32 {
    msec_from_duration(get_monotonic_time())
}

fn msec_from_duration(time: Duration) -> u32 {
    time.as_millis() as u32
}
