//! Blocking sleep
//!
//! Thin wrappers over the platform clock for engines that pace retries
//! between transfer chunks. Neither call can be cancelled.

use std::thread;
use std::time::{Duration, Instant};

/// Block the calling thread for at least `duration`
///
/// A zero duration yields the rest of the time slice instead.
pub fn sleep_for(duration: Duration) {
    if duration.is_zero() {
        thread::yield_now();
        return;
    }
    thread::sleep(duration);
}

/// Block the calling thread until `deadline` has passed
///
/// Returns immediately (after yielding) if the deadline is already past.
pub fn sleep_until(deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            thread::yield_now();
            return;
        }
        // Spurious early wakeups loop back around.
        thread::sleep(deadline - now);
    }
}
