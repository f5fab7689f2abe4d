use std::thread;
use std::time::{Duration, Instant};

/// A monotonic millisecond tick source with a blocking delay.
///
/// All watchdog arithmetic in this crate goes through a `Clock`, so hosts can
/// plug in a hardware timer and tests can run without sleeping.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin. Never goes backwards.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `duration`.
    fn delay(&self, duration: Duration);

    /// Milliseconds elapsed since a previous `now_ms()` reading.
    fn elapsed_ms(&self, since: u64) -> u64 {
        self.now_ms().saturating_sub(since)
    }
}

/// `Clock` backed by `std::time::Instant` and `thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn delay(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Convert a watchdog duration to whole milliseconds, saturating.
pub(crate) fn as_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
