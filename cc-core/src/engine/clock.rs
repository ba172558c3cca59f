//! Monotonic time sources for the control loop

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::history::Timestamp;

/// Source of monotonic timestamps in seconds
pub trait Clock: Send {
    fn now(&self) -> Timestamp;
}

/// Raw monotonic clock, unaffected by NTP slewing or wall-clock changes
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicRawClock;

#[cfg(target_os = "linux")]
impl Clock for MonotonicRawClock {
    fn now(&self) -> Timestamp {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: clock_gettime only writes into the provided, properly initialized timespec.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut ts) };
        if rc != 0 {
            return fallback_now();
        }
        ts.tv_sec as f64 + ts.tv_nsec as f64 / 1e9
    }
}

#[cfg(not(target_os = "linux"))]
impl Clock for MonotonicRawClock {
    fn now(&self) -> Timestamp {
        fallback_now()
    }
}

fn fallback_now() -> Timestamp {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Settable clock for tests and replay
///
/// Clones share the same time, so a test can keep one handle and move
/// another into the controller.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
