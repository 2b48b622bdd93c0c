//! Time source for rate-limit windows.
//!
//! Every window boundary is computed from a `Clock` so tests can step time
//! without sleeping.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Mutex;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        let mut now = self.now.lock().expect("manual clock mutex poisoned");
        *now += TimeDelta::milliseconds(ms);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().expect("manual clock mutex poisoned") = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock mutex poisoned")
    }
}

/// `now + window_ms`, saturating at the largest representable instant.
pub fn window_end(now: DateTime<Utc>, window_ms: u64) -> DateTime<Utc> {
    i64::try_from(window_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
