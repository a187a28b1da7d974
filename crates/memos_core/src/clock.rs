//! Injected time sources.
//!
//! # Responsibility
//! - Give memos, the store, the autosave timer and the log deduper one
//!   shared notion of "now".
//! - Let tests drive time explicitly instead of sleeping.
//!
//! # Invariants
//! - `ManualClock` only moves when told to; it never goes backwards through
//!   `advance`.

use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;

/// Source of wall-clock time in UTC.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the operating system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Virtual clock for deterministic tests and headless hosts.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Creates a clock frozen at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Moves the clock forward by `millis` milliseconds.
    pub fn advance_ms(&self, millis: u64) {
        self.now.set(self.now.get() + millis_to_duration(millis));
    }

    /// Jumps to an absolute instant. Used to simulate clock skew.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.now.set(instant);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Converts a millisecond count to a `chrono` duration, saturating on overflow.
pub(crate) fn millis_to_duration(millis: u64) -> Duration {
    const MAX_MILLIS: u64 = i64::MAX as u64 / 1_000_000;
    Duration::milliseconds(millis.min(MAX_MILLIS) as i64)
}
