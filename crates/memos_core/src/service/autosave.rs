//! Cancelable single-shot debounce timer.
//!
//! # Responsibility
//! - Track one pending commit deadline for the editor.
//!
//! # Invariants
//! - At most one deadline is pending; `restart` replaces it.
//! - `fire_if_due` clears the deadline before reporting, so one scheduling
//!   fires at most once.

use crate::clock::millis_to_duration;
use chrono::{DateTime, Duration, Utc};

/// Deadline-based debounce timer polled by the host event loop.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<DateTime<Utc>>,
}

impl DebounceTimer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: millis_to_duration(delay_ms),
            deadline: None,
        }
    }

    /// Schedules a fire at `now + delay`, dropping any earlier schedule.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.deadline = Some(now + self.delay);
    }

    /// Stops the timer without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns `true` exactly once when the pending deadline has passed.
    pub fn fire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
