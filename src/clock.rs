//! Wall-clock source for timer and history timestamps.
//!
//! Operations read the time through [`Clock`] so timer arithmetic can be
//! driven by a [`ManualClock`] in tests.

use std::cell::Cell;

use chrono::{DateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Cell<i64>,
}

impl ManualClock {
    /// Default base timestamp (2023-11-14T22:13:20Z).
    pub const BASE_MILLIS: i64 = 1_700_000_000_000;

    pub fn new() -> Self {
        Self::at_millis(Self::BASE_MILLIS)
    }

    pub fn at_millis(millis: i64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    pub fn advance_millis(&self, delta: i64) {
        self.millis.set(self.millis.get().saturating_add(delta));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.get()).unwrap_or(DateTime::UNIX_EPOCH)
    }

    fn now_millis(&self) -> i64 {
        self.millis.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}
