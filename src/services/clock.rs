//! Calendar-date source for check-in decisions
//!
//! The roster never reads the system clock directly. Check-in eligibility is a
//! calendar-day comparison in the trip timezone, so the clock hands out
//! `NaiveDate`s rather than instants.

use chrono::{FixedOffset, NaiveDate, Utc};
use parking_lot::Mutex;

/// Supplies "today" in the trip timezone
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock shifted into the trips' local timezone
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Build from an offset in minutes east of UTC
    ///
    /// Returns `None` for offsets beyond +/- 24h.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes.checked_mul(60).and_then(FixedOffset::east_opt).map(Self::new)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Settable clock for tests and dry runs
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today: Mutex::new(today) }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock() = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }
}
