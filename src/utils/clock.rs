//! Wall-clock access.
//!
//! The usage ledger resets per UTC calendar day and artifact ids derive from the
//! creation time, so both take the clock as a dependency instead of reading the
//! system time directly.

use parking_lot::Mutex;
use time::{Date, Duration, OffsetDateTime};

pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now_utc(&self) -> OffsetDateTime;

    /// Current UTC calendar date as `YYYY-MM-DD`.
    fn today(&self) -> String {
        format_date(self.now_utc().date())
    }

    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> u64 {
        (self.now_utc().unix_timestamp_nanos() / 1_000_000).max(0) as u64
    }
}

/// Format a date as ISO `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_formats_and_advances() {
        let start = OffsetDateTime::from_unix_timestamp(1_767_225_599).unwrap(); // 2025-12-31T23:59:59Z
        let clock = ManualClock::new(start);
        assert_eq!(clock.today(), "2025-12-31");
        assert_eq!(clock.now_millis(), 1_767_225_599_000);

        clock.advance(Duration::seconds(1));
        assert_eq!(clock.today(), "2026-01-01");
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now_millis() > 0);
        assert_eq!(SystemClock.today().len(), 10);
    }
}
