//! Clock abstraction for determinism.

use chrono::{DateTime, Duration, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the instant `hours` after now. Used for silence timers and
    /// contest windows.
    fn hours_from_now(&self, hours: u32) -> DateTime<Utc> {
        self.now() + Duration::hours(i64::from(hours))
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
