//! Clock trait - wall-clock source for photo names

use chrono::{Local, NaiveDateTime};

/// Wall-clock time source
///
/// Photo file names carry local time; scheduling uses the monotonic tokio
/// clock instead and never goes through this trait.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at one instant (tests, replays)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
