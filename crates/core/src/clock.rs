//! Time source for timestamps written by the core.
//!
//! Backup keys, record timestamps and bundle export times all read the clock through this
//! trait so they can be made deterministic in tests.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Whole seconds since the Unix epoch.
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Clock;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that advances one second every time it is read.
    #[derive(Debug)]
    pub(crate) struct SteppingClock {
        next: AtomicI64,
    }

    impl SteppingClock {
        pub(crate) fn starting_at(seconds: i64) -> Self {
            Self {
                next: AtomicI64::new(seconds),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let seconds = self.next.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(seconds, 0)
                .single()
                .unwrap_or_else(Utc::now)
        }
    }

    /// Clock frozen at one instant.
    #[derive(Debug)]
    pub(crate) struct FixedClock(pub(crate) i64);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.0, 0).single().unwrap_or_else(Utc::now)
        }
    }
}
