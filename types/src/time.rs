//! Timestamps and the clock abstraction.
//!
//! Timestamps are Unix epoch seconds (UTC). Accrual speeds are expressed in
//! raw units per second, so elapsed time is always a whole number of seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A system clock set before 1970 reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    /// Seconds from `self` until `now`, or `None` if `now` is earlier.
    pub fn checked_elapsed(&self, now: Timestamp) -> Option<u64> {
        now.0.checked_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time.
///
/// The ledger samples its clock once per operation; every settlement in that
/// operation uses the same instant.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_elapsed_rejects_regression() {
        let earlier = Timestamp::new(100);
        let later = Timestamp::new(250);
        assert_eq!(earlier.checked_elapsed(later), Some(150));
        assert_eq!(later.checked_elapsed(earlier), None);
    }

    #[test]
    fn system_clock_is_past_epoch() {
        assert!(SystemClock.now() > Timestamp::EPOCH);
    }

    #[test]
    fn shared_clock_delegates() {
        struct Fixed;
        impl Clock for Fixed {
            fn now(&self) -> Timestamp {
                Timestamp::new(42)
            }
        }
        let rc = Rc::new(Fixed);
        let arc = Arc::new(Fixed);
        assert_eq!(rc.now(), Timestamp::new(42));
        assert_eq!(arc.now(), Timestamp::new(42));
    }
}
