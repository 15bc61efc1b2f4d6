//! Test-friendly clock.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use taxlab_core::auth::Clock;

/// Clock pinned to a settable instant, in epoch seconds.
#[derive(Debug)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    pub fn new(seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(seconds),
        }
    }

    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_configured_seconds() {
        let clock = FixedClock::new(1_700_000_000);
        assert_eq!(clock.epoch_seconds(), 1_700_000_000);

        clock.advance(60);
        assert_eq!(clock.epoch_seconds(), 1_700_000_060);

        clock.set(5);
        assert_eq!(clock.epoch_seconds(), 5);
    }
}
