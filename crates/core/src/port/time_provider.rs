// Time Provider Port (for testability)

use chrono::{DateTime, SubsecRound, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current time in milliseconds since epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Drop sub-millisecond precision.
///
/// Storage keeps epoch milliseconds, so every instant written through the
/// service is cut to that resolution first and writes return what a later
/// read returns.
pub fn to_stored_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Clock that only moves when told to
    pub struct FixedTimeProvider {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedTimeProvider {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap() = now;
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_stored_precision_truncates_to_millis() {
        let precise = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 2, 20)
                .unwrap()
                .and_hms_nano_opt(7, 0, 0, 123_456_789)
                .unwrap(),
        );
        let stored = to_stored_precision(precise);

        assert_eq!(stored.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(
            DateTime::from_timestamp_millis(stored.timestamp_millis()),
            Some(stored)
        );
    }
}
