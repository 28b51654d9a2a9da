// Time Provider Port (for testability)

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Deterministic clock: starts at `start` and advances `step` per read
    pub struct MockTimeProvider {
        current: AtomicI64,
        step: i64,
    }

    impl MockTimeProvider {
        pub fn new(start: i64, step: i64) -> Self {
            Self {
                current: AtomicI64::new(start),
                step,
            }
        }

        pub fn fixed(at: i64) -> Self {
            Self::new(at, 0)
        }
    }

    impl TimeProvider for MockTimeProvider {
        fn now_millis(&self) -> i64 {
            self.current.fetch_add(self.step, Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockTimeProvider;
    use super::*;

    #[test]
    fn test_mock_clock_advances() {
        let clock = MockTimeProvider::new(1000, 10);
        assert_eq!(clock.now_millis(), 1000);
        assert_eq!(clock.now_millis(), 1010);

        let fixed = MockTimeProvider::fixed(5);
        assert_eq!(fixed.now_millis(), 5);
        assert_eq!(fixed.now_millis(), 5);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemTimeProvider.now_millis() > 1_577_836_800_000);
    }
}
