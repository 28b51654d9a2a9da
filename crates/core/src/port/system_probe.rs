// System resource probe port
// Used to size the dispatch window and the local worker pool

/// System probe port
pub trait SystemProbe: Send + Sync {
    /// Number of jobs the local machine can run in parallel
    ///
    /// Never returns 0.
    fn parallelism(&self) -> usize;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Mock SystemProbe reporting a fixed worker count
    pub struct MockSystemProbe {
        parallelism: usize,
    }

    impl MockSystemProbe {
        pub fn new(parallelism: usize) -> Self {
            Self {
                parallelism: parallelism.max(1),
            }
        }
    }

    impl SystemProbe for MockSystemProbe {
        fn parallelism(&self) -> usize {
            self.parallelism
        }
    }
}
