// Workload Port
// The unit of computation an executor runs for each submitted payload

use crate::port::executor::ExecutionError;
use async_trait::async_trait;

/// A computation that turns one payload into one result
///
/// Implementations:
/// - MonteCarloPi, PrimalityWorkload, FactorRangeWorkload (application::workloads)
/// - mocks::FnWorkload (tests)
#[async_trait]
pub trait Workload: Send + Sync + 'static {
    type Payload: Send + 'static;
    type Output: Send + 'static;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Run the computation
    ///
    /// # Errors
    /// - ExecutionError::InvalidPayload if the payload cannot be processed
    /// - ExecutionError::Failed for any other failure
    async fn execute(&self, payload: Self::Payload) -> Result<Self::Output, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::marker::PhantomData;

    /// Workload backed by a plain closure
    pub struct FnWorkload<P, R, F> {
        run: F,
        _types: PhantomData<fn(P) -> R>,
    }

    impl<P, R, F> FnWorkload<P, R, F>
    where
        F: Fn(P) -> Result<R, ExecutionError>,
    {
        pub fn new(run: F) -> Self {
            Self {
                run,
                _types: PhantomData,
            }
        }
    }

    #[async_trait]
    impl<P, R, F> Workload for FnWorkload<P, R, F>
    where
        P: Send + 'static,
        R: Send + 'static,
        F: Fn(P) -> Result<R, ExecutionError> + Send + Sync + 'static,
    {
        type Payload = P;
        type Output = R;

        fn name(&self) -> &'static str {
            "fn-workload"
        }

        async fn execute(&self, payload: P) -> Result<R, ExecutionError> {
            (self.run)(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::FnWorkload;
    use super::*;

    #[tokio::test]
    async fn test_fn_workload_executes_closure() {
        let workload = FnWorkload::new(|n: u64| {
            if n == 0 {
                Err(ExecutionError::InvalidPayload("zero".to_string()))
            } else {
                Ok(n * 2)
            }
        });

        assert_eq!(workload.name(), "fn-workload");
        assert_eq!(workload.execute(21).await, Ok(42));
        assert!(matches!(
            workload.execute(0).await,
            Err(ExecutionError::InvalidPayload(_))
        ));
    }
}
