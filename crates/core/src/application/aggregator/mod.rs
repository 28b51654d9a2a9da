// Search Aggregator - submission loop plus result interpretation

pub mod handlers;

pub use handlers::{Aggregate, CollectSuccesses, FirstSuccess, Found, SumOutcome, SumReduction};

use crate::application::dispatcher::{BoundedJobDispatcher, DispatchError, DispatchReport};
use crate::port::JobExecutor;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Result of a finished search session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport<T> {
    pub workload: String,
    pub dispatch: DispatchReport,
    /// Jobs that ended Failed, Cancelled or Abandoned
    pub failures: u64,
    pub outcome: T,
}

/// Drives a dispatcher over a payload stream until the stream ends or the
/// aggregate goal is reached
pub struct SearchAggregator;

impl SearchAggregator {
    /// Submit `payloads` in order, then drain
    ///
    /// Stops issuing work as soon as the session is cancelled (by the handler
    /// or a `CancelHandle`). Rejected payloads are logged and skipped. With a
    /// `drain_deadline`, jobs still pending at the deadline are abandoned.
    ///
    /// # Errors
    /// - DispatchError::InvariantViolation if the session was halted
    pub async fn run<P, R, E, H, I>(
        workload: &str,
        dispatcher: &mut BoundedJobDispatcher<P, R, E, H>,
        payloads: I,
        drain_deadline: Option<Duration>,
    ) -> Result<SessionReport<H::Outcome>, DispatchError>
    where
        P: Send + 'static,
        R: Send + 'static,
        E: JobExecutor<P, R>,
        H: Aggregate<R>,
        I: IntoIterator<Item = P>,
    {
        let span = info_span!("session", session_id = %dispatcher.session_id(), workload = %workload);
        let session = async move {
            info!("Search started");

            for payload in payloads {
                if dispatcher.is_cancelled() {
                    info!("Search stopped, remaining payloads skipped");
                    break;
                }
                match dispatcher.submit(payload).await {
                    Ok(_) => {}
                    Err(DispatchError::Rejected { id, source }) => {
                        warn!(job_id = %id, error = %source, "Payload rejected, skipping");
                    }
                    Err(DispatchError::Cancelled) => break,
                    Err(err) => return Err(err),
                }
            }

            let dispatch = match drain_deadline {
                Some(deadline) => dispatcher.drain_with_deadline(deadline).await?,
                None => dispatcher.drain().await?,
            };
            let (outcome, failures) = dispatcher.with_handler(|handler| (handler.outcome(), handler.failures()));

            info!(
                completed = dispatch.completed,
                failures = failures,
                stopped_early = dispatch.stopped_early,
                "Search finished"
            );
            Ok::<_, DispatchError>(SessionReport {
                workload: workload.to_string(),
                dispatch,
                failures,
                outcome,
            })
        };
        session.instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobId, WindowConfig};
    use crate::port::executor::mocks::{ImmediateExecutor, ManualExecutor, RejectingExecutor};
    use crate::port::ExecutionError;

    #[tokio::test]
    async fn test_sum_over_all_payloads() {
        let executor = ImmediateExecutor::new(|n: u64| Ok::<u64, ExecutionError>(n));
        let mut dispatcher: BoundedJobDispatcher<u64, u64, _, _> = BoundedJobDispatcher::new(
            WindowConfig::new(1, 3).unwrap(),
            executor,
            SumReduction::new(|r: &u64| *r),
        );

        let report = SearchAggregator::run("sum", &mut dispatcher, vec![785; 4], None)
            .await
            .unwrap();

        assert_eq!(report.outcome.total, 3140);
        assert_eq!(report.outcome.successes, 4);
        assert_eq!(report.dispatch.submitted, 4);
        assert_eq!(report.workload, "sum");
        assert!(!report.dispatch.stopped_early);
    }

    #[tokio::test]
    async fn test_first_success_suppresses_further_submissions() {
        let executor = ImmediateExecutor::new(|n: u64| Ok::<u64, ExecutionError>(n));
        let mut dispatcher: BoundedJobDispatcher<u64, u64, _, _> = BoundedJobDispatcher::new(
            WindowConfig::new(1, 3).unwrap(),
            executor,
            FirstSuccess::new(|r: &u64| (*r == 23).then_some(*r)),
        );

        let report = SearchAggregator::run("first", &mut dispatcher, vec![15, 21, 23, 29, 31], None)
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            Some(Found {
                job_id: JobId::new(3),
                value: 23
            })
        );
        assert_eq!(report.dispatch.submitted, 3);
        assert!(report.dispatch.stopped_early);
    }

    #[tokio::test]
    async fn test_rejected_payloads_are_skipped() {
        let mut dispatcher: BoundedJobDispatcher<u64, u64, _, _> = BoundedJobDispatcher::new(
            WindowConfig::new(1, 3).unwrap(),
            RejectingExecutor::new("offline"),
            CollectSuccesses::new(|r: &u64| Some(*r)),
        );

        let report = SearchAggregator::run("collect", &mut dispatcher, 0..3u64, None)
            .await
            .unwrap();

        assert!(report.outcome.is_empty());
        assert_eq!(report.dispatch.rejected, 3);
        assert_eq!(report.failures, 3);
    }

    #[tokio::test]
    async fn test_drain_deadline_returns_partial_report() {
        let executor: ManualExecutor<u64, u64> = ManualExecutor::new();
        let mut dispatcher = BoundedJobDispatcher::new(
            WindowConfig::new(2, 6).unwrap(),
            executor.clone(),
            SumReduction::new(|r: &u64| *r),
        );

        let report = SearchAggregator::run(
            "sum",
            &mut dispatcher,
            0..4u64,
            Some(Duration::from_millis(10)),
        )
        .await
        .unwrap();

        assert_eq!(executor.submitted_count(), 4);
        assert_eq!(report.dispatch.abandoned, 4);
        assert_eq!(report.failures, 4);
        assert_eq!(report.outcome.total, 0);
    }
}
