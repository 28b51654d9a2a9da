// Prime sweep: test every odd number in a range, one job per candidate

use crate::application::aggregator::{Aggregate, CollectSuccesses, SearchAggregator, SessionReport};
use crate::application::config::DispatchConfig;
use crate::application::dispatcher::BoundedJobDispatcher;
use crate::domain::{DomainError, PrimalityOracle, PrimalityTest};
use crate::error::Result;
use crate::port::{ExecutionError, JobExecutor, Workload};
use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimalityVerdict {
    #[serde(with = "crate::domain::serde_decimal")]
    pub candidate: BigUint,
    pub is_prime: bool,
}

/// Workload running one primality test per candidate
#[derive(Debug, Clone, Copy)]
pub struct PrimalityWorkload {
    test: PrimalityTest,
    oracle: PrimalityOracle,
}

impl PrimalityWorkload {
    pub fn new(test: PrimalityTest, oracle: PrimalityOracle) -> Self {
        Self { test, oracle }
    }

    pub fn test(&self) -> PrimalityTest {
        self.test
    }
}

#[async_trait]
impl Workload for PrimalityWorkload {
    type Payload = BigUint;
    type Output = PrimalityVerdict;

    fn name(&self) -> &'static str {
        "prime-sweep"
    }

    async fn execute(&self, candidate: BigUint) -> std::result::Result<PrimalityVerdict, ExecutionError> {
        let is_prime = self.oracle.check(self.test, &candidate);
        Ok(PrimalityVerdict { candidate, is_prime })
    }
}

/// Primes found by a sweep, ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeSweepOutcome {
    pub test: PrimalityTest,
    #[serde(with = "crate::domain::serde_decimal::vec")]
    pub primes: Vec<BigUint>,
}

/// Every odd number in `[lower, upper]`
#[derive(Debug, Clone)]
pub struct PrimeSweep {
    lower: BigUint,
    upper: BigUint,
    test: PrimalityTest,
}

impl PrimeSweep {
    /// # Errors
    /// - `DomainError::InvalidInput` if `lower > upper`
    pub fn new(lower: BigUint, upper: BigUint, test: PrimalityTest) -> std::result::Result<Self, DomainError> {
        if lower > upper {
            return Err(DomainError::InvalidInput(format!(
                "empty search range: {} > {}",
                lower, upper
            )));
        }
        Ok(Self { lower, upper, test })
    }

    pub fn test(&self) -> PrimalityTest {
        self.test
    }

    /// Odd candidates, starting from `lower` bumped to odd
    pub fn payloads(&self) -> impl Iterator<Item = BigUint> + Send {
        let start = if self.lower.bit(0) {
            self.lower.clone()
        } else {
            &self.lower + 1u32
        };
        let upper = self.upper.clone();
        std::iter::successors(Some(start), |n| Some(n + 2u32)).take_while(move |n| *n <= upper)
    }

    pub fn handler() -> CollectSuccesses<impl Fn(&PrimalityVerdict) -> Option<BigUint> + Send + 'static, BigUint> {
        CollectSuccesses::new(|verdict: &PrimalityVerdict| verdict.is_prime.then(|| verdict.candidate.clone()))
    }

    /// Dispatch every candidate and collect the probable primes
    pub async fn run<E>(
        self,
        config: &DispatchConfig,
        executor: E,
        drain_deadline: Option<Duration>,
    ) -> Result<SessionReport<PrimeSweepOutcome>>
    where
        E: JobExecutor<BigUint, PrimalityVerdict>,
    {
        let mut dispatcher = BoundedJobDispatcher::new(config.window, executor, Self::handler());
        self.run_with(&mut dispatcher, drain_deadline).await
    }

    pub async fn run_with<E, H>(
        self,
        dispatcher: &mut BoundedJobDispatcher<BigUint, PrimalityVerdict, E, H>,
        drain_deadline: Option<Duration>,
    ) -> Result<SessionReport<PrimeSweepOutcome>>
    where
        E: JobExecutor<BigUint, PrimalityVerdict>,
        H: Aggregate<PrimalityVerdict, Outcome = Vec<BigUint>>,
    {
        let report = SearchAggregator::run("prime-sweep", dispatcher, self.payloads(), drain_deadline).await?;

        let mut primes = report.outcome;
        primes.sort();
        Ok(SessionReport {
            workload: report.workload,
            dispatch: report.dispatch,
            failures: report.failures,
            outcome: PrimeSweepOutcome {
                test: self.test,
                primes,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::configure;
    use crate::port::executor::mocks::ImmediateExecutor;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_payloads_start_odd_and_include_upper() {
        let sweep = PrimeSweep::new(big(10), big(21), PrimalityTest::TrialDivision).unwrap();
        let payloads: Vec<BigUint> = sweep.payloads().collect();
        assert_eq!(payloads, vec![big(11), big(13), big(15), big(17), big(19), big(21)]);

        let single = PrimeSweep::new(big(7), big(7), PrimalityTest::TrialDivision).unwrap();
        assert_eq!(single.payloads().count(), 1);

        let none = PrimeSweep::new(big(8), big(8), PrimalityTest::TrialDivision).unwrap();
        assert_eq!(none.payloads().count(), 0);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(matches!(
            PrimeSweep::new(big(30), big(10), PrimalityTest::MillerRabin),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_workload_trial_division_verdicts() {
        let workload = PrimalityWorkload::new(PrimalityTest::TrialDivision, PrimalityOracle::default());
        assert!(workload.execute(big(7919)).await.unwrap().is_prime);
        assert!(!workload.execute(big(7917)).await.unwrap().is_prime);
        assert_eq!(workload.test(), PrimalityTest::TrialDivision);
    }

    #[tokio::test]
    async fn test_sweep_collects_sorted_primes() {
        let workload = PrimalityWorkload::new(PrimalityTest::TrialDivision, PrimalityOracle::default());
        let executor = ImmediateExecutor::new(move |candidate: BigUint| {
            let is_prime = crate::domain::primality::trial_division(&candidate);
            Ok::<PrimalityVerdict, ExecutionError>(PrimalityVerdict { candidate, is_prime })
        });
        let config = configure(2, 6, 3).unwrap();

        let report = PrimeSweep::new(big(1), big(30), workload.test())
            .unwrap()
            .run(&config, executor, None)
            .await
            .unwrap();

        let expected: Vec<BigUint> = [3u64, 5, 7, 11, 13, 17, 19, 23, 29].iter().map(|&n| big(n)).collect();
        assert_eq!(report.outcome.primes, expected);
        assert_eq!(report.dispatch.submitted, 15);
        assert_eq!(report.outcome.test, PrimalityTest::TrialDivision);
    }
}
