// Monte-Carlo Pi estimation (dartboard method)
//
// Each job throws `points` darts at the unit square from its own seed and
// reports how many landed inside the quarter circle.

use crate::application::aggregator::{Aggregate, SearchAggregator, SessionReport, SumOutcome, SumReduction};
use crate::application::config::DispatchConfig;
use crate::application::constants::{PI_ESTIMATE_PRECISION, PI_SEED_MAX};
use crate::application::dispatcher::BoundedJobDispatcher;
use crate::domain::DomainError;
use crate::error::Result;
use crate::port::{ExecutionError, JobExecutor, Workload};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiPayload {
    pub seed: u64,
    pub points: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiSample {
    pub seed: u64,
    pub inside: u64,
}

/// Count of `points` random darts from `seed` that land inside the quarter circle
pub fn dartboard(seed: u64, points: u64) -> u64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut inside = 0;
    for _ in 0..points {
        let x: f64 = rng.gen_range(0.0..=1.0);
        let y: f64 = rng.gen_range(0.0..=1.0);
        if x * x + y * y <= 1.0 {
            inside += 1;
        }
    }
    inside
}

/// `4 * inside / samples`, to 100 significant digits
///
/// # Errors
/// - `DomainError::InvalidInput` if `samples == 0`
pub fn pi_estimate(inside: u64, samples: u64) -> std::result::Result<BigDecimal, DomainError> {
    if samples == 0 {
        return Err(DomainError::InvalidInput(
            "cannot estimate pi from zero samples".to_string(),
        ));
    }
    let ratio = BigDecimal::from(inside) * BigDecimal::from(4u32) / BigDecimal::from(samples);
    Ok(ratio.with_prec(PI_ESTIMATE_PRECISION).normalized())
}

/// Workload running one dartboard trial per payload
#[derive(Debug, Clone, Copy, Default)]
pub struct MonteCarloPi;

#[async_trait]
impl Workload for MonteCarloPi {
    type Payload = PiPayload;
    type Output = PiSample;

    fn name(&self) -> &'static str {
        "monte-carlo-pi"
    }

    async fn execute(&self, payload: PiPayload) -> std::result::Result<PiSample, ExecutionError> {
        if payload.points == 0 {
            return Err(ExecutionError::InvalidPayload(
                "points must be at least 1".to_string(),
            ));
        }
        Ok(PiSample {
            seed: payload.seed,
            inside: dartboard(payload.seed, payload.points),
        })
    }
}

/// Final Pi estimate of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiOutcome {
    pub inside: u64,
    /// Points thrown by jobs that completed
    pub samples: u64,
    /// None when no job completed
    pub estimate: Option<String>,
}

/// `jobs` dartboard jobs of `points` darts each, with client-drawn seeds
pub struct PiEstimation {
    points: u64,
    jobs: u64,
    rng: StdRng,
}

impl PiEstimation {
    /// # Errors
    /// - `DomainError::InvalidInput` if `points` or `jobs` is zero, or if
    ///   `points * jobs` does not fit in u64
    pub fn new(points: u64, jobs: u64) -> std::result::Result<Self, DomainError> {
        if points == 0 {
            return Err(DomainError::InvalidInput(
                "points per job must be at least 1".to_string(),
            ));
        }
        if jobs == 0 {
            return Err(DomainError::InvalidInput(
                "job count must be at least 1".to_string(),
            ));
        }
        if points.checked_mul(jobs).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "{} jobs of {} points overflow the sample count",
                jobs, points
            )));
        }
        Ok(Self {
            points,
            jobs,
            rng: StdRng::from_entropy(),
        })
    }

    /// Draw job seeds from a fixed client seed
    pub fn with_client_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn jobs(&self) -> u64 {
        self.jobs
    }

    /// Exactly `jobs` payloads, seeds drawn from 0..=65535
    pub fn payloads(self) -> impl Iterator<Item = PiPayload> + Send {
        let Self { points, jobs, mut rng } = self;
        (0..jobs).map(move |_| PiPayload {
            seed: rng.gen_range(0..=PI_SEED_MAX),
            points,
        })
    }

    pub fn handler() -> SumReduction<impl Fn(&PiSample) -> u64 + Send + 'static> {
        SumReduction::new(|sample: &PiSample| sample.inside)
    }

    /// Turn the summed darts into an estimate
    ///
    /// # Errors
    /// - `DomainError::InvalidInput` if the dart or sample count overflowed u64
    pub fn conclude(points: u64, sum: &SumOutcome) -> std::result::Result<PiOutcome, DomainError> {
        if sum.overflowed {
            return Err(DomainError::InvalidInput(
                "inside count overflowed u64".to_string(),
            ));
        }
        let samples = sum.successes.checked_mul(points).ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "{} completed jobs of {} points overflow the sample count",
                sum.successes, points
            ))
        })?;
        let estimate = if samples == 0 {
            None
        } else {
            Some(pi_estimate(sum.total, samples)?.to_string())
        };
        Ok(PiOutcome {
            inside: sum.total,
            samples,
            estimate,
        })
    }

    /// Dispatch every job and estimate Pi from the completed ones
    pub async fn run<E>(
        self,
        config: &DispatchConfig,
        executor: E,
        drain_deadline: Option<Duration>,
    ) -> Result<SessionReport<PiOutcome>>
    where
        E: JobExecutor<PiPayload, PiSample>,
    {
        let mut dispatcher = BoundedJobDispatcher::new(config.window, executor, Self::handler());
        self.run_with(&mut dispatcher, drain_deadline).await
    }

    /// Like `run`, on a dispatcher the caller already holds a `CancelHandle` for
    pub async fn run_with<E, H>(
        self,
        dispatcher: &mut BoundedJobDispatcher<PiPayload, PiSample, E, H>,
        drain_deadline: Option<Duration>,
    ) -> Result<SessionReport<PiOutcome>>
    where
        E: JobExecutor<PiPayload, PiSample>,
        H: Aggregate<PiSample, Outcome = SumOutcome>,
    {
        let points = self.points;
        let report =
            SearchAggregator::run(MonteCarloPi.name(), dispatcher, self.payloads(), drain_deadline).await?;

        let outcome = Self::conclude(points, &report.outcome)?;
        Ok(SessionReport {
            workload: report.workload,
            dispatch: report.dispatch,
            failures: report.failures,
            outcome,
        })
    }
}
