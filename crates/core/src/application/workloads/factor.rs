// Factor hunt: split a semi-prime by scanning chunks upward from its square root

use crate::application::aggregator::{Aggregate, FirstSuccess, Found, SearchAggregator, SessionReport};
use crate::application::config::DispatchConfig;
use crate::application::constants::DEFAULT_CHUNK_SCALE;
use crate::application::dispatcher::BoundedJobDispatcher;
use crate::domain::primality::semi_prime_with_digits;
use crate::domain::{DomainError, PrimalityOracle};
use crate::error::Result;
use crate::port::{ExecutionError, JobExecutor, Workload};
use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Candidate range `[lower, upper]` for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorPayload {
    #[serde(with = "crate::domain::serde_decimal")]
    pub semi_prime: BigUint,
    #[serde(with = "crate::domain::serde_decimal")]
    pub lower: BigUint,
    #[serde(with = "crate::domain::serde_decimal")]
    pub upper: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorPair {
    #[serde(with = "crate::domain::serde_decimal")]
    pub p: BigUint,
    #[serde(with = "crate::domain::serde_decimal")]
    pub q: BigUint,
}

/// Scan odd candidates in `[lower, upper]` for a probable-prime divisor
pub fn scan_range(
    oracle: &PrimalityOracle,
    semi_prime: &BigUint,
    lower: &BigUint,
    upper: &BigUint,
) -> Option<FactorPair> {
    let mut candidate = if lower.bit(0) { lower.clone() } else { lower + 1u32 };
    while candidate <= *upper {
        if oracle.is_prime_combined(&candidate) && (semi_prime % &candidate).is_zero() {
            let q = semi_prime / &candidate;
            return Some(FactorPair { p: candidate, q });
        }
        candidate += 2u32;
    }
    None
}

/// Natural log of an arbitrary-precision integer (n > 0)
fn ln(n: &BigUint) -> f64 {
    let shift = n.bits().saturating_sub(64);
    let top = (n >> shift).to_f64().unwrap_or(f64::MAX);
    top.ln() + shift as f64 * std::f64::consts::LN_2
}

/// Workload scanning one candidate range
#[derive(Debug, Clone, Copy, Default)]
pub struct FactorRangeWorkload {
    oracle: PrimalityOracle,
}

impl FactorRangeWorkload {
    pub fn new(oracle: PrimalityOracle) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl Workload for FactorRangeWorkload {
    type Payload = FactorPayload;
    type Output = Option<FactorPair>;

    fn name(&self) -> &'static str {
        "factor-hunt"
    }

    async fn execute(&self, payload: FactorPayload) -> std::result::Result<Option<FactorPair>, ExecutionError> {
        if payload.semi_prime.is_zero() {
            return Err(ExecutionError::InvalidPayload(
                "semi-prime must be positive".to_string(),
            ));
        }
        Ok(scan_range(&self.oracle, &payload.semi_prime, &payload.lower, &payload.upper))
    }
}

/// Result of a factor hunt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorHuntOutcome {
    #[serde(with = "crate::domain::serde_decimal")]
    pub semi_prime: BigUint,
    pub chunk: u64,
    /// First factor pair reported, and the job that found it
    pub found: Option<Found<FactorPair>>,
}

/// Chunked search from `isqrt(n)` (made odd) up to `n / 2`
#[derive(Debug, Clone)]
pub struct FactorHunt {
    semi_prime: BigUint,
    start: BigUint,
    end: BigUint,
    chunk: u64,
}

impl FactorHunt {
    /// # Errors
    /// - `DomainError::InvalidInput` if `semi_prime < 4` or `chunk_scale` is not
    ///   a positive finite number
    pub fn new(semi_prime: BigUint, chunk_scale: f64) -> std::result::Result<Self, DomainError> {
        if semi_prime < BigUint::from(4u32) {
            return Err(DomainError::InvalidInput(format!(
                "semi-prime must be at least 4, got {}",
                semi_prime
            )));
        }
        if !chunk_scale.is_finite() || chunk_scale <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "chunk scale must be positive, got {}",
                chunk_scale
            )));
        }

        let mut start = semi_prime.sqrt();
        if !start.bit(0) {
            start += 1u32;
        }
        let end = &semi_prime / 2u32;
        let chunk = ((chunk_scale * ln(&semi_prime)).floor() as u64).max(1);

        Ok(Self {
            semi_prime,
            start,
            end,
            chunk,
        })
    }

    /// Hunt for the factors of a fresh semi-prime with `digits`-digit factors
    pub fn from_digits<G: Rng + ?Sized>(
        digits: u32,
        chunk_scale: f64,
        oracle: &PrimalityOracle,
        rng: &mut G,
    ) -> std::result::Result<Self, DomainError> {
        let semi = semi_prime_with_digits(oracle, digits, rng)?;
        info!(p = %semi.p, q = %semi.q, semi_prime = %semi.product, "Generated semi-prime");
        Self::new(semi.product, chunk_scale)
    }

    /// Hunt with the default chunk scale
    pub fn with_default_scale(semi_prime: BigUint) -> std::result::Result<Self, DomainError> {
        Self::new(semi_prime, DEFAULT_CHUNK_SCALE)
    }

    pub fn semi_prime(&self) -> &BigUint {
        &self.semi_prime
    }

    pub fn chunk(&self) -> u64 {
        self.chunk
    }

    /// Ranges `[lower, lower + chunk]`, next lower bumped to odd, while `lower <= n / 2`
    pub fn payloads(&self) -> impl Iterator<Item = FactorPayload> + Send {
        let semi_prime = self.semi_prime.clone();
        let end = self.end.clone();
        let step = BigUint::from(self.chunk);
        let width = step.clone();

        std::iter::successors(Some(self.start.clone()), move |lower| {
            let mut next = lower + &step;
            if !next.bit(0) {
                next += 1u32;
            }
            Some(next)
        })
        .take_while(move |lower| *lower <= end)
        .map(move |lower| FactorPayload {
            semi_prime: semi_prime.clone(),
            upper: &lower + &width,
            lower,
        })
    }

    pub fn handler() -> FirstSuccess<impl Fn(&Option<FactorPair>) -> Option<FactorPair> + Send + 'static, FactorPair> {
        FirstSuccess::new(|scan: &Option<FactorPair>| scan.clone())
    }

    /// Dispatch ranges until the first factor pair arrives
    pub async fn run<E>(
        self,
        config: &DispatchConfig,
        executor: E,
        drain_deadline: Option<Duration>,
    ) -> Result<SessionReport<FactorHuntOutcome>>
    where
        E: JobExecutor<FactorPayload, Option<FactorPair>>,
    {
        let mut dispatcher = BoundedJobDispatcher::new(config.window, executor, Self::handler());
        self.run_with(&mut dispatcher, drain_deadline).await
    }

    pub async fn run_with<E, H>(
        self,
        dispatcher: &mut BoundedJobDispatcher<FactorPayload, Option<FactorPair>, E, H>,
        drain_deadline: Option<Duration>,
    ) -> Result<SessionReport<FactorHuntOutcome>>
    where
        E: JobExecutor<FactorPayload, Option<FactorPair>>,
        H: Aggregate<Option<FactorPair>, Outcome = Option<Found<FactorPair>>>,
    {
        info!(
            semi_prime = %self.semi_prime,
            start = %self.start,
            end = %self.end,
            chunk = self.chunk,
            "Factor hunt configured"
        );
        let report = SearchAggregator::run("factor-hunt", dispatcher, self.payloads(), drain_deadline).await?;

        if report.outcome.is_none() {
            info!(semi_prime = %self.semi_prime, "No factors found");
        }
        Ok(SessionReport {
            workload: report.workload,
            dispatch: report.dispatch,
            failures: report.failures,
            outcome: FactorHuntOutcome {
                semi_prime: self.semi_prime,
                chunk: self.chunk,
                found: report.outcome,
            },
        })
    }
}
