//! Runner configuration from environment variables

use dispatch_core::application::constants::{DEFAULT_CHUNK_SCALE, UPPER_BOUND_FACTOR};
use dispatch_core::application::{configure, DispatchConfig};
use dispatch_core::domain::{PrimalityTest, DEFAULT_TRIALS};
use dispatch_core::port::SystemProbe;
use dispatch_core::{AppError, Result};
use num_bigint::BigUint;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PI_POINTS: u64 = 100_000;
const DEFAULT_PI_JOBS: u64 = 100;
const DEFAULT_PRIME_LOWER: u64 = 1;
const DEFAULT_PRIME_UPPER: u64 = 10_000;
const DEFAULT_SEMI_PRIME_DIGITS: u32 = 6;

/// Where the number to factor comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SemiPrimeSource {
    Given(BigUint),
    /// Generate one from two random primes of this many digits
    Digits(u32),
}

/// Selected search and its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum WorkloadConfig {
    Pi {
        points: u64,
        jobs: u64,
    },
    Primes {
        lower: BigUint,
        upper: BigUint,
        test: PrimalityTest,
    },
    Factor {
        source: SemiPrimeSource,
        chunk_scale: f64,
    },
}

impl WorkloadConfig {
    pub fn name(&self) -> &'static str {
        match self {
            WorkloadConfig::Pi { .. } => "pi",
            WorkloadConfig::Primes { .. } => "primes",
            WorkloadConfig::Factor { .. } => "factor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub dispatch: DispatchConfig,
    pub workers: usize,
    /// None waits for every job
    pub drain_deadline: Option<Duration>,
    pub workload: WorkloadConfig,
}

impl RunnerConfig {
    /// Read `DISPATCH_*` variables from the process environment
    pub fn from_env(probe: &dyn SystemProbe) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), probe)
    }

    /// Build from any key lookup; unset keys fall back to defaults derived
    /// from the probe's parallelism
    ///
    /// An explicit lower bound without an upper bound gets
    /// `upper = 3 * lower`.
    ///
    /// # Errors
    /// - AppError::Config if a value does not parse, or the derived upper
    ///   bound overflows
    /// - AppError::Domain if the values are out of range
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, probe: &dyn SystemProbe) -> Result<Self> {
        let trials = parse_or(&lookup, "DISPATCH_TRIALS", DEFAULT_TRIALS)?;
        let derived = DispatchConfig::from_probe(probe, trials)?;

        let dispatch = match (
            parse::<usize>(&lookup, "DISPATCH_LOWER_BOUND")?,
            parse::<usize>(&lookup, "DISPATCH_UPPER_BOUND")?,
        ) {
            (None, None) => derived,
            (lower_bound, upper_bound) => {
                let lower_bound = lower_bound.unwrap_or_else(|| derived.window.lower_bound());
                let upper_bound = match upper_bound {
                    Some(upper_bound) => upper_bound,
                    None => lower_bound.checked_mul(UPPER_BOUND_FACTOR).ok_or_else(|| {
                        AppError::Config(format!(
                            "DISPATCH_LOWER_BOUND={} is too large to derive an upper bound",
                            lower_bound
                        ))
                    })?,
                };
                configure(lower_bound, upper_bound, trials)?
            }
        };

        let workers = parse_or(&lookup, "DISPATCH_WORKERS", probe.parallelism().max(1))?;
        if workers == 0 {
            return Err(AppError::Config("DISPATCH_WORKERS must be at least 1".to_string()));
        }

        let drain_deadline = parse::<u64>(&lookup, "DISPATCH_DRAIN_DEADLINE_SECS")?.map(Duration::from_secs);

        let workload = match lookup("DISPATCH_WORKLOAD").as_deref().map(str::trim) {
            None | Some("pi") => WorkloadConfig::Pi {
                points: parse_or(&lookup, "DISPATCH_PI_POINTS", DEFAULT_PI_POINTS)?,
                jobs: parse_or(&lookup, "DISPATCH_PI_JOBS", DEFAULT_PI_JOBS)?,
            },
            Some("primes") => WorkloadConfig::Primes {
                lower: parse_or(&lookup, "DISPATCH_PRIME_LOWER", BigUint::from(DEFAULT_PRIME_LOWER))?,
                upper: parse_or(&lookup, "DISPATCH_PRIME_UPPER", BigUint::from(DEFAULT_PRIME_UPPER))?,
                test: parse_or(&lookup, "DISPATCH_PRIME_TEST", PrimalityTest::MillerRabin)?,
            },
            Some("factor") => WorkloadConfig::Factor {
                source: match parse::<BigUint>(&lookup, "DISPATCH_SEMI_PRIME")? {
                    Some(n) => SemiPrimeSource::Given(n),
                    None => SemiPrimeSource::Digits(parse_or(
                        &lookup,
                        "DISPATCH_SEMI_PRIME_DIGITS",
                        DEFAULT_SEMI_PRIME_DIGITS,
                    )?),
                },
                chunk_scale: parse_or(&lookup, "DISPATCH_CHUNK_SCALE", DEFAULT_CHUNK_SCALE)?,
            },
            Some(other) => {
                return Err(AppError::Config(format!(
                    "DISPATCH_WORKLOAD must be pi, primes or factor, got {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            dispatch,
            workers,
            drain_deadline,
            workload,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(parse(lookup, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::application::workloads::PiEstimation;
    use dispatch_core::port::system_probe::mocks::MockSystemProbe;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn from_pairs(pairs: &[(&str, &str)], parallelism: usize) -> Result<RunnerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunnerConfig::from_lookup(|key| vars.get(key).cloned(), &MockSystemProbe::new(parallelism))
    }

    #[test]
    fn test_defaults_follow_parallelism() {
        let config = assert_ok!(from_pairs(&[], 4));
        assert_eq!(config.dispatch.window.lower_bound(), 4);
        assert_eq!(config.dispatch.window.upper_bound(), 12);
        assert_eq!(config.dispatch.trials, DEFAULT_TRIALS);
        assert_eq!(config.workers, 4);
        assert_eq!(config.drain_deadline, None);
        assert_eq!(
            config.workload,
            WorkloadConfig::Pi {
                points: DEFAULT_PI_POINTS,
                jobs: DEFAULT_PI_JOBS
            }
        );
    }

    #[test]
    fn test_explicit_values() {
        let config = from_pairs(
            &[
                ("DISPATCH_LOWER_BOUND", "32"),
                ("DISPATCH_UPPER_BOUND", "96"),
                ("DISPATCH_TRIALS", "5"),
                ("DISPATCH_WORKERS", "8"),
                ("DISPATCH_DRAIN_DEADLINE_SECS", "30"),
                ("DISPATCH_WORKLOAD", "primes"),
                ("DISPATCH_PRIME_LOWER", "100"),
                ("DISPATCH_PRIME_UPPER", "99194853094755497"),
                ("DISPATCH_PRIME_TEST", "1"),
            ],
            2,
        )
        .unwrap();

        assert_eq!(config.dispatch.window.upper_bound(), 96);
        assert_eq!(config.dispatch.trials, 5);
        assert_eq!(config.workers, 8);
        assert_eq!(config.drain_deadline, Some(Duration::from_secs(30)));
        assert_eq!(
            config.workload,
            WorkloadConfig::Primes {
                lower: BigUint::from(100u32),
                upper: BigUint::from(99_194_853_094_755_497u64),
                test: PrimalityTest::Fermat,
            }
        );
    }

    #[test]
    fn test_factor_source_selection() {
        let given = from_pairs(&[("DISPATCH_WORKLOAD", "factor"), ("DISPATCH_SEMI_PRIME", "10403")], 1).unwrap();
        assert_eq!(given.workload.name(), "factor");
        assert_eq!(
            given.workload,
            WorkloadConfig::Factor {
                source: SemiPrimeSource::Given(BigUint::from(10_403u32)),
                chunk_scale: DEFAULT_CHUNK_SCALE,
            }
        );

        let generated = from_pairs(
            &[
                ("DISPATCH_WORKLOAD", "factor"),
                ("DISPATCH_SEMI_PRIME_DIGITS", "4"),
                ("DISPATCH_CHUNK_SCALE", "2.5"),
            ],
            1,
        )
        .unwrap();
        assert_eq!(
            generated.workload,
            WorkloadConfig::Factor {
                source: SemiPrimeSource::Digits(4),
                chunk_scale: 2.5,
            }
        );
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = assert_err!(from_pairs(&[("DISPATCH_TRIALS", "three")], 2));
        assert!(matches!(err, AppError::Config(msg) if msg.contains("DISPATCH_TRIALS")));

        let err = from_pairs(&[("DISPATCH_WORKLOAD", "mandelbrot")], 2).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = from_pairs(&[("DISPATCH_LOWER_BOUND", "10"), ("DISPATCH_UPPER_BOUND", "5")], 2).unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));

        let err = from_pairs(&[("DISPATCH_WORKERS", "0")], 2).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_partial_watermarks() {
        let config = assert_ok!(from_pairs(&[("DISPATCH_LOWER_BOUND", "5")], 2));
        assert_eq!(config.dispatch.window.lower_bound(), 5);
        assert_eq!(config.dispatch.window.upper_bound(), 15);

        // lower bound still follows the probe
        let config = assert_ok!(from_pairs(&[("DISPATCH_UPPER_BOUND", "40")], 4));
        assert_eq!(config.dispatch.window.lower_bound(), 4);
        assert_eq!(config.dispatch.window.upper_bound(), 40);
    }

    #[test]
    fn test_huge_lower_bound_is_a_config_error() {
        let max = usize::MAX.to_string();
        let err = assert_err!(from_pairs(&[("DISPATCH_LOWER_BOUND", max.as_str())], 2));
        assert!(matches!(err, AppError::Config(msg) if msg.contains("DISPATCH_LOWER_BOUND")));
    }

    #[test]
    fn test_pi_sample_count_overflow_is_rejected() {
        let max = u64::MAX.to_string();
        let config = assert_ok!(from_pairs(
            &[("DISPATCH_PI_POINTS", max.as_str()), ("DISPATCH_PI_JOBS", "2")],
            2
        ));
        let WorkloadConfig::Pi { points, jobs } = config.workload else {
            panic!("expected the pi workload");
        };
        assert!(PiEstimation::new(points, jobs).is_err());
    }
}
