//! Local Search Tests
//!
//! Each search workflow run end-to-end on the in-process worker pool.

use dispatch_core::application::configure;
use dispatch_core::application::workloads::{
    FactorHunt, FactorPair, FactorRangeWorkload, MonteCarloPi, PiEstimation, PrimalityWorkload, PrimeSweep,
};
use dispatch_core::domain::{JobId, PrimalityTest};
use dispatch_infra_system::LocalExecutor;
use num_bigint::BigUint;
use std::time::Duration;

fn ints(values: &[u32]) -> Vec<BigUint> {
    values.iter().copied().map(BigUint::from).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_prime_sweep_below_100() {
    let config = configure(2, 6, 3).unwrap();
    let workload = PrimalityWorkload::new(PrimalityTest::TrialDivision, config.oracle());
    let executor = LocalExecutor::new(workload, 4).unwrap();

    let report = PrimeSweep::new(BigUint::from(1u32), BigUint::from(100u32), PrimalityTest::TrialDivision)
        .unwrap()
        .run(&config, executor, None)
        .await
        .unwrap();

    // odd candidates only, so 2 is never tested
    assert_eq!(
        report.outcome.primes,
        ints(&[
            3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97
        ])
    );
    assert_eq!(report.dispatch.submitted, 50);
    assert_eq!(report.dispatch.completed, 50);
    assert!(report.dispatch.peak_pending <= 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_miller_rabin_never_misses_a_prime() {
    let config = configure(2, 6, 5).unwrap();
    let workload = PrimalityWorkload::new(PrimalityTest::MillerRabin, config.oracle());
    let executor = LocalExecutor::new(workload, 4).unwrap();

    let report = PrimeSweep::new(BigUint::from(1_000u32), BigUint::from(1_100u32), PrimalityTest::MillerRabin)
        .unwrap()
        .run(&config, executor, None)
        .await
        .unwrap();

    // probable primes are a superset of the real ones
    let expected = ints(&[
        1009, 1013, 1019, 1021, 1031, 1033, 1039, 1049, 1051, 1061, 1063, 1069, 1087, 1091, 1093, 1097,
    ]);
    for prime in expected {
        assert!(report.outcome.primes.contains(&prime), "missed {}", prime);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_factor_hunt_splits_semi_prime() {
    let config = configure(2, 6, 3).unwrap();
    let executor = LocalExecutor::new(FactorRangeWorkload::new(config.oracle()), 4).unwrap();

    let report = FactorHunt::with_default_scale(BigUint::from(10_403u32))
        .unwrap()
        .run(&config, executor, None)
        .await
        .unwrap();

    let found = report.outcome.found.expect("10403 = 101 * 103");
    assert_eq!(found.job_id, JobId::new(1));
    assert_eq!(
        found.value,
        FactorPair {
            p: BigUint::from(101u32),
            q: BigUint::from(103u32),
        }
    );
    assert!(report.dispatch.stopped_early);
    assert_eq!(report.dispatch.pending, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_factor_hunt_on_generated_semi_prime() {
    let config = configure(2, 6, 3).unwrap();
    let oracle = config.oracle();
    let hunt = FactorHunt::from_digits(3, 1.0, &oracle, &mut rand::thread_rng()).unwrap();
    let semi_prime = hunt.semi_prime().clone();
    let executor = LocalExecutor::new(FactorRangeWorkload::new(oracle), 4).unwrap();

    let report = hunt.run(&config, executor, Some(Duration::from_secs(60))).await.unwrap();

    let found = report.outcome.found.expect("factors of a generated semi-prime");
    assert_eq!(&found.value.p * &found.value.q, semi_prime);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_monte_carlo_pi_is_close() {
    let config = configure(2, 6, 3).unwrap();
    let executor = LocalExecutor::new(MonteCarloPi, 4).unwrap();

    let report = PiEstimation::new(20_000, 16)
        .unwrap()
        .with_client_seed(2024)
        .run(&config, executor, None)
        .await
        .unwrap();

    assert_eq!(report.outcome.samples, 320_000);
    let estimate: f64 = report.outcome.estimate.as_deref().unwrap().parse().unwrap();
    assert!((estimate - std::f64::consts::PI).abs() < 0.05, "estimate {}", estimate);
}
