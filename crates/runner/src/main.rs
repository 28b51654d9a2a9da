//! Bounded Dispatch - Main Entry Point
//! Runs one search session through the bounded dispatcher and prints its report as JSON

mod config;
mod logging;

use anyhow::Result;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use dispatch_core::application::workloads::{
    FactorHunt, FactorRangeWorkload, MonteCarloPi, PiEstimation, PrimalityWorkload, PrimeSweep,
};
use dispatch_core::application::{BoundedJobDispatcher, CancelHandle, SessionReport};
use dispatch_core::port::{SystemProbe, Workload};
use dispatch_infra_system::{LocalExecutor, SystemProbeImpl};

use crate::config::{RunnerConfig, SemiPrimeSource, WorkloadConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let _log_guard = logging::init()?;

    info!("Bounded Dispatch v{} starting...", VERSION);

    // 2. Load configuration
    let probe = SystemProbeImpl::new();
    let parallelism = probe.parallelism();
    let config = RunnerConfig::from_env(&probe)?;

    info!(
        parallelism = parallelism,
        total_memory_mb = probe.total_memory_mb(),
        lower_bound = config.dispatch.window.lower_bound(),
        upper_bound = config.dispatch.window.upper_bound(),
        trials = config.dispatch.trials,
        workers = config.workers,
        workload = config.workload.name(),
        "Configuration loaded"
    );

    // 3. Run the selected search
    match config.workload.clone() {
        WorkloadConfig::Pi { points, jobs } => {
            let estimation = PiEstimation::new(points, jobs)?;
            let executor = LocalExecutor::new(MonteCarloPi, config.workers)?;
            let executor_handle = executor.clone();
            let mut dispatcher =
                BoundedJobDispatcher::new(config.dispatch.window, executor, PiEstimation::handler());
            let watcher = cancel_on_ctrl_c(dispatcher.cancel_handle(), executor_handle.clone());
            let report = estimation.run_with(&mut dispatcher, config.drain_deadline).await;
            watcher.abort();
            executor_handle.shutdown();
            print_report(&report?)?;
        }
        WorkloadConfig::Primes { lower, upper, test } => {
            let sweep = PrimeSweep::new(lower, upper, test)?;
            let workload = PrimalityWorkload::new(test, config.dispatch.oracle());
            let executor = LocalExecutor::new(workload, config.workers)?;
            let executor_handle = executor.clone();
            let mut dispatcher =
                BoundedJobDispatcher::new(config.dispatch.window, executor, PrimeSweep::handler());
            let watcher = cancel_on_ctrl_c(dispatcher.cancel_handle(), executor_handle.clone());
            let report = sweep.run_with(&mut dispatcher, config.drain_deadline).await;
            watcher.abort();
            executor_handle.shutdown();
            print_report(&report?)?;
        }
        WorkloadConfig::Factor { source, chunk_scale } => {
            let oracle = config.dispatch.oracle();
            let hunt = match source {
                SemiPrimeSource::Given(n) => FactorHunt::new(n, chunk_scale)?,
                SemiPrimeSource::Digits(digits) => {
                    FactorHunt::from_digits(digits, chunk_scale, &oracle, &mut rand::thread_rng())?
                }
            };
            let executor = LocalExecutor::new(FactorRangeWorkload::new(oracle), config.workers)?;
            let executor_handle = executor.clone();
            let mut dispatcher =
                BoundedJobDispatcher::new(config.dispatch.window, executor, FactorHunt::handler());
            let watcher = cancel_on_ctrl_c(dispatcher.cancel_handle(), executor_handle.clone());
            let report = hunt.run_with(&mut dispatcher, config.drain_deadline).await;
            watcher.abort();
            executor_handle.shutdown();
            print_report(&report?)?;
        }
    }

    info!("Session complete.");

    Ok(())
}

/// Stop submitting new jobs on Ctrl+C
///
/// Jobs already running still drain; jobs still waiting for a worker are
/// reported Cancelled.
fn cancel_on_ctrl_c<W: Workload>(handle: CancelHandle, executor: LocalExecutor<W>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Draining in-flight jobs...");
                handle.cancel();
                executor.shutdown();
            }
            Err(e) => warn!(error = ?e, "Failed to listen for Ctrl+C"),
        }
    })
}

fn print_report<T: Serialize>(report: &SessionReport<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
