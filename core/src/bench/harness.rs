//! Trial orchestration
//! One-time setup, N sequential trials, per-trial error isolation, averaging

use super::timing::{TimingCollector, TimingPhases};
use crate::config::{BenchmarkConfig, HarnessConfig};
use crate::error::BenchError;
use crate::types::{BenchmarkResult, OperationOutcome};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A benchmarkable operation.
///
/// `setup_account` runs once per `run_benchmark`; `execute_operation` runs
/// once per trial and fills the collector phase by phase.
#[async_trait]
pub trait BenchmarkOperation: Send + Sync {
    async fn setup_account(&mut self, config: &BenchmarkConfig) -> Result<(), BenchError>;

    async fn execute_operation(
        &self,
        config: &BenchmarkConfig,
        timings: &mut TimingCollector,
    ) -> Result<OperationOutcome, BenchError>;
}

#[async_trait]
impl<T: BenchmarkOperation + ?Sized> BenchmarkOperation for Box<T> {
    async fn setup_account(&mut self, config: &BenchmarkConfig) -> Result<(), BenchError> {
        (**self).setup_account(config).await
    }

    async fn execute_operation(
        &self,
        config: &BenchmarkConfig,
        timings: &mut TimingCollector,
    ) -> Result<OperationOutcome, BenchError> {
        (**self).execute_operation(config, timings).await
    }
}

/// Outcome of the trial loop, before averaging
#[derive(Debug, Clone, Default)]
pub struct TrialRun {
    /// Snapshots of the successful trials, in execution order
    pub samples: Vec<TimingPhases>,
    /// Hashes of the most recent successful trial
    pub last_outcome: Option<OperationOutcome>,
    /// 1-based indices of failed trials
    pub failed: Vec<u32>,
}

impl TrialRun {
    pub fn attempted(&self) -> usize {
        self.samples.len() + self.failed.len()
    }
}

/// Drives a [`BenchmarkOperation`] through a benchmark run.
/// Trials never overlap.
pub struct BenchmarkHarness<O> {
    operation: O,
    inter_trial_delay: Duration,
}

impl<O: BenchmarkOperation> BenchmarkHarness<O> {
    pub fn new(operation: O) -> Self {
        Self::with_config(operation, &HarnessConfig::default())
    }

    pub fn with_config(operation: O, config: &HarnessConfig) -> Self {
        Self {
            operation,
            inter_trial_delay: config.inter_trial_delay(),
        }
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    pub fn into_operation(self) -> O {
        self.operation
    }

    /// Run setup once, then every trial, and average the successful ones.
    ///
    /// Only a setup failure is returned as `Err`. A run in which every trial
    /// failed is still `Ok`, with `success == false`.
    pub async fn run_benchmark(&mut self, config: &BenchmarkConfig) -> Result<BenchmarkResult, BenchError> {
        self.operation
            .setup_account(config)
            .await
            .map_err(BenchError::setup)?;

        let run = self.run_trials(config).await;
        let attempted = run.attempted();
        let succeeded = run.samples.len();
        let tags = config.tags();

        let result = match (TimingPhases::average(&run.samples), run.last_outcome) {
            (Some(timings), Some(last)) => {
                info!(
                    "Averaged {} of {} iterations | {}",
                    succeeded, attempted, timings
                );
                BenchmarkResult::succeeded(tags, timings, last)
            }
            _ => {
                warn!("All {} iterations failed", attempted);
                BenchmarkResult::all_failed(tags)
            }
        };

        Ok(result)
    }

    /// The trial loop alone; setup must already have happened
    pub async fn run_trials(&self, config: &BenchmarkConfig) -> TrialRun {
        let iterations = config.iterations();
        let mut run = TrialRun {
            samples: Vec::with_capacity(iterations as usize),
            ..TrialRun::default()
        };

        info!("Running {} iterations...", iterations);

        for i in 0..iterations {
            let trial = i + 1;
            info!("Iteration {}/{}", trial, iterations);

            match self.run_trial(config).await {
                Ok((timings, outcome)) => {
                    debug!("Iteration {} | {}", trial, timings);
                    metrics::counter!("userop_bench_trials_total", "outcome" => "success").increment(1);
                    for (phase, ms) in timings.labelled() {
                        metrics::histogram!("userop_bench_phase_ms", "phase" => phase).record(ms);
                    }
                    run.samples.push(timings);
                    run.last_outcome = Some(outcome);
                }
                Err(e) => {
                    warn!("Iteration {} failed: {}", trial, e);
                    metrics::counter!("userop_bench_trials_total", "outcome" => "failure").increment(1);
                    run.failed.push(trial);
                }
            }

            if trial < iterations && !self.inter_trial_delay.is_zero() {
                tokio::time::sleep(self.inter_trial_delay).await;
            }
        }

        run
    }

    /// One attempt with a fresh collector. Panics count as failures.
    async fn run_trial(&self, config: &BenchmarkConfig) -> Result<(TimingPhases, OperationOutcome), BenchError> {
        let mut collector = TimingCollector::new();

        let outcome = AssertUnwindSafe(self.operation.execute_operation(config, &mut collector))
            .catch_unwind()
            .await
            .map_err(|payload| BenchError::Panicked(panic_message(payload.as_ref())))??;

        Ok((collector.snapshot(), outcome))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
