//! UserOp Bench
//!
//! Latency breakdown of smart account user operations, averaged over
//! repeated trials.
//!
//! ## Architecture
//! - Bench: phase-timed trial harness and per-trial timing collector
//! - Plugins: native and ERC-20 transfer operations sharing one phase sequence
//! - Provider: user operation submission capability + in-process simulator
//! - Config: run description, pacing, latency model, logging

pub mod bench;
pub mod config;
pub mod error;
pub mod plugins;
pub mod provider;
pub mod types;

pub use bench::{BenchmarkHarness, BenchmarkOperation, TimingCollector, TimingPhases};
pub use config::{BenchmarkConfig, Config, HarnessConfig};
pub use error::BenchError;
pub use provider::{SimulatedProvider, UserOperationProvider};
pub use types::{BenchmarkResult, BenchmarkTags, OpType, OperationOutcome};

use std::sync::Arc;

/// Run the configured benchmark against `provider`.
///
/// Picks the plugin for `config.benchmark.op_type` and applies the harness
/// pacing from `config.harness`.
pub async fn run(
    config: &Config,
    provider: Arc<dyn UserOperationProvider>,
) -> Result<BenchmarkResult, BenchError> {
    let operation = plugins::for_op_type(config.benchmark.op_type, provider, &config.harness)?;
    let mut harness = BenchmarkHarness::with_config(operation, &config.harness);
    harness.run_benchmark(&config.benchmark).await
}
