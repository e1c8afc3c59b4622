//! Benchmark module
//! Phase-timed trials of user operations, averaged into one result

pub mod harness;
pub mod timing;

pub use harness::{BenchmarkHarness, BenchmarkOperation, TrialRun};
pub use timing::{round_hundredths, Phase, TimingCollector, TimingPhases};
