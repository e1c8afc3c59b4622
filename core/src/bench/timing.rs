//! Per-trial phase timings
//! Collector is filled while a trial runs, then frozen into a snapshot

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Measured phases of one user operation attempt.
///
/// `pure_send` is not a phase: it is always derived from `Send`, `Prepare`
/// and `Sign` when the collector is snapshotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Standalone prepare call
    Prepare,
    /// Standalone signature over the prepared hash
    Sign,
    /// Full send; the provider redoes prepare + sign internally
    Send,
    /// Waiting for the receipt
    Receipt,
    /// Send + receipt under one umbrella timer
    EndToEnd,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prepare => "prepare",
            Phase::Sign => "sign",
            Phase::Send => "send",
            Phase::Receipt => "receipt",
            Phase::EndToEnd => "e2e",
        }
    }
}

/// Timing breakdown in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingPhases {
    pub prepare_ms: f64,
    pub sign_ms: f64,
    pub send_ms: f64,
    pub receipt_ms: f64,
    pub e2e_ms: f64,
    /// `max(0, send - prepare - sign)`. An approximation only: the
    /// standalone prepare/sign calls are not guaranteed to cost the same
    /// as the ones performed inside send.
    pub pure_send_ms: f64,
}

impl TimingPhases {
    /// Clamped subtraction used for `pure_send_ms`
    pub fn derive_pure_send(send_ms: f64, prepare_ms: f64, sign_ms: f64) -> f64 {
        (send_ms - prepare_ms - sign_ms).max(0.0)
    }

    /// Field values in declaration order, labelled for metrics and logs
    pub fn labelled(&self) -> [(&'static str, f64); 6] {
        [
            ("prepare", self.prepare_ms),
            ("sign", self.sign_ms),
            ("send", self.send_ms),
            ("receipt", self.receipt_ms),
            ("e2e", self.e2e_ms),
            ("pure_send", self.pure_send_ms),
        ]
    }

    /// Per-field arithmetic mean, rounded to hundredths.
    /// Returns `None` when there are no samples.
    pub fn average(samples: &[TimingPhases]) -> Option<TimingPhases> {
        if samples.is_empty() {
            return None;
        }

        let sum = samples.iter().fold(TimingPhases::default(), |acc, s| TimingPhases {
            prepare_ms: acc.prepare_ms + s.prepare_ms,
            sign_ms: acc.sign_ms + s.sign_ms,
            send_ms: acc.send_ms + s.send_ms,
            receipt_ms: acc.receipt_ms + s.receipt_ms,
            e2e_ms: acc.e2e_ms + s.e2e_ms,
            pure_send_ms: acc.pure_send_ms + s.pure_send_ms,
        });

        let count = samples.len() as f64;
        let mean = |total: f64| round_hundredths(total / count);

        Some(TimingPhases {
            prepare_ms: mean(sum.prepare_ms),
            sign_ms: mean(sum.sign_ms),
            send_ms: mean(sum.send_ms),
            receipt_ms: mean(sum.receipt_ms),
            e2e_ms: mean(sum.e2e_ms),
            pure_send_ms: mean(sum.pure_send_ms),
        })
    }
}

impl std::fmt::Display for TimingPhases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "prepare: {:>8.2}ms | sign: {:>7.2}ms | send: {:>8.2}ms | receipt: {:>8.2}ms | e2e: {:>8.2}ms | pure send: {:>8.2}ms",
            self.prepare_ms, self.sign_ms, self.send_ms, self.receipt_ms, self.e2e_ms, self.pure_send_ms
        )
    }
}

/// Round to two decimals, halves going up
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Accumulates phase durations for exactly one trial.
///
/// A fresh collector starts with every phase at zero. Plugins record phases
/// as they go; the harness calls [`TimingCollector::snapshot`] once the trial
/// has succeeded and drops the collector otherwise.
#[derive(Debug, Clone, Default)]
pub struct TimingCollector {
    prepare: Duration,
    sign: Duration,
    send: Duration,
    receipt: Duration,
    e2e: Duration,
}

impl TimingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the duration of a phase
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        let slot = match phase {
            Phase::Prepare => &mut self.prepare,
            Phase::Sign => &mut self.sign,
            Phase::Send => &mut self.send,
            Phase::Receipt => &mut self.receipt,
            Phase::EndToEnd => &mut self.e2e,
        };
        *slot = elapsed;
    }

    /// Await `fut` and record how long it took under `phase`.
    /// The phase is recorded even if the future resolves to an error.
    pub async fn measure<F>(&mut self, phase: Phase, fut: F) -> F::Output
    where
        F: Future,
    {
        let start = Instant::now();
        let output = fut.await;
        let elapsed = start.elapsed();
        trace!(phase = phase.as_str(), elapsed_ms = as_millis(elapsed), "phase timed");
        self.record(phase, elapsed);
        output
    }

    pub fn get(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Prepare => self.prepare,
            Phase::Sign => self.sign,
            Phase::Send => self.send,
            Phase::Receipt => self.receipt,
            Phase::EndToEnd => self.e2e,
        }
    }

    /// Freeze the current values into milliseconds
    pub fn snapshot(&self) -> TimingPhases {
        let prepare_ms = as_millis(self.prepare);
        let sign_ms = as_millis(self.sign);
        let send_ms = as_millis(self.send);

        TimingPhases {
            prepare_ms,
            sign_ms,
            send_ms,
            receipt_ms: as_millis(self.receipt),
            e2e_ms: as_millis(self.e2e),
            pure_send_ms: TimingPhases::derive_pure_send(send_ms, prepare_ms, sign_ms),
        }
    }
}

#[inline]
fn as_millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn phases(v: f64) -> TimingPhases {
        TimingPhases {
            prepare_ms: v,
            sign_ms: v,
            send_ms: v,
            receipt_ms: v,
            e2e_ms: v,
            pure_send_ms: v,
        }
    }

    #[test]
    fn test_fresh_collector_is_zero() {
        assert_eq!(TimingCollector::new().snapshot(), TimingPhases::default());
    }

    #[test]
    fn test_snapshot_derives_pure_send() {
        let mut c = TimingCollector::new();
        c.record(Phase::Prepare, Duration::from_millis(120));
        c.record(Phase::Sign, Duration::from_millis(5));
        c.record(Phase::Send, Duration::from_millis(525));
        c.record(Phase::Receipt, Duration::from_millis(2000));
        c.record(Phase::EndToEnd, Duration::from_millis(2525));

        let t = c.snapshot();
        assert_eq!(t.prepare_ms, 120.0);
        assert_eq!(t.send_ms, 525.0);
        assert_eq!(t.pure_send_ms, 400.0);
        assert_eq!(t.e2e_ms, 2525.0);
    }

    #[test]
    fn test_pure_send_clamped_at_zero() {
        let mut c = TimingCollector::new();
        c.record(Phase::Prepare, Duration::from_millis(300));
        c.record(Phase::Sign, Duration::from_millis(50));
        c.record(Phase::Send, Duration::from_millis(200));
        assert_eq!(c.snapshot().pure_send_ms, 0.0);
    }

    #[test]
    fn test_phase_labels_match_snapshot_labels() {
        let labels: Vec<&str> = TimingPhases::default().labelled().iter().map(|(l, _)| *l).collect();
        for phase in [Phase::Prepare, Phase::Sign, Phase::Send, Phase::Receipt, Phase::EndToEnd] {
            assert!(labels.contains(&phase.as_str()));
        }
    }

    #[test]
    fn test_record_overwrites() {
        let mut c = TimingCollector::new();
        c.record(Phase::Sign, Duration::from_millis(10));
        c.record(Phase::Sign, Duration::from_millis(4));
        assert_eq!(c.get(Phase::Sign), Duration::from_millis(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_records_even_on_error() {
        let mut c = TimingCollector::new();
        let out: Result<(), &str> = c
            .measure(Phase::Receipt, async {
                tokio::time::sleep(Duration::from_millis(750)).await;
                Err("timeout")
            })
            .await;

        assert!(out.is_err());
        assert_eq!(c.get(Phase::Receipt), Duration::from_millis(750));
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(round_hundredths(12.3456), 12.35);
        assert_eq!(round_hundredths(12.344), 12.34);
        assert_eq!(round_hundredths(0.125), 0.13);
        assert_eq!(round_hundredths(0.0), 0.0);
    }

    #[test]
    fn test_average_rounds_only_the_mean() {
        // rounding each sample first would give 0.0 here
        let samples = [phases(0.004), phases(0.004), phases(0.010)];
        let avg = TimingPhases::average(&samples).unwrap();
        assert_eq!(avg.prepare_ms, 0.01);

        let samples = [phases(12.3456)];
        assert_eq!(TimingPhases::average(&samples).unwrap(), phases(12.35));
    }

    #[test]
    fn test_average_empty() {
        assert!(TimingPhases::average(&[]).is_none());
    }

    proptest! {
        #[test]
        fn prop_pure_send_is_clamped_difference(
            prepare in 0u64..10_000,
            sign in 0u64..10_000,
            send in 0u64..20_000,
        ) {
            let mut c = TimingCollector::new();
            c.record(Phase::Prepare, Duration::from_millis(prepare));
            c.record(Phase::Sign, Duration::from_millis(sign));
            c.record(Phase::Send, Duration::from_millis(send));
            let t = c.snapshot();

            prop_assert!(t.pure_send_ms >= 0.0);
            let expected = (send as f64 - prepare as f64 - sign as f64).max(0.0);
            prop_assert!((t.pure_send_ms - expected).abs() < 1e-9);
        }

        #[test]
        fn prop_average_within_sample_bounds(values in prop::collection::vec(0.0f64..100_000.0, 1..50)) {
            let samples: Vec<TimingPhases> = values.iter().copied().map(phases).collect();
            let avg = TimingPhases::average(&samples).unwrap();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            for (_, v) in avg.labelled() {
                prop_assert!(v >= min - 0.01);
                prop_assert!(v <= max + 0.01);
            }
        }
    }
}
