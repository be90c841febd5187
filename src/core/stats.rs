//! Tail-latency statistics using the nearest-rank method.
//!
//! With few samples P95/P99 collapse onto the maximum (any n < 20 gives
//! `p95 == max`). That is what nearest-rank means for small n.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// P50/P95/P99/Max over a sample set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailLatency {
    #[serde(with = "crate::util::time::millis")]
    pub p50: Duration,
    #[serde(with = "crate::util::time::millis")]
    pub p95: Duration,
    #[serde(with = "crate::util::time::millis")]
    pub p99: Duration,
    #[serde(with = "crate::util::time::millis")]
    pub max: Duration,
}

/// Compute tail latency. Empty input yields all zeros.
#[must_use]
pub fn tail_latency(samples: &[Duration]) -> TailLatency {
    if samples.is_empty() {
        return TailLatency::default();
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    TailLatency {
        p50: nearest_rank(&sorted, 0.50),
        p95: nearest_rank(&sorted, 0.95),
        p99: nearest_rank(&sorted, 0.99),
        max: sorted[sorted.len() - 1],
    }
}

/// Mean of the samples, `None` when empty.
#[must_use]
pub fn mean(samples: &[Duration]) -> Option<Duration> {
    let n = u32::try_from(samples.len()).ok().filter(|&n| n > 0)?;
    let total: Duration = samples.iter().sum();
    Some(total / n)
}

/// `sorted[ceil(n*p) - 1]`, clamped to the slice.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn nearest_rank(sorted: &[Duration], p: f64) -> Duration {
    let n = sorted.len();
    let rank = (n as f64 * p).ceil() as usize;
    let index = rank.saturating_sub(1).min(n - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(tail_latency(&[]), TailLatency::default());
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn single_sample_fills_every_percentile() {
        let t = tail_latency(&ms(&[42]));
        assert_eq!(t.p50, Duration::from_millis(42));
        assert_eq!(t.p95, Duration::from_millis(42));
        assert_eq!(t.max, Duration::from_millis(42));
    }

    #[test]
    fn nearest_rank_on_ten_samples() {
        // unsorted on purpose
        let t = tail_latency(&ms(&[100, 10, 90, 20, 80, 30, 70, 40, 60, 50]));
        assert_eq!(t.p50, Duration::from_millis(50));
        assert_eq!(t.p95, Duration::from_millis(100));
        assert_eq!(t.p99, Duration::from_millis(100));
        assert_eq!(t.max, Duration::from_millis(100));
    }

    #[test]
    fn small_sample_sets_collapse_p95_to_max() {
        for n in 1..20u64 {
            let samples: Vec<Duration> = (1..=n).map(Duration::from_millis).collect();
            let t = tail_latency(&samples);
            assert_eq!(t.p95, t.max, "n = {n}");
        }
        // n = 20 is the first size where P95 lands below the max
        let samples: Vec<Duration> = (1..=20).map(Duration::from_millis).collect();
        assert_eq!(tail_latency(&samples).p95, Duration::from_millis(19));
    }

    #[test]
    fn hundred_samples_separate_tail() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        let t = tail_latency(&samples);
        assert_eq!(t.p50, Duration::from_millis(50));
        assert_eq!(t.p95, Duration::from_millis(95));
        assert_eq!(t.p99, Duration::from_millis(99));
        assert_eq!(t.max, Duration::from_millis(100));
    }

    #[test]
    fn percentiles_are_monotonic_and_max_is_max() {
        let sets: [&[u64]; 4] = [
            &[5, 5, 5],
            &[1, 1000],
            &[3, 9, 1, 7, 250, 12, 8, 8, 40, 2, 19, 33, 1, 600, 4, 5, 6, 70, 2, 3, 1, 9],
            &[900, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15],
        ];
        for set in sets {
            let samples = ms(set);
            let t = tail_latency(&samples);
            assert_eq!(t.max, *samples.iter().max().unwrap());
            assert!(t.p50 <= t.p95);
            assert!(t.p95 <= t.p99);
            assert!(t.p99 <= t.max);
        }
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean(&ms(&[10, 20, 30])), Some(Duration::from_millis(20)));
    }
}
