//! Tunable decision thresholds for consistency and scoring.
//!
//! Every hardcoded cut-off used by the consistency checker and the scorer
//! lives here so it can be overridden from the `[thresholds]` config section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Decision thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Max blocks between highest and lowest provider for height consensus.
    pub height_drift: u64,
    /// Below this success rate (percent) a provider is excluded from selection.
    pub min_success_rate: f64,
    /// More blocks than this behind the fleet max excludes a provider.
    pub max_block_delta: u64,
    /// P95 above this classifies a provider as SLOW.
    pub slow_p95_ms: u64,
    /// Success rate (percent) below which a provider is DOWN.
    pub down_below: f64,
    /// Success rate (percent) below which a provider is DEGRADED.
    pub degraded_below: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            height_drift: 2,
            min_success_rate: 80.0,
            max_block_delta: 5,
            slow_p95_ms: 500,
            down_below: 50.0,
            degraded_below: 90.0,
        }
    }
}

impl Thresholds {
    /// P95 cut-off as a duration.
    #[must_use]
    pub const fn slow_p95(&self) -> Duration {
        Duration::from_millis(self.slow_p95_ms)
    }

    /// Check that percentages are in range and ordered.
    ///
    /// # Errors
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, value) in [
            ("min_success_rate", self.min_success_rate),
            ("down_below", self.down_below),
            ("degraded_below", self.degraded_below),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{name} must be between 0 and 100, got {value}"));
            }
        }
        if self.down_below > self.degraded_below {
            return Err("down_below must not exceed degraded_below".to_string());
        }
        Ok(())
    }
}
