//! Provider identity and per-provider call policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default backoff before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
/// Default backoff ceiling.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);
/// Default consecutive failed calls before the circuit opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default time the circuit stays open.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Retry and backoff parameters for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Deterministic part of the backoff before retry number `attempt` (0-based):
    /// `min(initial * 2^attempt, max)`.
    #[must_use]
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Longest total backoff a call can sleep through, jitter included.
    #[must_use]
    pub fn backoff_budget(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.base_backoff(attempt) * 3 / 2)
            .sum()
    }
}

/// Circuit breaker parameters for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSettings {
    /// Consecutive failed calls before the circuit opens. `0` disables the breaker.
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// One monitored RPC endpoint. Immutable once resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    /// Unique key.
    pub name: String,
    pub url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub circuit: CircuitSettings,
}

impl ProviderSpec {
    /// Create a spec with default timeout, retry and circuit settings.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            circuit: CircuitSettings::default(),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_circuit(mut self, circuit: CircuitSettings) -> Self {
        self.circuit = circuit;
        self
    }

    /// Worst-case wall time of one logical call: every attempt timing out
    /// plus the full backoff budget.
    #[must_use]
    pub fn call_budget(&self) -> Duration {
        self.timeout * self.retry.max_retries.saturating_add(1) + self.retry.backoff_budget()
    }
}
