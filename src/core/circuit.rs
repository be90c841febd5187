//! Per-client circuit breaker.
//!
//! Two observable states only: closed, or open until a cooldown deadline.
//! Once the deadline passes the next caller is admitted as a single probe;
//! admitting it re-arms the deadline so concurrent callers keep getting
//! rejected while the probe is in flight. The probe's outcome then closes the
//! circuit (success) or re-opens it for another cooldown (failure).

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::provider::CircuitSettings;

/// Snapshot of the breaker's mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitState {
    /// Consecutive failed calls (not attempts).
    pub consecutive_failures: u32,
    pub open: bool,
    /// Wall-clock deadline after which one probe is admitted.
    pub open_until: Option<Instant>,
}

impl CircuitState {
    const fn closed() -> Self {
        Self {
            consecutive_failures: 0,
            open: false,
            open_until: None,
        }
    }
}

/// What the breaker allows the next call to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed: full retry budget.
    Allowed,
    /// Cooldown elapsed: exactly one attempt, no retries.
    Probe,
    /// Circuit open: fail without touching the network.
    Rejected,
}

/// Consecutive-failure circuit breaker. All reads and writes go through one lock.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(settings: CircuitSettings) -> Self {
        Self {
            state: Mutex::new(CircuitState::closed()),
            threshold: settings.failure_threshold,
            cooldown: settings.cooldown,
        }
    }

    const fn enabled(&self) -> bool {
        self.threshold > 0
    }

    /// Decide whether a call may proceed.
    pub async fn admit(&self) -> Admission {
        if !self.enabled() {
            return Admission::Allowed;
        }
        let mut state = self.state.lock().await;
        if !state.open {
            return Admission::Allowed;
        }
        let now = Instant::now();
        match state.open_until {
            Some(deadline) if now < deadline => Admission::Rejected,
            _ => {
                state.open_until = Some(now + self.cooldown);
                tracing::info!(
                    failures = state.consecutive_failures,
                    "circuit cooldown elapsed, admitting probe"
                );
                Admission::Probe
            }
        }
    }

    /// Whether a call right now would be rejected.
    pub async fn is_open(&self) -> bool {
        if !self.enabled() {
            return false;
        }
        let state = self.state.lock().await;
        state.consecutive_failures >= self.threshold
            && state.open_until.is_some_and(|deadline| Instant::now() < deadline)
    }

    /// Record a successful call: reset the counter and close the circuit.
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        if state.open {
            tracing::info!("circuit closed after successful call");
        }
        *state = CircuitState::closed();
    }

    /// Record a call that exhausted its retries.
    pub async fn record_failure(&self) {
        if !self.enabled() {
            return;
        }
        let mut state = self.state.lock().await;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.threshold {
            state.open = true;
            state.open_until = Some(Instant::now() + self.cooldown);
            tracing::warn!(
                failures = state.consecutive_failures,
                threshold = self.threshold,
                cooldown_ms = u64::try_from(self.cooldown.as_millis()).unwrap_or(u64::MAX),
                "circuit opened"
            );
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> CircuitState {
        *self.state.lock().await
    }
}
