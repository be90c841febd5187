//! Resilient per-provider RPC client.
//!
//! One logical call = up to `max_retries + 1` attempts with exponential
//! backoff and half-range jitter, guarded by a per-client circuit breaker.
//! The breaker sees exactly one success or failure per logical call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::circuit::{Admission, CircuitBreaker, CircuitState};
use super::http::build_client;
use super::provider::ProviderSpec;
use super::rpc::{
    Block, BlockTag, JsonRpcRequest, JsonRpcResponse, METHOD_BLOCK_BY_NUMBER, METHOD_BLOCK_NUMBER,
    block_by_number_params, decode_block_number,
};
use crate::error::{CallError, CallErrorKind, Result};

// =============================================================================
// Call Result
// =============================================================================

/// Outcome of one logical call, after retries.
#[derive(Debug, Clone)]
pub struct CallResult {
    /// Decoded `result` payload or the classified final error.
    pub outcome: std::result::Result<Value, CallError>,
    /// Duration of the final attempt. Zero for pre-flight rejections.
    pub latency: Duration,
    /// Retries consumed (attempts - 1).
    pub retries: u32,
}

impl CallResult {
    #[must_use]
    pub const fn success(payload: Value, latency: Duration, retries: u32) -> Self {
        Self {
            outcome: Ok(payload),
            latency,
            retries,
        }
    }

    #[must_use]
    pub const fn failure(error: CallError, latency: Duration, retries: u32) -> Self {
        Self {
            outcome: Err(error),
            latency,
            retries,
        }
    }

    /// Failure that never reached the network.
    #[must_use]
    pub const fn rejected(error: CallError) -> Self {
        Self::failure(error, Duration::ZERO, 0)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&CallError> {
        self.outcome.as_ref().err()
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<CallErrorKind> {
        self.error().map(|e| e.kind)
    }
}

// =============================================================================
// Resilient Client
// =============================================================================

/// RPC client bound to one provider.
#[derive(Debug)]
pub struct ResilientClient {
    spec: ProviderSpec,
    http: Client,
    breaker: CircuitBreaker,
    next_id: AtomicU64,
}

impl ResilientClient {
    /// Create a client for `spec`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(spec: ProviderSpec) -> Result<Self> {
        let http = build_client(spec.timeout)?;
        Ok(Self {
            breaker: CircuitBreaker::new(spec.circuit),
            spec,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub const fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Whether the next call would be rejected without a network attempt.
    pub async fn is_circuit_open(&self) -> bool {
        self.breaker.is_open().await
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.breaker.snapshot().await
    }

    /// Execute one logical JSON-RPC call.
    ///
    /// Never returns an error: every failure, including cancellation, is
    /// captured in the returned [`CallResult`]. Cancellation is reported as
    /// `timeout` and is not counted against the circuit.
    pub async fn call(&self, ctx: &CancellationToken, method: &str, params: Value) -> CallResult {
        self.call_decoded(ctx, method, params, |payload| Ok(payload.clone()))
            .await
            .1
    }

    /// `eth_blockNumber`.
    pub async fn block_number(&self, ctx: &CancellationToken) -> (Option<u64>, CallResult) {
        self.call_decoded(
            ctx,
            METHOD_BLOCK_NUMBER,
            Value::Array(Vec::new()),
            decode_block_number,
        )
        .await
    }

    /// `eth_getBlockByNumber`.
    pub async fn block_by_number(
        &self,
        ctx: &CancellationToken,
        tag: BlockTag,
        full_transactions: bool,
    ) -> (Option<Block>, CallResult) {
        let params = block_by_number_params(tag, full_transactions);
        self.call_decoded(ctx, METHOD_BLOCK_BY_NUMBER, params, Block::from_value)
            .await
    }

    /// Run the call and decode its payload as part of the same logical call.
    ///
    /// A payload `decode` rejects is a non-retryable `parse_error`, so the
    /// breaker records one outcome per call: success only once decoding
    /// succeeded.
    async fn call_decoded<T, D>(
        &self,
        ctx: &CancellationToken,
        method: &str,
        params: Value,
        decode: D,
    ) -> (Option<T>, CallResult)
    where
        D: Fn(&Value) -> std::result::Result<T, CallError>,
    {
        let max_attempts = match self.breaker.admit().await {
            Admission::Rejected => {
                tracing::debug!(provider = %self.spec.name, method, "circuit open, rejecting call");
                return (None, CallResult::rejected(CallError::circuit_open(&self.spec.name)));
            }
            Admission::Probe => 1,
            Admission::Allowed => self.spec.retry.max_retries.saturating_add(1),
        };

        let mut attempt: u32 = 0;
        loop {
            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                () = ctx.cancelled() => None,
                res = self.attempt(method, &params) => Some(res),
            };
            let latency = started.elapsed();

            let error = match outcome {
                None => return (None, cancelled(latency, attempt)),
                Some(Ok(payload)) => match decode(&payload) {
                    Ok(value) => {
                        self.breaker.record_success().await;
                        tracing::trace!(
                            provider = %self.spec.name,
                            method,
                            latency_ms = duration_ms(latency),
                            retries = attempt,
                            "call succeeded"
                        );
                        return (Some(value), CallResult::success(payload, latency, attempt));
                    }
                    Err(error) => error,
                },
                Some(Err(error)) => error,
            };

            let attempts_left = attempt + 1 < max_attempts;
            if !error.is_retryable() || !attempts_left {
                self.breaker.record_failure().await;
                tracing::debug!(
                    provider = %self.spec.name,
                    method,
                    kind = %error.kind,
                    retries = attempt,
                    error = %error.message,
                    "call failed"
                );
                return (None, CallResult::failure(error, latency, attempt));
            }

            let delay = self.backoff(attempt);
            tracing::debug!(
                provider = %self.spec.name,
                method,
                attempt = attempt + 1,
                max_attempts,
                kind = %error.kind,
                delay_ms = duration_ms(delay),
                "retrying after backoff"
            );
            tokio::select! {
                biased;
                () = ctx.cancelled() => return (None, cancelled(latency, attempt)),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    /// Backoff before retry `attempt`: base plus uniform jitter in `[0, base/2)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.spec.retry.base_backoff(attempt);
        let half = u64::try_from((base / 2).as_nanos()).unwrap_or(u64::MAX);
        let jitter = if half > 0 {
            rand::rng().random_range(0..half)
        } else {
            0
        };
        base + Duration::from_nanos(jitter)
    }

    async fn attempt(&self, method: &str, params: &Value) -> std::result::Result<Value, CallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&JsonRpcRequest::new(id, method, params)).map_err(|e| {
            CallError::new(CallErrorKind::ParseError, format!("encode request: {e}"))
        })?;

        let response = self
            .http
            .post(&self.spec.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::from_status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let envelope: JsonRpcResponse = serde_json::from_slice(&bytes).map_err(|e| {
            CallError::new(CallErrorKind::ParseError, format!("malformed response: {e}"))
        })?;
        envelope.into_result()
    }
}

fn cancelled(latency: Duration, retries: u32) -> CallResult {
    CallResult::failure(
        CallError::new(CallErrorKind::Timeout, "cancelled"),
        latency,
        retries,
    )
}

/// Milliseconds as `u64` for log fields.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
