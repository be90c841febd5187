//! One-shot fleet rounds built on the fan-out executor.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::client::ResilientClient;
use super::executor::{FanOut, ProbeOutcome};
use super::provider::ProviderSpec;
use super::scoring::{SamplingPlan, sample_provider};
use super::stats::{TailLatency, mean, tail_latency};
use crate::error::CallError;

/// Single `eth_blockNumber` probe result for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub provider: String,
    pub url: String,
    pub healthy: bool,
    pub height: Option<u64>,
    #[serde(rename = "latencyMs", with = "crate::util::time::millis")]
    pub latency: Duration,
    pub retries: u32,
    /// Circuit state after the probe.
    pub circuit_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl ProbeOutcome for HealthCheck {
    fn failed(provider: &ProviderSpec, error: CallError) -> Self {
        Self {
            provider: provider.name.clone(),
            url: provider.url.clone(),
            healthy: false,
            height: None,
            latency: Duration::ZERO,
            retries: 0,
            circuit_open: false,
            error: Some(error),
        }
    }
}

/// Probe every provider once.
pub async fn health_round(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
) -> Vec<HealthCheck> {
    fanout
        .execute_all(ctx, providers, |client: Arc<ResilientClient>, spec, ctx| async move {
            let (height, result) = client.block_number(&ctx).await;
            HealthCheck {
                provider: spec.name,
                url: spec.url,
                healthy: height.is_some(),
                height,
                latency: result.latency,
                retries: result.retries,
                circuit_open: client.is_circuit_open().await,
                error: result.error().cloned(),
            }
        })
        .await
}

/// Tail latency of one provider over its successful samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyProfile {
    pub provider: String,
    pub attempts: u32,
    pub successes: u32,
    #[serde(rename = "meanMs", with = "crate::util::time::millis_opt")]
    pub mean: Option<Duration>,
    /// `None` when no sample succeeded.
    pub tail: Option<TailLatency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<CallError>,
}

impl ProbeOutcome for LatencyProfile {
    fn failed(provider: &ProviderSpec, error: CallError) -> Self {
        Self {
            provider: provider.name.clone(),
            attempts: 0,
            successes: 0,
            mean: None,
            tail: None,
            last_error: Some(error),
        }
    }
}

/// Sample every provider `plan.samples` times and summarise latency.
///
/// Stops at `plan.deadline`, keeping whatever samples completed.
pub async fn latency_profile(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
    plan: SamplingPlan,
) -> Vec<LatencyProfile> {
    let round = plan.round_token(ctx);
    let profiles = fanout
        .execute_all(&round, providers, move |client: Arc<ResilientClient>, _spec, ctx| async move {
            let samples = sample_provider(&client, &ctx, plan).await;
            LatencyProfile {
                mean: mean(&samples.latencies),
                tail: (!samples.latencies.is_empty()).then(|| tail_latency(&samples.latencies)),
                provider: samples.provider,
                attempts: samples.attempts,
                successes: samples.successes,
                last_error: samples.last_error,
            }
        })
        .await;
    round.cancel();
    profiles
}
