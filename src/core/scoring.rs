//! Provider scoring, ranking and best-provider selection.
//!
//! Each provider is sampled with several `eth_blockNumber` calls (serial per
//! provider, parallel across providers). The samples are reduced to a success
//! rate, latency figures and a block delta, which feed a status, a composite
//! score and an exclusion decision.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::client::{CallResult, ResilientClient};
use super::executor::{FanOut, ProbeOutcome, deadline_token};
use super::provider::ProviderSpec;
use super::stats::{mean, tail_latency};
use super::thresholds::Thresholds;
use crate::error::{CallError, CallErrorKind, ChainProbeError, Result};

const WEIGHT_SUCCESS: f64 = 0.5;
const WEIGHT_LATENCY: f64 = 0.3;
const WEIGHT_FRESHNESS: f64 = 0.2;
/// P95 at or above this earns no latency credit.
const LATENCY_CEILING_MS: f64 = 1_000.0;
/// Block delta at or above this earns no freshness credit.
const DELTA_CEILING: f64 = 10.0;

// =============================================================================
// Sampling
// =============================================================================

/// How many samples to take per provider, how far apart, and how long the
/// whole sampling pass may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    pub samples: u32,
    pub delay: Duration,
    /// Round deadline. Providers still sampling when it fires keep the
    /// samples they already took.
    pub deadline: Option<Duration>,
}

impl Default for SamplingPlan {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(100))
    }
}

impl SamplingPlan {
    #[must_use]
    pub const fn new(samples: u32, delay: Duration) -> Self {
        Self {
            samples,
            delay,
            deadline: None,
        }
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Token for one sampling pass under `ctx`, bounded by the deadline.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn round_token(&self, ctx: &CancellationToken) -> CancellationToken {
        self.deadline
            .map_or_else(|| ctx.child_token(), |after| deadline_token(ctx, after))
    }
}

/// Raw samples collected from one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSamples {
    pub provider: String,
    pub attempts: u32,
    pub successes: u32,
    /// Latencies of successful samples only.
    pub latencies: Vec<Duration>,
    /// Most recent height observed.
    pub last_height: Option<u64>,
    pub last_error: Option<CallError>,
}

impl ProviderSamples {
    #[must_use]
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Record one `eth_blockNumber` outcome.
    pub fn record(&mut self, height: Option<u64>, result: &CallResult) {
        self.attempts += 1;
        match (height, result.error()) {
            (Some(height), _) => {
                self.successes += 1;
                self.latencies.push(result.latency);
                self.last_height = Some(height);
            }
            (None, error) => self.last_error = error.cloned(),
        }
    }

    /// Count a provider that never finished a sample before the round
    /// deadline as one timed-out attempt.
    fn mark_unsampled(&mut self) {
        if self.attempts == 0 {
            self.attempts = 1;
            self.last_error = Some(CallError::new(
                CallErrorKind::Timeout,
                "round deadline reached before any sample completed",
            ));
        }
    }

    /// Percent of attempts that succeeded; zero when nothing was attempted.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.successes) / f64::from(self.attempts) * 100.0
        }
    }
}

impl ProbeOutcome for ProviderSamples {
    fn failed(provider: &ProviderSpec, error: CallError) -> Self {
        Self {
            provider: provider.name.clone(),
            attempts: 1,
            last_error: Some(error),
            ..Self::default()
        }
    }
}

/// Take `plan.samples` height samples from one provider, one at a time.
///
/// Stops early once `ctx` is cancelled; a call cut short by cancellation is
/// not counted.
pub async fn sample_provider(
    client: &ResilientClient,
    ctx: &CancellationToken,
    plan: SamplingPlan,
) -> ProviderSamples {
    let mut samples = ProviderSamples::new(client.name());
    for i in 0..plan.samples.max(1) {
        if i > 0 && !plan.delay.is_zero() {
            tokio::select! {
                biased;
                () = ctx.cancelled() => break,
                () = tokio::time::sleep(plan.delay) => {}
            }
        }
        if ctx.is_cancelled() {
            break;
        }
        let (height, result) = client.block_number(ctx).await;
        if height.is_none() && ctx.is_cancelled() {
            break;
        }
        samples.record(height, &result);
    }
    tracing::debug!(
        provider = %samples.provider,
        attempts = samples.attempts,
        successes = samples.successes,
        "sampling finished"
    );
    samples
}

// =============================================================================
// Health
// =============================================================================

/// Coarse provider status. First matching rule wins, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Down,
    Degraded,
    Slow,
    Up,
}

impl HealthStatus {
    #[must_use]
    pub fn classify(success_rate: f64, p95: Option<Duration>, thresholds: &Thresholds) -> Self {
        if success_rate < thresholds.down_below {
            Self::Down
        } else if success_rate < thresholds.degraded_below {
            Self::Degraded
        } else if p95.is_some_and(|p95| p95 > thresholds.slow_p95()) {
            Self::Slow
        } else {
            Self::Up
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "DOWN",
            Self::Degraded => "DEGRADED",
            Self::Slow => "SLOW",
            Self::Up => "UP",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated health of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub name: String,
    pub samples: u32,
    /// Percent, 0-100.
    pub success_rate: f64,
    #[serde(rename = "avgLatencyMs", with = "crate::util::time::millis_opt")]
    pub avg_latency: Option<Duration>,
    #[serde(rename = "p95LatencyMs", with = "crate::util::time::millis_opt")]
    pub p95_latency: Option<Duration>,
    pub height: Option<u64>,
    /// Blocks behind the highest provider; `None` without a height.
    pub block_delta: Option<u64>,
    pub score: f64,
    pub status: HealthStatus,
    pub excluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<CallError>,
}

/// `0.5·success + 0.3·latency credit + 0.2·freshness credit`.
///
/// A missing P95 or block delta earns no credit for that term.
#[must_use]
pub fn composite_score(success_rate: f64, p95: Option<Duration>, block_delta: Option<u64>) -> f64 {
    let latency_credit = p95.map_or(0.0, |p95| {
        (1.0 - p95.as_secs_f64() * 1_000.0 / LATENCY_CEILING_MS).max(0.0)
    });
    #[allow(clippy::cast_precision_loss)]
    let freshness_credit =
        block_delta.map_or(0.0, |delta| (1.0 - delta as f64 / DELTA_CEILING).max(0.0));
    WEIGHT_SUCCESS * (success_rate / 100.0)
        + WEIGHT_LATENCY * latency_credit
        + WEIGHT_FRESHNESS * freshness_credit
}

fn exclusion_reason(
    success_rate: f64,
    block_delta: Option<u64>,
    thresholds: &Thresholds,
) -> Option<String> {
    let mut reasons = Vec::new();
    if success_rate < thresholds.min_success_rate {
        reasons.push(format!(
            "success rate {success_rate:.0}% below {:.0}%",
            thresholds.min_success_rate
        ));
    }
    if let Some(delta) = block_delta.filter(|&d| d > thresholds.max_block_delta) {
        reasons.push(format!(
            "{delta} blocks behind (max {})",
            thresholds.max_block_delta
        ));
    }
    (!reasons.is_empty()).then(|| reasons.join("; "))
}

/// Reduce raw samples to ranked health entries, best first.
#[must_use]
pub fn score_providers(samples: &[ProviderSamples], thresholds: &Thresholds) -> RankedProviders {
    let max_height = samples.iter().filter_map(|s| s.last_height).max();

    let mut entries: Vec<ProviderHealth> = samples
        .iter()
        .map(|s| {
            let success_rate = s.success_rate();
            let (avg_latency, p95_latency) = if s.latencies.is_empty() {
                (None, None)
            } else {
                (mean(&s.latencies), Some(tail_latency(&s.latencies).p95))
            };
            let block_delta = s
                .last_height
                .zip(max_height)
                .map(|(height, max)| max.saturating_sub(height));
            let status = HealthStatus::classify(success_rate, p95_latency, thresholds);
            let exclusion_reason = exclusion_reason(success_rate, block_delta, thresholds);

            ProviderHealth {
                name: s.provider.clone(),
                samples: s.attempts,
                success_rate,
                avg_latency,
                p95_latency,
                height: s.last_height,
                block_delta,
                score: composite_score(success_rate, p95_latency, block_delta),
                status,
                excluded: exclusion_reason.is_some(),
                exclusion_reason,
                last_error: s.last_error.clone(),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.name.cmp(&b.name))
    });

    for entry in entries.iter().filter(|e| e.excluded) {
        tracing::info!(
            provider = %entry.name,
            reason = entry.exclusion_reason.as_deref().unwrap_or_default(),
            "provider excluded from selection"
        );
    }

    RankedProviders { entries }
}

// =============================================================================
// Ranking & selection
// =============================================================================

/// Providers sorted by score descending, name ascending on ties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedProviders {
    entries: Vec<ProviderHealth>,
}

/// Outcome of [`RankedProviders::best`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub provider: ProviderHealth,
    /// Set when every provider was excluded and the least-bad one was picked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl RankedProviders {
    #[must_use]
    pub fn entries(&self) -> &[ProviderHealth] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderHealth> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Highest-ranked non-excluded provider.
    ///
    /// Falls back to the top entry with a warning when everything is
    /// excluded.
    ///
    /// # Errors
    /// [`ChainProbeError::NoProviders`] when the ranking is empty.
    pub fn best(&self) -> Result<Selection> {
        if let Some(provider) = self.entries.iter().find(|e| !e.excluded) {
            return Ok(Selection {
                provider: provider.clone(),
                warning: None,
            });
        }
        let top = self.entries.first().ok_or(ChainProbeError::NoProviders)?;
        let warning = "all providers degraded, using least-bad".to_string();
        tracing::warn!(provider = %top.name, "{warning}");
        Ok(Selection {
            provider: top.clone(),
            warning: Some(warning),
        })
    }
}

/// Sample and rank every provider.
///
/// `plan.deadline` bounds the sampling pass. When it fires, providers are
/// scored on the samples they completed; one with none counts as failed.
///
/// # Errors
/// [`ChainProbeError::NoProviders`] for an empty provider list, and
/// [`ChainProbeError::Cancelled`] when `ctx` itself was cancelled.
pub async fn rank_providers(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
    plan: SamplingPlan,
    thresholds: &Thresholds,
) -> Result<RankedProviders> {
    rank_with_clients(fanout, ctx, providers, plan, thresholds)
        .await
        .map(|(ranked, _)| ranked)
}

/// [`rank_providers`] that also returns the client used per provider, in
/// configured order.
///
/// # Errors
/// Same as [`rank_providers`].
pub async fn rank_with_clients(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
    plan: SamplingPlan,
    thresholds: &Thresholds,
) -> Result<(RankedProviders, Vec<Option<Arc<ResilientClient>>>)> {
    if providers.is_empty() {
        return Err(ChainProbeError::NoProviders);
    }

    let round = plan.round_token(ctx);
    let (mut samples, clients) = fanout
        .execute_all_with_clients(&round, providers, move |client: Arc<ResilientClient>, _spec, ctx| async move {
            sample_provider(&client, &ctx, plan).await
        })
        .await;
    let deadline_hit = round.is_cancelled();
    round.cancel();

    if ctx.is_cancelled() {
        return Err(ChainProbeError::Cancelled);
    }
    if deadline_hit {
        tracing::warn!("round deadline reached, ranking on completed samples");
        samples.iter_mut().for_each(ProviderSamples::mark_unsampled);
    }
    Ok((score_providers(&samples, thresholds), clients))
}

/// Winner of an auto-selection round, with its ready-to-use client.
#[derive(Debug, Clone)]
pub struct AutoSelection {
    pub selection: Selection,
    pub client: Arc<ResilientClient>,
    pub ranked: RankedProviders,
}

/// Rank, pick [`RankedProviders::best`] and hand back the winner's client.
///
/// # Errors
/// Same as [`rank_providers`]; also fails if the winner's client could not be
/// built.
pub async fn auto_select(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
    plan: SamplingPlan,
    thresholds: &Thresholds,
) -> Result<AutoSelection> {
    let (ranked, clients) = rank_with_clients(fanout, ctx, providers, plan, thresholds).await?;
    let selection = ranked.best()?;

    let client = providers
        .iter()
        .position(|p| p.name == selection.provider.name)
        .and_then(|i| clients.get(i).cloned().flatten())
        .ok_or_else(|| ChainProbeError::UnknownProvider(selection.provider.name.clone()))?;

    tracing::info!(
        provider = %selection.provider.name,
        score = selection.provider.score,
        status = %selection.provider.status,
        "selected provider"
    );
    Ok(AutoSelection {
        selection,
        client,
        ranked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(name: &str, ok: &[u64], failures: u32, height: Option<u64>) -> ProviderSamples {
        let successes = u32::try_from(ok.len()).unwrap();
        ProviderSamples {
            provider: name.to_string(),
            attempts: successes + failures,
            successes,
            latencies: ok.iter().copied().map(Duration::from_millis).collect(),
            last_height: height,
            last_error: (failures > 0)
                .then(|| CallError::new(CallErrorKind::Timeout, "timed out")),
        }
    }

    #[test]
    fn forty_percent_success_is_down_and_excluded() {
        let ranked = score_providers(
            &[
                samples("flaky", &[5, 5], 3, Some(100)),
                samples("solid", &[200, 200, 200, 200, 200], 0, Some(100)),
            ],
            &Thresholds::default(),
        );
        let flaky = ranked.get("flaky").unwrap();
        assert!((flaky.success_rate - 40.0).abs() < f64::EPSILON);
        assert_eq!(flaky.status, HealthStatus::Down);
        assert!(flaky.excluded);
        assert!(flaky.exclusion_reason.as_deref().unwrap().contains("40%"));
        assert_eq!(ranked.best().unwrap().provider.name, "solid");
    }

    #[test]
    fn status_rules_in_order() {
        let t = Thresholds::default();
        let fast = Some(Duration::from_millis(50));
        let slow = Some(Duration::from_millis(800));
        assert_eq!(HealthStatus::classify(49.0, fast, &t), HealthStatus::Down);
        assert_eq!(HealthStatus::classify(89.0, slow, &t), HealthStatus::Degraded);
        assert_eq!(HealthStatus::classify(100.0, slow, &t), HealthStatus::Slow);
        assert_eq!(HealthStatus::classify(100.0, fast, &t), HealthStatus::Up);
        assert_eq!(HealthStatus::classify(90.0, None, &t), HealthStatus::Up);
    }

    #[test]
    fn composite_score_terms() {
        let perfect = composite_score(100.0, Some(Duration::ZERO), Some(0));
        assert!((perfect - 1.0).abs() < 1e-9);

        let mixed = composite_score(80.0, Some(Duration::from_millis(500)), Some(5));
        assert!((mixed - (0.4 + 0.15 + 0.1)).abs() < 1e-9);

        let floor = composite_score(0.0, Some(Duration::from_secs(3)), Some(50));
        assert!(floor.abs() < 1e-9);

        assert!((composite_score(100.0, None, None) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn block_delta_against_fleet_max() {
        let ranked = score_providers(
            &[
                samples("tip", &[10, 10], 0, Some(1_000)),
                samples("lagging", &[10, 10], 0, Some(990)),
                samples("dead", &[], 2, None),
            ],
            &Thresholds::default(),
        );
        assert_eq!(ranked.get("tip").unwrap().block_delta, Some(0));
        let lagging = ranked.get("lagging").unwrap();
        assert_eq!(lagging.block_delta, Some(10));
        assert!(lagging.excluded);
        assert_eq!(lagging.status, HealthStatus::Up);
        let dead = ranked.get("dead").unwrap();
        assert_eq!(dead.block_delta, None);
        assert_eq!(dead.p95_latency, None);
        assert_eq!(dead.status, HealthStatus::Down);
    }

    #[test]
    fn ties_broken_by_name() {
        let ranked = score_providers(
            &[
                samples("zeta", &[100], 0, Some(5)),
                samples("alpha", &[100], 0, Some(5)),
                samples("mid", &[100], 0, Some(5)),
            ],
            &Thresholds::default(),
        );
        let names: Vec<_> = ranked.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn all_excluded_falls_back_with_warning() {
        let ranked = score_providers(
            &[
                samples("a", &[10], 4, Some(100)),
                samples("b", &[10, 10], 3, Some(100)),
            ],
            &Thresholds::default(),
        );
        assert!(ranked.entries().iter().all(|e| e.excluded));
        let selection = ranked.best().unwrap();
        assert_eq!(selection.provider.name, "b");
        assert_eq!(
            selection.warning.as_deref(),
            Some("all providers degraded, using least-bad")
        );
    }

    #[test]
    fn best_on_empty_ranking_is_an_error() {
        let ranked = score_providers(&[], &Thresholds::default());
        assert!(matches!(ranked.best(), Err(ChainProbeError::NoProviders)));
    }

    #[tokio::test]
    async fn rank_with_no_providers_is_an_error() {
        let result = rank_providers(
            &FanOut::new(),
            &CancellationToken::new(),
            &[],
            SamplingPlan::default(),
            &Thresholds::default(),
        )
        .await;
        assert!(matches!(result, Err(ChainProbeError::NoProviders)));
    }

    #[test]
    fn unsampled_provider_counts_as_one_timeout() {
        let mut empty = ProviderSamples::new("stuck");
        empty.mark_unsampled();
        assert_eq!(empty.attempts, 1);
        assert_eq!(
            empty.last_error.as_ref().map(|e| e.kind),
            Some(CallErrorKind::Timeout)
        );

        let mut sampled = samples("ok", &[10], 0, Some(5));
        sampled.mark_unsampled();
        assert_eq!(sampled.attempts, 1);
        assert!(sampled.last_error.is_none());
    }

    #[test]
    fn plan_deadline_builder() {
        let plan = SamplingPlan::new(3, Duration::ZERO).with_deadline(Duration::from_secs(1));
        assert_eq!(plan.deadline, Some(Duration::from_secs(1)));
        assert_eq!(SamplingPlan::default().deadline, None);
    }

    #[test]
    fn failed_outcome_counts_as_one_failed_attempt() {
        let spec = ProviderSpec::new("x", "http://127.0.0.1:1");
        let s = <ProviderSamples as ProbeOutcome>::failed(
            &spec,
            CallError::new(CallErrorKind::Unknown, "task aborted"),
        );
        assert_eq!(s.attempts, 1);
        assert!(s.success_rate().abs() < f64::EPSILON);
    }
}
