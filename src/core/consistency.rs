//! Cross-provider consistency checking.
//!
//! Hashes are only comparable when they were fetched for the same block
//! number. A round therefore runs in two phases:
//!
//! 1. collect every provider's height and take the minimum as the
//!    *reference height*;
//! 2. ask every provider that answered phase 1 for its block hash **at the
//!    reference height**, never at its own tip.
//!
//! [`check_consistency`] is the pure evaluation step; [`run_consistency_round`]
//! drives both phases through the fan-out executor.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::client::{CallResult, ResilientClient};
use super::executor::{FanOut, ProbeOutcome};
use super::provider::ProviderSpec;
use super::rpc::BlockTag;
use super::thresholds::Thresholds;
use crate::error::{CallError, CallErrorKind};

// =============================================================================
// Phase records
// =============================================================================

/// Phase 1 observation: one provider's tip height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightRecord {
    pub provider: String,
    /// `None` when the provider did not answer.
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl HeightRecord {
    #[must_use]
    pub fn ok(provider: impl Into<String>, height: u64) -> Self {
        Self {
            provider: provider.into(),
            height: Some(height),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(provider: impl Into<String>, error: CallError) -> Self {
        Self {
            provider: provider.into(),
            height: None,
            error: Some(error),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.height.is_some()
    }

    fn from_call(provider: &str, height: Option<u64>, result: &CallResult) -> Self {
        Self {
            provider: provider.to_string(),
            height,
            error: result.error().cloned(),
        }
    }
}

impl ProbeOutcome for HeightRecord {
    fn failed(provider: &ProviderSpec, error: CallError) -> Self {
        Self::failure(provider.name.clone(), error)
    }
}

/// Phase 2 observation: one provider's hash at the reference height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashRecord {
    pub provider: String,
    pub height: u64,
    /// `None` when the provider did not answer phase 2.
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl HashRecord {
    #[must_use]
    pub fn ok(provider: impl Into<String>, height: u64, hash: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            height,
            hash: Some(hash.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn missing(provider: impl Into<String>, height: u64, error: CallError) -> Self {
        Self {
            provider: provider.into(),
            height,
            hash: None,
            error: Some(error),
        }
    }
}

/// Fan-out wrapper: phase 2 records need the reference height, which the
/// failure constructor does not know, so it is filled in afterwards.
struct PhaseTwo(HashRecord);

impl ProbeOutcome for PhaseTwo {
    fn failed(provider: &ProviderSpec, error: CallError) -> Self {
        Self(HashRecord::missing(provider.name.clone(), 0, error))
    }
}

// =============================================================================
// Report
// =============================================================================

/// Providers that reported the same hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashGroup {
    pub hash: String,
    pub providers: Vec<String>,
}

/// Per-provider height position within the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHeight {
    pub provider: String,
    pub height: Option<u64>,
    /// Blocks behind the highest provider.
    pub lag: Option<u64>,
}

/// Outcome of one consistency round. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub max_height: u64,
    /// Provider reporting `max_height`.
    pub authoritative: Option<String>,
    /// Minimum reported height; the only height hashes are compared at.
    pub reference_height: u64,
    pub height_variance: u64,
    pub height_consensus: bool,
    pub heights: Vec<ProviderHeight>,
    /// Sorted by group size, largest first.
    pub hash_groups: Vec<HashGroup>,
    pub hash_consensus: bool,
    pub consistent: bool,
    pub issues: Vec<String>,
}

impl ConsistencyReport {
    fn empty() -> Self {
        Self {
            max_height: 0,
            authoritative: None,
            reference_height: 0,
            height_variance: 0,
            height_consensus: false,
            heights: Vec::new(),
            hash_groups: Vec::new(),
            hash_consensus: false,
            consistent: false,
            issues: vec!["no successful heights available".to_string()],
        }
    }

    /// Providers outside the largest hash group.
    #[must_use]
    pub fn minority_providers(&self) -> Vec<&str> {
        self.hash_groups
            .iter()
            .skip(1)
            .flat_map(|g| g.providers.iter().map(String::as_str))
            .collect()
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate one round's phase 1 and phase 2 records.
///
/// `reference_height` is what the caller used for phase 2; it is re-derived
/// from `heights` and a mismatch is logged.
#[must_use]
pub fn check_consistency(
    heights: &[HeightRecord],
    hashes_at_reference: &[HashRecord],
    reference_height: u64,
    thresholds: &Thresholds,
) -> ConsistencyReport {
    let reported: Vec<(&str, u64)> = heights
        .iter()
        .filter_map(|r| r.height.map(|h| (r.provider.as_str(), h)))
        .collect();

    // First provider wins ties for the authoritative slot.
    let Some((authoritative, max_height)) = reported
        .iter()
        .copied()
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
    else {
        return ConsistencyReport::empty();
    };
    let min_height = reported.iter().map(|&(_, h)| h).min().unwrap_or(max_height);

    if min_height != reference_height {
        tracing::warn!(
            passed = reference_height,
            derived = min_height,
            "reference height does not match minimum reported height, using minimum"
        );
    }

    let mut issues = Vec::new();
    let height_variance = max_height - min_height;
    let height_consensus = height_variance <= thresholds.height_drift;
    if !height_consensus {
        issues.push(format!(
            "height variance {height_variance} blocks exceeds allowed drift {} (max {max_height} from {authoritative}, min {min_height})",
            thresholds.height_drift
        ));
    }

    let hash_groups = group_hashes(hashes_at_reference, min_height);
    let hash_consensus = hash_groups.len() == 1;
    match hash_groups.split_first() {
        None => issues.push(format!(
            "no block hashes available at reference height {min_height}"
        )),
        Some((majority, minorities)) => {
            for group in minorities {
                issues.push(format!(
                    "hash mismatch at height {min_height}: [{}] report {} while [{}] report {} (possible reorg or stale cache)",
                    group.providers.join(", "),
                    group.hash,
                    majority.providers.join(", "),
                    majority.hash,
                ));
            }
        }
    }

    let heights_view = heights
        .iter()
        .map(|r| ProviderHeight {
            provider: r.provider.clone(),
            height: r.height,
            lag: r.height.map(|h| max_height.saturating_sub(h)),
        })
        .collect();

    let consistent = height_consensus && hash_consensus;
    for issue in &issues {
        tracing::warn!(issue = %issue, "consistency issue");
    }

    ConsistencyReport {
        max_height,
        authoritative: Some(authoritative.to_string()),
        reference_height: min_height,
        height_variance,
        height_consensus,
        heights: heights_view,
        hash_groups,
        hash_consensus,
        consistent,
        issues,
    }
}

/// Group providers by hash, largest group first (ties by hash).
/// Missing hashes and records for other heights are ignored.
fn group_hashes(records: &[HashRecord], height: u64) -> Vec<HashGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut members: HashMap<String, Vec<String>> = HashMap::new();

    for record in records {
        if record.height != height {
            tracing::debug!(
                provider = %record.provider,
                record_height = record.height,
                reference_height = height,
                "ignoring hash fetched at a different height"
            );
            continue;
        }
        let Some(hash) = record.hash.as_deref().filter(|h| !h.is_empty()) else {
            continue;
        };
        let key = hash.to_lowercase();
        members
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key.clone());
                Vec::new()
            })
            .push(record.provider.clone());
    }

    let mut groups: Vec<HashGroup> = order
        .into_iter()
        .filter_map(|hash| {
            members
                .remove(&hash)
                .map(|providers| HashGroup { hash, providers })
        })
        .collect();
    groups.sort_by(|a, b| {
        b.providers
            .len()
            .cmp(&a.providers.len())
            .then_with(|| a.hash.cmp(&b.hash))
    });
    groups
}

// =============================================================================
// Round driver
// =============================================================================

/// Run phase 1 and phase 2 across `providers` and evaluate the result.
///
/// Always returns a report: failed providers are simply absent from the
/// comparison.
pub async fn run_consistency_round(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
    thresholds: &Thresholds,
) -> ConsistencyReport {
    let heights = collect_heights(fanout, ctx, providers).await;

    let Some(reference_height) = heights.iter().filter_map(|r| r.height).min() else {
        return check_consistency(&heights, &[], 0, thresholds);
    };

    let reachable: Vec<ProviderSpec> = providers
        .iter()
        .zip(&heights)
        .filter(|(_, record)| record.success())
        .map(|(spec, _)| spec.clone())
        .collect();

    tracing::debug!(
        reference_height,
        providers = reachable.len(),
        "fetching hashes at reference height"
    );
    let hashes = collect_hashes_at(fanout, ctx, &reachable, reference_height).await;

    check_consistency(&heights, &hashes, reference_height, thresholds)
}

/// Phase 1: `eth_blockNumber` on every provider.
pub async fn collect_heights(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
) -> Vec<HeightRecord> {
    fanout
        .execute_all(ctx, providers, |client: Arc<ResilientClient>, spec, ctx| async move {
            let (height, result) = client.block_number(&ctx).await;
            HeightRecord::from_call(&spec.name, height, &result)
        })
        .await
}

/// Phase 2: block hash at exactly `height` on every given provider.
pub async fn collect_hashes_at(
    fanout: &FanOut,
    ctx: &CancellationToken,
    providers: &[ProviderSpec],
    height: u64,
) -> Vec<HashRecord> {
    let results: Vec<PhaseTwo> = fanout
        .execute_all(ctx, providers, move |client: Arc<ResilientClient>, spec, ctx| async move {
            let (block, result) = client
                .block_by_number(&ctx, BlockTag::Number(height), false)
                .await;
            match (block, result.error()) {
                (Some(block), _) if block.number == height => {
                    PhaseTwo(HashRecord::ok(spec.name, height, block.hash))
                }
                (Some(block), _) => PhaseTwo(HashRecord::missing(
                    spec.name,
                    height,
                    CallError::new(
                        CallErrorKind::ParseError,
                        format!("asked for block {height}, got {}", block.number),
                    ),
                )),
                (None, Some(error)) => {
                    PhaseTwo(HashRecord::missing(spec.name, height, error.clone()))
                }
                (None, None) => PhaseTwo(HashRecord::missing(
                    spec.name,
                    height,
                    CallError::new(CallErrorKind::Unknown, "no block returned"),
                )),
            }
        })
        .await;

    results
        .into_iter()
        .map(|PhaseTwo(mut record)| {
            record.height = height;
            record
        })
        .collect()
}
