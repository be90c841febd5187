//! Machine-readable output envelope and command payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::consistency::ConsistencyReport;
use super::rounds::HealthCheck;
use super::rpc::Block;
use super::scoring::{RankedProviders, Selection};

pub const SCHEMA_VERSION: &str = "chainprobe.v1";

/// Envelope wrapped around every `--json` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
    /// Non-fatal findings (consistency issues, selection warnings).
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Payload of `chainprobe best`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPayload {
    pub selection: Selection,
    /// Latest block fetched from the winner, if the follow-up call succeeded.
    pub latest_block: Option<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_error: Option<String>,
    pub ranking: RankedProviders,
}

/// One completed round of `chainprobe watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRound {
    pub round: u64,
    pub at: DateTime<Utc>,
    pub health: Vec<HealthCheck>,
    pub consistency: ConsistencyReport,
}

/// Totals printed when `chainprobe watch` stops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSummary {
    pub rounds: u64,
    pub inconsistent_rounds: u64,
    /// Provider probes that failed, summed over all rounds.
    pub failed_probes: u64,
    pub elapsed_secs: u64,
}

impl WatchSummary {
    pub fn record(&mut self, round: &WatchRound) {
        self.rounds += 1;
        if !round.consistency.consistent {
            self.inconsistent_rounds += 1;
        }
        self.failed_probes += round.health.iter().filter(|h| !h.healthy).count() as u64;
    }
}
