//! Probing core: resilient clients, fan-out, consistency and scoring.

pub mod circuit;
pub mod client;
pub mod consistency;
pub mod executor;
pub mod http;
pub mod logging;
pub mod models;
pub mod provider;
pub mod rounds;
pub mod rpc;
pub mod scoring;
pub mod stats;
pub mod thresholds;

pub use circuit::{Admission, CircuitBreaker, CircuitState};
pub use client::{CallResult, ResilientClient};
pub use consistency::{
    ConsistencyReport, HashGroup, HashRecord, HeightRecord, ProviderHeight, check_consistency,
    run_consistency_round,
};
pub use executor::{ClientPool, FanOut, ProbeOutcome, deadline_token};
pub use models::{BestPayload, RobotOutput, WatchRound, WatchSummary};
pub use provider::{CircuitSettings, ProviderSpec, RetryPolicy};
pub use rounds::{HealthCheck, LatencyProfile, health_round, latency_profile};
pub use rpc::{Block, BlockTag};
pub use scoring::{
    AutoSelection, HealthStatus, ProviderHealth, ProviderSamples, RankedProviders, SamplingPlan,
    Selection, auto_select, rank_providers, score_providers,
};
pub use stats::{TailLatency, tail_latency};
pub use thresholds::Thresholds;
