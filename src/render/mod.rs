//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use crate::cli::args::OutputFormat;
use crate::core::consistency::ConsistencyReport;
use crate::core::models::BestPayload;
use crate::core::rounds::{HealthCheck, LatencyProfile};
use crate::core::scoring::RankedProviders;
use crate::error::Result;

/// Render a health round.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_health(
    checks: &[HealthCheck],
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_health(checks, no_color)),
        OutputFormat::Json => robot::render_envelope("health", checks, Vec::new(), pretty),
    }
}

/// Render a consistency report. Issues become envelope warnings.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_consistency(
    report: &ConsistencyReport,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_consistency(report, no_color)),
        OutputFormat::Json => {
            robot::render_envelope("consistency", report, report.issues.clone(), pretty)
        }
    }
}

/// Render latency profiles.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_latency(
    profiles: &[LatencyProfile],
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_latency(profiles, no_color)),
        OutputFormat::Json => robot::render_envelope("latency", profiles, Vec::new(), pretty),
    }
}

/// Render a ranking.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_ranking(
    ranked: &RankedProviders,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_ranking(ranked, no_color)),
        OutputFormat::Json => robot::render_envelope("rank", ranked, Vec::new(), pretty),
    }
}

/// Render the `best` outcome.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_best(
    payload: &BestPayload,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_best(payload, no_color)),
        OutputFormat::Json => {
            let warnings = payload.selection.warning.iter().cloned().collect();
            robot::render_envelope("best", payload, warnings, pretty)
        }
    }
}
