//! Human-readable output using `colored`.
//!
//! Plain column-aligned tables. Colors mark status only; `no_color` yields
//! byte-identical text without escape codes.

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};

use crate::core::consistency::ConsistencyReport;
use crate::core::models::{BestPayload, WatchRound, WatchSummary};
use crate::core::rounds::{HealthCheck, LatencyProfile};
use crate::core::scoring::{HealthStatus, ProviderHealth, RankedProviders};
use crate::util::{
    format_elapsed, format_height, format_latency, format_percent, format_score, short_hash,
};

/// Apply `paint` unless colors are disabled.
fn paint(text: &str, no_color: bool, style: impl FnOnce(&str) -> ColoredString) -> String {
    if no_color {
        text.to_string()
    } else {
        style(text).to_string()
    }
}

fn header(text: &str, no_color: bool) -> String {
    paint(text, no_color, |t| t.bold())
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(0).max("PROVIDER".len())
}

fn status_cell(status: HealthStatus, no_color: bool) -> String {
    let text = format!("{:<8}", status.as_str());
    paint(&text, no_color, |t| match status {
        HealthStatus::Up => t.green(),
        HealthStatus::Slow => t.yellow(),
        HealthStatus::Degraded => t.truecolor(255, 140, 0),
        HealthStatus::Down => t.red().bold(),
    })
}

fn opt_height(height: Option<u64>) -> String {
    height.map_or_else(|| "-".to_string(), format_height)
}

// =============================================================================
// health
// =============================================================================

/// Render one health round.
#[must_use]
pub fn render_health(checks: &[HealthCheck], no_color: bool) -> String {
    let width = name_width(checks.iter().map(|c| c.provider.as_str()));
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        header(
            &format!(
                "{:<width$}  {:<6}  {:>12}  {:>8}  {:>7}  NOTE",
                "PROVIDER", "STATUS", "HEIGHT", "LATENCY", "RETRIES"
            ),
            no_color
        )
    );

    for check in checks {
        let status = if check.healthy {
            paint(&format!("{:<6}", "ok"), no_color, |t| t.green())
        } else {
            paint(&format!("{:<6}", "fail"), no_color, |t| t.red().bold())
        };
        let note = match (&check.error, check.circuit_open) {
            (Some(error), _) => paint(&error.to_string(), no_color, |t| t.red()),
            (None, true) => paint("circuit open", no_color, |t| t.yellow()),
            (None, false) => String::new(),
        };
        let latency = if check.healthy {
            format_latency(check.latency)
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:<width$}  {status}  {:>12}  {:>8}  {:>7}  {note}",
            check.provider,
            opt_height(check.height),
            latency,
            check.retries,
        );
    }

    let healthy = checks.iter().filter(|c| c.healthy).count();
    let _ = write!(out, "\n{healthy}/{} providers healthy", checks.len());
    out
}

// =============================================================================
// consistency
// =============================================================================

/// Render a consistency report.
#[must_use]
pub fn render_consistency(report: &ConsistencyReport, no_color: bool) -> String {
    let mut out = String::new();

    let verdict = if report.consistent {
        paint("CONSISTENT", no_color, |t| t.green().bold())
    } else {
        paint("INCONSISTENT", no_color, |t| t.red().bold())
    };
    let _ = writeln!(out, "{verdict}");

    if let Some(authoritative) = &report.authoritative {
        let _ = writeln!(
            out,
            "max height {} ({authoritative}), reference height {}, variance {}",
            format_height(report.max_height),
            format_height(report.reference_height),
            report.height_variance,
        );
    }

    if !report.heights.is_empty() {
        let width = name_width(report.heights.iter().map(|h| h.provider.as_str()));
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            header(
                &format!("{:<width$}  {:>12}  {:>5}", "PROVIDER", "HEIGHT", "LAG"),
                no_color
            )
        );
        for row in &report.heights {
            let lag = row.lag.map_or_else(|| "-".to_string(), |l| l.to_string());
            let _ = writeln!(
                out,
                "{:<width$}  {:>12}  {:>5}",
                row.provider,
                opt_height(row.height),
                lag
            );
        }
    }

    if !report.hash_groups.is_empty() {
        let _ = writeln!(
            out,
            "\nhashes at block {}:",
            format_height(report.reference_height)
        );
        for (i, group) in report.hash_groups.iter().enumerate() {
            let hash = short_hash(&group.hash);
            let hash = if i == 0 {
                paint(&hash, no_color, |t| t.green())
            } else {
                paint(&hash, no_color, |t| t.red())
            };
            let _ = writeln!(out, "  {hash}  {}", group.providers.join(", "));
        }
    }

    if !report.issues.is_empty() {
        let _ = writeln!(out);
        for issue in &report.issues {
            let _ = writeln!(out, "{} {issue}", paint("!", no_color, |t| t.yellow().bold()));
        }
    }

    out.trim_end().to_string()
}

// =============================================================================
// latency
// =============================================================================

/// Render per-provider latency profiles.
#[must_use]
pub fn render_latency(profiles: &[LatencyProfile], no_color: bool) -> String {
    let width = name_width(profiles.iter().map(|p| p.provider.as_str()));
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        header(
            &format!(
                "{:<width$}  {:>7}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}",
                "PROVIDER", "OK", "MEAN", "P50", "P95", "P99", "MAX"
            ),
            no_color
        )
    );

    for profile in profiles {
        let ok = format!("{}/{}", profile.successes, profile.attempts);
        let Some(tail) = profile.tail else {
            let reason = profile
                .last_error
                .as_ref()
                .map_or_else(|| "no successful samples".to_string(), ToString::to_string);
            let _ = writeln!(
                out,
                "{:<width$}  {ok:>7}  {}",
                profile.provider,
                paint(&reason, no_color, |t| t.red())
            );
            continue;
        };
        let mean = profile.mean.map_or_else(|| "-".to_string(), format_latency);
        let _ = writeln!(
            out,
            "{:<width$}  {ok:>7}  {mean:>8}  {:>8}  {:>8}  {:>8}  {:>8}",
            profile.provider,
            format_latency(tail.p50),
            format_latency(tail.p95),
            format_latency(tail.p99),
            format_latency(tail.max),
        );
    }
    out.trim_end().to_string()
}

// =============================================================================
// rank / best
// =============================================================================

fn ranking_row(rank: usize, entry: &ProviderHealth, width: usize, no_color: bool) -> String {
    let latency = |d: Option<std::time::Duration>| d.map_or_else(|| "-".to_string(), format_latency);
    let delta = entry
        .block_delta
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    let mut row = format!(
        "{rank:>2}  {:<width$}  {}  {:>6}  {:>5}  {:>8}  {:>8}  {:>12}  {:>5}",
        entry.name,
        status_cell(entry.status, no_color),
        format_score(entry.score),
        format_percent(entry.success_rate),
        latency(entry.avg_latency),
        latency(entry.p95_latency),
        opt_height(entry.height),
        delta,
    );
    if let Some(reason) = &entry.exclusion_reason {
        let _ = write!(
            row,
            "  {}",
            paint(&format!("excluded: {reason}"), no_color, |t| t.dimmed())
        );
    }
    row
}

/// Render a full ranking, best first.
#[must_use]
pub fn render_ranking(ranked: &RankedProviders, no_color: bool) -> String {
    let width = name_width(ranked.entries().iter().map(|e| e.name.as_str()));
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        header(
            &format!(
                " #  {:<width$}  {:<8}  {:>6}  {:>5}  {:>8}  {:>8}  {:>12}  {:>5}",
                "PROVIDER", "STATUS", "SCORE", "OK", "AVG", "P95", "HEIGHT", "DELTA"
            ),
            no_color
        )
    );
    for (i, entry) in ranked.entries().iter().enumerate() {
        let _ = writeln!(out, "{}", ranking_row(i + 1, entry, width, no_color));
    }
    out.trim_end().to_string()
}

/// Render the outcome of `best`.
#[must_use]
pub fn render_best(payload: &BestPayload, no_color: bool) -> String {
    let mut out = String::new();
    let chosen = &payload.selection.provider;
    let _ = writeln!(
        out,
        "{} {} (score {}, {})",
        paint("selected", no_color, |t| t.bold()),
        paint(&chosen.name, no_color, |t| t.cyan().bold()),
        format_score(chosen.score),
        chosen.status,
    );
    if let Some(warning) = &payload.selection.warning {
        let _ = writeln!(out, "{} {warning}", paint("warning:", no_color, |t| t.yellow().bold()));
    }

    match (&payload.latest_block, &payload.follow_up_error) {
        (Some(block), _) => {
            let _ = write!(
                out,
                "latest block {} {}",
                format_height(block.number),
                short_hash(&block.hash),
            );
            match block.transaction_count {
                Some(txs) => {
                    let _ = writeln!(out, " ({txs} txs)");
                }
                None => out.push('\n'),
            }
        }
        (None, Some(error)) => {
            let _ = writeln!(
                out,
                "latest block unavailable: {}",
                paint(error, no_color, |t| t.red())
            );
        }
        (None, None) => {}
    }

    let _ = write!(out, "\n{}", render_ranking(&payload.ranking, no_color));
    out
}

// =============================================================================
// watch
// =============================================================================

/// Render one watch round as a compact frame.
#[must_use]
pub fn render_watch_round(round: &WatchRound, no_color: bool) -> String {
    let title = format!(
        "round {} at {}",
        round.round,
        round.at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    format!(
        "{}\n{}\n{}\n",
        header(&title, no_color),
        render_health(&round.health, no_color),
        render_consistency(&round.consistency, no_color),
    )
}

/// Render the totals printed when watch stops.
#[must_use]
pub fn render_watch_summary(summary: &WatchSummary, no_color: bool) -> String {
    format!(
        "{} {} rounds in {}, {} inconsistent, {} failed probes",
        paint("watch stopped:", no_color, |t| t.bold()),
        summary.rounds,
        format_elapsed(std::time::Duration::from_secs(summary.elapsed_secs)),
        summary.inconsistent_rounds,
        summary.failed_probes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consistency::{HashRecord, HeightRecord, check_consistency};
    use crate::core::scoring::{ProviderSamples, score_providers};
    use crate::core::thresholds::Thresholds;
    use crate::error::{CallError, CallErrorKind};
    use std::time::Duration;

    fn check(name: &str, height: Option<u64>) -> HealthCheck {
        HealthCheck {
            provider: name.to_string(),
            url: format!("https://{name}.example"),
            healthy: height.is_some(),
            height,
            latency: Duration::from_millis(42),
            retries: 0,
            circuit_open: false,
            error: height
                .is_none()
                .then(|| CallError::new(CallErrorKind::Timeout, "request timed out")),
        }
    }

    #[test]
    fn health_table_has_rows_and_summary() {
        let out = render_health(&[check("alpha", Some(1_234_567)), check("beta", None)], true);
        assert!(out.contains("PROVIDER"));
        assert!(out.contains("1,234,567"));
        assert!(out.contains("42ms"));
        assert!(out.contains("timeout: request timed out"));
        assert!(out.ends_with("1/2 providers healthy"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn consistency_lists_minority_issue() {
        let report = check_consistency(
            &[
                HeightRecord::ok("a", 100),
                HeightRecord::ok("b", 100),
                HeightRecord::ok("c", 100),
            ],
            &[
                HashRecord::ok("a", 100, "0xabc"),
                HashRecord::ok("b", 100, "0xabc"),
                HashRecord::ok("c", 100, "0xdef"),
            ],
            100,
            &Thresholds::default(),
        );
        let out = render_consistency(&report, true);
        assert!(out.starts_with("INCONSISTENT"));
        assert!(out.contains("0xabc  a, b"));
        assert!(out.contains("0xdef  c"));
        assert!(out.contains("! hash mismatch"));
    }

    #[test]
    fn ranking_shows_exclusion() {
        let samples = [
            ProviderSamples {
                provider: "good".into(),
                attempts: 5,
                successes: 5,
                latencies: vec![Duration::from_millis(20); 5],
                last_height: Some(50),
                last_error: None,
            },
            ProviderSamples {
                provider: "bad".into(),
                attempts: 5,
                successes: 2,
                latencies: vec![Duration::from_millis(20); 2],
                last_height: Some(50),
                last_error: None,
            },
        ];
        let ranked = score_providers(&samples, &Thresholds::default());
        let out = render_ranking(&ranked, true);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("good") && lines[1].contains("UP"));
        assert!(lines[2].contains("DOWN") && lines[2].contains("excluded: success rate 40%"));
    }

    #[test]
    fn watch_summary_line() {
        let summary = WatchSummary {
            rounds: 3,
            inconsistent_rounds: 1,
            failed_probes: 2,
            elapsed_secs: 95,
        };
        assert_eq!(
            render_watch_summary(&summary, true),
            "watch stopped: 3 rounds in 1m 35s, 1 inconsistent, 2 failed probes"
        );
    }
}
