//! Watch mode: repeated health and consistency rounds.
//!
//! The loop owns no signal handling. It stops when the shutdown token is
//! cancelled or after `--rounds` rounds, then prints a summary.

use std::time::Instant;

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};

use crate::cli::CommandContext;
use crate::cli::args::OutputFormat;
use crate::core::consistency::run_consistency_round;
use crate::core::models::{RobotOutput, WatchRound, WatchSummary};
use crate::core::rounds::health_round;
use crate::error::Result;
use crate::render::{human, robot};

/// State tracked across watch iterations.
#[derive(Debug)]
pub struct WatchState {
    pub summary: WatchSummary,
    pub last_round: Option<WatchRound>,
    started: Instant,
}

impl Default for WatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            summary: WatchSummary::default(),
            last_round: None,
            started: Instant::now(),
        }
    }

    /// Number assigned to the next round (1-based).
    #[must_use]
    pub const fn next_round(&self) -> u64 {
        self.summary.rounds + 1
    }

    pub(crate) fn update(&mut self, round: WatchRound) {
        self.summary.record(&round);
        self.last_round = Some(round);
    }

    /// Whether `limit` rounds have completed.
    #[must_use]
    pub fn is_done(&self, limit: Option<u64>) -> bool {
        limit.is_some_and(|limit| self.summary.rounds >= limit)
    }

    #[must_use]
    pub fn finish(&self) -> WatchSummary {
        WatchSummary {
            elapsed_secs: self.started.elapsed().as_secs(),
            ..self.summary.clone()
        }
    }
}

/// Run watch mode until cancelled or `rounds` rounds have completed.
///
/// A round interrupted by shutdown is discarded.
///
/// # Errors
/// Returns an error if rendering fails.
pub async fn execute(ctx: &CommandContext, rounds: Option<u64>) -> Result<()> {
    let mut state = WatchState::new();
    let mut ticker = interval(ctx.watch_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = ctx.watch_interval().as_secs(),
        rounds = ?rounds,
        "starting watch"
    );

    while !state.is_done(rounds) {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(round) = run_round(ctx, state.next_round()).await else {
                    break;
                };
                render_frame(&round, ctx)?;
                state.update(round);
            }
            () = ctx.shutdown.cancelled() => break,
        }
    }

    render_summary(&state.finish(), ctx)
}

async fn run_round(ctx: &CommandContext, number: u64) -> Option<WatchRound> {
    let providers = &ctx.config.providers;
    // health is one call, consistency two sequential phases
    let token = ctx.round_token(3);
    let (health, consistency) = tokio::join!(
        health_round(&ctx.fanout, &token, providers),
        run_consistency_round(&ctx.fanout, &token, providers, &ctx.config.thresholds),
    );
    token.cancel();

    if ctx.shutdown.is_cancelled() {
        tracing::debug!(round = number, "round interrupted by shutdown");
        return None;
    }
    tracing::debug!(
        round = number,
        pooled_clients = ctx.fanout.pool().len().await,
        "round finished"
    );
    Some(WatchRound {
        round: number,
        at: Utc::now(),
        health,
        consistency,
    })
}

fn render_frame(round: &WatchRound, ctx: &CommandContext) -> Result<()> {
    match ctx.format {
        OutputFormat::Human => println!("{}", human::render_watch_round(round, ctx.no_color)),
        // one envelope per line so the stream stays line-delimited
        OutputFormat::Json => {
            let out = RobotOutput::new("watch", round)
                .with_warnings(round.consistency.issues.clone());
            println!("{}", robot::render_json(&out, false)?);
        }
    }
    Ok(())
}

fn render_summary(summary: &WatchSummary, ctx: &CommandContext) -> Result<()> {
    match ctx.format {
        OutputFormat::Human => println!("{}", human::render_watch_summary(summary, ctx.no_color)),
        OutputFormat::Json => {
            let out = RobotOutput::new("watch-summary", summary);
            println!("{}", robot::render_json(&out, false)?);
        }
    }
    Ok(())
}
