//! `chainprobe consistency`: two-phase height and hash comparison.

use crate::cli::CommandContext;
use crate::core::consistency::run_consistency_round;
use crate::error::Result;
use crate::render;

/// Execute the consistency command.
///
/// Findings are printed, never turned into errors.
///
/// # Errors
/// Returns an error if the run was interrupted or rendering fails.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let round = ctx.round_token(2);
    let report = run_consistency_round(
        &ctx.fanout,
        &round,
        &ctx.config.providers,
        &ctx.config.thresholds,
    )
    .await;
    round.cancel();
    ctx.ensure_not_cancelled()?;

    println!(
        "{}",
        render::render_consistency(&report, ctx.format, ctx.pretty, ctx.no_color)?
    );
    Ok(())
}
