//! `chainprobe rank`: score every provider.

use crate::cli::CommandContext;
use crate::core::scoring::rank_providers;
use crate::error::Result;
use crate::render;

/// Execute the rank command.
///
/// # Errors
/// Returns an error if the run was interrupted or rendering fails.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let ranked = rank_providers(
        &ctx.fanout,
        &ctx.shutdown,
        &ctx.config.providers,
        ctx.sampling_plan(),
        &ctx.config.thresholds,
    )
    .await?;

    println!(
        "{}",
        render::render_ranking(&ranked, ctx.format, ctx.pretty, ctx.no_color)?
    );
    Ok(())
}
