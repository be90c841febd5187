//! `chainprobe health`: one `eth_blockNumber` per provider.

use crate::cli::CommandContext;
use crate::core::rounds::health_round;
use crate::error::Result;
use crate::render;

/// Execute the health command.
///
/// # Errors
/// Returns an error if the run was interrupted or rendering fails.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let round = ctx.round_token(1);
    let checks = health_round(&ctx.fanout, &round, &ctx.config.providers).await;
    round.cancel();
    ctx.ensure_not_cancelled()?;

    println!(
        "{}",
        render::render_health(&checks, ctx.format, ctx.pretty, ctx.no_color)?
    );
    Ok(())
}
