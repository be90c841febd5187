//! `chainprobe latency`: tail latency per provider.

use crate::cli::CommandContext;
use crate::core::rounds::latency_profile;
use crate::error::Result;
use crate::render;

/// Execute the latency command.
///
/// # Errors
/// Returns an error if the run was interrupted or rendering fails.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let profiles = latency_profile(
        &ctx.fanout,
        &ctx.shutdown,
        &ctx.config.providers,
        ctx.sampling_plan(),
    )
    .await;
    ctx.ensure_not_cancelled()?;

    println!(
        "{}",
        render::render_latency(&profiles, ctx.format, ctx.pretty, ctx.no_color)?
    );
    Ok(())
}
