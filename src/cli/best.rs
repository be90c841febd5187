//! `chainprobe best`: auto-select a provider, then use it.

use crate::cli::CommandContext;
use crate::core::models::BestPayload;
use crate::core::rpc::BlockTag;
use crate::core::scoring::auto_select;
use crate::error::Result;
use crate::render;

/// Execute the best command.
///
/// The follow-up `eth_getBlockByNumber("latest")` goes through the winner's
/// own client, so its circuit state and connection are reused.
///
/// # Errors
/// Returns an error if no provider can be selected, the run was cancelled,
/// or rendering fails.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let selected = auto_select(
        &ctx.fanout,
        &ctx.shutdown,
        &ctx.config.providers,
        ctx.sampling_plan(),
        &ctx.config.thresholds,
    )
    .await?;

    let round = ctx.round_token(1);
    let (block, result) = selected
        .client
        .block_by_number(&round, BlockTag::Latest, false)
        .await;
    round.cancel();
    ctx.ensure_not_cancelled()?;

    let payload = BestPayload {
        selection: selected.selection,
        latest_block: block,
        follow_up_error: result.error().map(ToString::to_string),
        ranking: selected.ranked,
    };
    println!(
        "{}",
        render::render_best(&payload, ctx.format, ctx.pretty, ctx.no_color)?
    );
    Ok(())
}
