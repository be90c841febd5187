//! CLI argument parsing and command dispatch.

pub mod args;
pub mod best;
pub mod consistency;
pub mod health;
pub mod latency;
pub mod rank;
pub mod watch;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use args::{Cli, Commands, OutputFormat};

use crate::core::executor::{FanOut, deadline_token};
use crate::core::scoring::SamplingPlan;
use crate::error::{ChainProbeError, Result};
use crate::storage::ResolvedConfig;

/// Everything a command needs to run one or more rounds.
#[derive(Debug)]
pub struct CommandContext {
    pub config: ResolvedConfig,
    pub format: OutputFormat,
    pub pretty: bool,
    pub no_color: bool,
    pub fanout: FanOut,
    /// Cancelled on Ctrl-C.
    pub shutdown: CancellationToken,
}

impl CommandContext {
    /// Resolve configuration for `cli`.
    ///
    /// # Errors
    /// Returns configuration errors, and [`ChainProbeError::NoProviders`] when
    /// nothing is configured.
    pub fn new(cli: &Cli, shutdown: CancellationToken) -> Result<Self> {
        let config = ResolvedConfig::resolve(&cli.overrides())?;
        Self::with_config(cli, config, shutdown)
    }

    /// Build from an already resolved configuration.
    ///
    /// # Errors
    /// [`ChainProbeError::NoProviders`] when `config` has no providers.
    pub fn with_config(
        cli: &Cli,
        config: ResolvedConfig,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        if config.providers.is_empty() {
            return Err(ChainProbeError::NoProviders);
        }
        let no_color = config.no_color || !crate::util::env::should_use_color(cli.no_color);
        Ok(Self {
            pretty: config.pretty,
            format: cli.effective_format(),
            no_color,
            fanout: FanOut::new(),
            shutdown,
            config,
        })
    }

    /// Child of the shutdown token that also fires after a round deadline
    /// sized for `calls` sequential calls per provider.
    #[must_use]
    pub fn round_token(&self, calls: u32) -> CancellationToken {
        deadline_token(&self.shutdown, self.config.round_deadline(calls))
    }

    /// Configured sampling plan, bounded by a deadline sized for its samples.
    #[must_use]
    pub fn sampling_plan(&self) -> SamplingPlan {
        let plan = self.config.sampling;
        plan.with_deadline(self.config.round_deadline(plan.samples))
    }

    /// Fail with [`ChainProbeError::Cancelled`] once shutdown was requested.
    ///
    /// # Errors
    /// See above.
    pub fn ensure_not_cancelled(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            Err(ChainProbeError::Cancelled)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub const fn watch_interval(&self) -> Duration {
        self.config.watch_interval
    }
}

/// Execute the parsed command.
///
/// # Errors
/// Propagates fatal errors from the command.
pub async fn run(cli: Cli, shutdown: CancellationToken) -> Result<()> {
    let ctx = CommandContext::new(&cli, shutdown)?;
    tracing::debug!(
        command = ?cli.command,
        providers = ctx.config.providers.len(),
        "dispatching command"
    );
    match &cli.command {
        Commands::Health => health::execute(&ctx).await,
        Commands::Consistency => consistency::execute(&ctx).await,
        Commands::Latency(_) => latency::execute(&ctx).await,
        Commands::Rank(_) => rank::execute(&ctx).await,
        Commands::Best(_) => best::execute(&ctx).await,
        Commands::Watch(args) => watch::execute(&ctx, args.rounds).await,
    }
}
