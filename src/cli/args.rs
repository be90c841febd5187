//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::storage::CliOverrides;

/// chainprobe - health and consensus monitor for blockchain RPC providers.
#[derive(Parser, Debug)]
#[command(name = "chainprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Config file (default: platform config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Per-call timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub const fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    /// Values this invocation overrides in the resolved configuration.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let (samples, interval_secs) = match &self.command {
            Commands::Latency(args) | Commands::Rank(args) | Commands::Best(args) => {
                (args.samples, None)
            }
            Commands::Watch(args) => (None, args.interval),
            Commands::Health | Commands::Consistency => (None, None),
        };
        CliOverrides {
            config_path: self.config.clone(),
            timeout_secs: self.timeout,
            samples,
            interval_secs,
            pretty: self.pretty,
            no_color: self.no_color,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Colored tables for terminals
    #[default]
    Human,
    /// Machine-readable JSON envelope
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every provider once with eth_blockNumber
    Health,

    /// Compare heights and block hashes at a common reference height
    Consistency,

    /// Sample providers and report P50/P95/P99/max latency
    Latency(SampleArgs),

    /// Score and rank providers
    Rank(SampleArgs),

    /// Pick the best provider and fetch the latest block from it
    Best(SampleArgs),

    /// Repeat health and consistency rounds until interrupted
    Watch(WatchArgs),
}

/// Arguments for sampling commands.
#[derive(Parser, Debug, Clone, Default)]
pub struct SampleArgs {
    /// Samples per provider
    #[arg(long, short = 'n', value_name = "N")]
    pub samples: Option<u32>,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Seconds between rounds
    #[arg(long, short = 'i', value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Stop after this many rounds
    #[arg(long, value_name = "N")]
    pub rounds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_shorthand() {
        let cli = Cli::parse_from(["chainprobe", "health", "--json"]);
        assert_eq!(cli.effective_format(), OutputFormat::Json);
        let cli = Cli::parse_from(["chainprobe", "health"]);
        assert_eq!(cli.effective_format(), OutputFormat::Human);
    }

    #[test]
    fn sample_count_reaches_overrides() {
        let cli = Cli::parse_from(["chainprobe", "--timeout", "4", "rank", "--samples", "12"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.samples, Some(12));
        assert_eq!(overrides.timeout_secs, Some(4));
        assert_eq!(overrides.interval_secs, None);
    }

    #[test]
    fn watch_interval_and_rounds() {
        let cli = Cli::parse_from(["chainprobe", "watch", "-i", "5", "--rounds", "3"]);
        assert_eq!(cli.overrides().interval_secs, Some(5));
        match cli.command {
            Commands::Watch(args) => assert_eq!(args.rounds, Some(3)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "chainprobe",
            "consistency",
            "--config",
            "/tmp/c.toml",
            "--no-color",
            "--pretty",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.config_path, Some(PathBuf::from("/tmp/c.toml")));
        assert!(overrides.no_color);
        assert!(overrides.pretty);
    }
}
