//! chainprobe - CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use chainprobe::cli::Cli;
use chainprobe::core::logging::{self, LogSettings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = LogSettings::resolve(cli.log_level.as_deref(), cli.json_output, cli.verbose);
    logging::init(&settings);

    let format = cli.effective_format();
    let pretty = cli.pretty;
    let no_color = !chainprobe::util::env::should_use_color(cli.no_color);
    if no_color {
        colored::control::set_override(false);
    }

    // Ctrl+C cancels every in-flight round.
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    match chainprobe::cli::run(cli, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "command failed");
            eprintln!(
                "{}",
                chainprobe::render::error::render_error(&e, format, no_color, pretty)
            );
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
