//! Error rendering for chainprobe.
//!
//! Human mode prints the error code, message and hint to stderr; JSON mode
//! prints a structured object agents can match on.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::ChainProbeError;

/// Render a fatal error for the selected output format.
#[must_use]
pub fn render_error(
    error: &ChainProbeError,
    format: OutputFormat,
    no_color: bool,
    pretty: bool,
) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human if no_color || !crate::util::env::stderr_is_tty() => {
            render_simple(error)
        }
        OutputFormat::Human => render_colored(error),
    }
}

/// Plain text: `Error [CHP-P001]: no providers configured` plus a hint line.
#[must_use]
pub fn render_simple(error: &ChainProbeError) -> String {
    let mut lines = vec![format!("Error [{}]: {error}", error.error_code())];
    if let Some(hint) = error.hint() {
        lines.push(format!("Hint: {hint}"));
    }
    lines.join("\n")
}

fn render_colored(error: &ChainProbeError) -> String {
    let mut lines = vec![format!(
        "{} {} {}",
        "error".red().bold(),
        format!("[{}]", error.error_code()).dimmed(),
        error
    )];
    if let Some(hint) = error.hint() {
        lines.push(format!("  {} {hint}", "hint:".cyan()));
    }
    lines.join("\n")
}

/// JSON representation of an error for machine consumption.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

/// Render error as structured JSON.
#[must_use]
pub fn render_error_json(error: &ChainProbeError, pretty: bool) -> String {
    let json = ErrorJson {
        error_code: error.error_code(),
        category: error.category().to_string(),
        message: error.to_string(),
        exit_code: error.exit_code().into(),
        hint: error.hint(),
    };
    let rendered = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}
