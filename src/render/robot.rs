//! Robot-mode output (JSON).
//!
//! Every payload is wrapped in a [`RobotOutput`] envelope so agents can check
//! `schemaVersion` and `command` before reading `data`.

use serde::Serialize;

use crate::core::models::RobotOutput;
use crate::error::Result;

/// Serialize any value as compact or pretty JSON.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

/// Wrap `data` in the envelope and serialize it.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render_envelope<T: Serialize>(
    command: &str,
    data: T,
    warnings: Vec<String>,
    pretty: bool,
) -> Result<String> {
    render_json(&RobotOutput::new(command, data).with_warnings(warnings), pretty)
}
