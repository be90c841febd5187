//! Utility functions.

pub mod env;
pub mod format;
pub mod time;

pub use format::{format_height, format_percent, format_score, short_hash};
pub use time::{format_elapsed, format_latency};
