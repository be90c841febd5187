//! chainprobe - health and consensus monitor for blockchain RPC providers.
//!
//! The [`core`] module holds the resilient JSON-RPC client, the fan-out
//! executor, tail-latency statistics, the two-phase consistency checker and
//! the provider scorer. [`cli`], [`render`] and [`storage`] wrap it into a
//! command-line tool.

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod render;
pub mod storage;
pub mod util;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ChainProbeError, ExitCode, Result};
