//! HTTP client utilities.
//!
//! Builds the reqwest client each provider's RPC calls go through.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::{ChainProbeError, Result};

/// Connect timeout, capped independently of the per-call timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .user_agent(format!("chainprobe/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ChainProbeError::HttpClient(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_short_timeout() {
        assert!(build_client(Duration::from_millis(250)).is_ok());
    }
}
