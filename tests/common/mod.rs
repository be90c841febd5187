//! Shared helpers for integration tests.
#![allow(dead_code)]

pub mod logger;

use std::sync::Arc;

use chainprobe::core::client::ResilientClient;
use chainprobe::core::provider::ProviderSpec;

/// Build a client, panicking on failure.
pub fn client(spec: ProviderSpec) -> Arc<ResilientClient> {
    Arc::new(ResilientClient::new(spec).expect("client builds"))
}
