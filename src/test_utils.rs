//! Test utilities for chainprobe.
//!
//! Provides provider factories, wiremock JSON-RPC mocks, a temp-dir helper
//! for config files, and assertion macros shared by unit and integration
//! tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chainprobe::test_utils::*;
//!
//! let server = wiremock::MockServer::start().await;
//! mock_block_number(&server, 100).await;
//! let spec = fast_spec("alpha", &server.uri());
//! ```

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::core::provider::{CircuitSettings, ProviderSpec, RetryPolicy};

// =============================================================================
// Provider Factories
// =============================================================================

/// A provider with a short timeout, millisecond backoff and the circuit
/// breaker disabled, so retries stay fast and never interfere.
#[must_use]
pub fn fast_spec(name: &str, url: &str) -> ProviderSpec {
    ProviderSpec::new(name, url)
        .with_timeout(Duration::from_secs(2))
        .with_retry(RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        })
        .with_circuit(CircuitSettings {
            failure_threshold: 0,
            cooldown: Duration::from_secs(30),
        })
}

/// Like [`fast_spec`] but with an active breaker.
#[must_use]
pub fn breaker_spec(name: &str, url: &str, threshold: u32, cooldown: Duration) -> ProviderSpec {
    fast_spec(name, url).with_circuit(CircuitSettings {
        failure_threshold: threshold,
        cooldown,
    })
}

/// Hex quantity as a provider would send it.
#[must_use]
pub fn hex(n: u64) -> String {
    format!("{n:#x}")
}

/// A minimal `eth_getBlockByNumber` result object.
#[must_use]
pub fn block_json(number: u64, hash: &str) -> Value {
    json!({
        "number": hex(number),
        "hash": hash,
        "parentHash": format!("0x{:064x}", number.saturating_sub(1)),
        "timestamp": hex(1_700_000_000 + number * 12),
        "transactions": ["0x01", "0x02"],
        "gasUsed": "0x5208",
        "baseFeePerGas": "0x3b9aca00",
    })
}

/// A 32-byte hash whose last bytes spell `tag`.
#[must_use]
pub fn test_hash(tag: u64) -> String {
    format!("0x{tag:064x}")
}

// =============================================================================
// JSON-RPC Mocks
// =============================================================================

/// JSON-RPC success envelope.
#[must_use]
pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result,
    }))
}

/// JSON-RPC error envelope.
#[must_use]
pub fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {"code": code, "message": message},
    }))
}

/// Matcher for requests carrying `rpc_method`.
fn rpc_method(rpc_method: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST")).and(body_partial_json(json!({ "method": rpc_method })))
}

/// Answer `eth_blockNumber` with `height`.
pub async fn mock_block_number(server: &MockServer, height: u64) {
    rpc_method("eth_blockNumber")
        .respond_with(rpc_result(json!(hex(height))))
        .mount(server)
        .await;
}

/// Answer `eth_getBlockByNumber(number)` with a block carrying `hash`.
pub async fn mock_block(server: &MockServer, number: u64, hash: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_getBlockByNumber",
            "params": [hex(number)],
        })))
        .respond_with(rpc_result(block_json(number, hash)))
        .mount(server)
        .await;
}

/// Answer `eth_getBlockByNumber("latest")` with a block at `number`.
pub async fn mock_latest_block(server: &MockServer, number: u64, hash: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_getBlockByNumber",
            "params": ["latest"],
        })))
        .respond_with(rpc_result(block_json(number, hash)))
        .mount(server)
        .await;
}

/// Answer every request with HTTP `status`.
pub async fn mock_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// A healthy provider at `height` whose block at `height` has `hash`.
pub async fn healthy_provider(height: u64, hash: &str) -> MockServer {
    let server = MockServer::start().await;
    mock_block_number(&server, height).await;
    mock_block(&server, height, hash).await;
    server
}

// =============================================================================
// Temp Directories
// =============================================================================

/// Isolated temporary directory, removed on drop.
///
/// # Examples
///
/// ```rust,ignore
/// let dir = TestDir::new();
/// let path = dir.create_file("config.toml", "[[providers]]\nname = \"a\"");
/// assert!(path.exists());
/// ```
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Write `content` to `name`, creating parent directories, and return
    /// the full path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

/// TOML config listing `providers` as `(name, url)` pairs with fast retries.
#[must_use]
pub fn make_test_config_toml(providers: &[(&str, &str)]) -> String {
    let mut out = String::from(
        "[general]\ntimeout_seconds = 2\nsamples = 3\nsample_delay_ms = 0\n\n\
         [retry]\nmax_retries = 1\ninitial_backoff_ms = 1\nmax_backoff_ms = 5\n\n\
         [circuit]\nfailure_threshold = 0\n",
    );
    for (name, url) in providers {
        out.push_str(&format!("\n[[providers]]\nname = \"{name}\"\nurl = \"{url}\"\n"));
    }
    out
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Whether `text` contains ANSI escape sequences.
#[must_use]
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}
