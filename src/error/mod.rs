//! Error types for chainprobe.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Two kinds of failure
//!
//! - [`ChainProbeError`]: fatal conditions that abort a command (bad config,
//!   zero providers, whole-round cancellation, I/O).
//! - [`CallError`]: the outcome of one failed RPC call against one provider.
//!   These never abort a round; they are captured inside each provider's
//!   result so the rest of the fleet is still evaluated.
//!
//! Each fatal error has a stable error code (e.g., `CHP-C001`) for programmatic handling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network issues (client construction, transport).
    Network,
    /// Configuration issues (parse errors, invalid values, missing providers).
    Configuration,
    /// Provider fleet issues (nothing to probe, every provider unusable).
    Provider,
    /// Internal errors (I/O, serialization, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Provider => "Provider error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Provider => "P",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Config file or value could not be used
    ConfigError = 2,
    /// Nothing to probe
    NoProviders = 3,
    /// Round cancelled or deadline exceeded
    Cancelled = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

// =============================================================================
// Fatal errors
// =============================================================================

/// Main error type for chainprobe operations.
#[derive(Error, Debug)]
pub enum ChainProbeError {
    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Configuration file not found at an explicitly requested path.
    #[error("config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Two providers share the same name.
    #[error("duplicate provider name: {0}")]
    DuplicateProvider(String),

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Provider errors (Category: Provider)
    // ==========================================================================
    /// No providers are configured, so there is nothing to probe or select.
    #[error("no providers configured")]
    NoProviders,

    /// A provider name was requested that is not configured.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The whole round was cancelled before it could produce a result.
    #[error("round cancelled")]
    Cancelled,

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// HTTP client could not be constructed.
    #[error("http client error: {0}")]
    HttpClient(String),

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChainProbeError {
    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::DuplicateProvider(_)
            | Self::UnknownProvider(_)
            | Self::Config(_) => ExitCode::ConfigError,

            Self::NoProviders => ExitCode::NoProviders,

            Self::Cancelled => ExitCode::Cancelled,

            Self::HttpClient(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ExitCode::GeneralError
            }
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::DuplicateProvider(_)
            | Self::UnknownProvider(_)
            | Self::Config(_) => ErrorCategory::Configuration,

            Self::NoProviders | Self::Cancelled => ErrorCategory::Provider,

            Self::HttpClient(_) => ErrorCategory::Network,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `CHP-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound { .. } => "CHP-C001",
            Self::ConfigParse { .. } => "CHP-C002",
            Self::ConfigInvalid { .. } => "CHP-C003",
            Self::Config(_) => "CHP-C004",
            Self::DuplicateProvider(_) => "CHP-C010",
            Self::UnknownProvider(_) => "CHP-C011",

            Self::NoProviders => "CHP-P001",
            Self::Cancelled => "CHP-P002",

            Self::HttpClient(_) => "CHP-N001",

            Self::Io(_) => "CHP-X001",
            Self::Json(_) => "CHP-X002",
            Self::Other(_) => "CHP-X099",
        }
    }

    /// Short remediation hint shown under the error in human output.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoProviders => Some(
                "Add at least one [[providers]] entry to the config file or set CHAINPROBE_PROVIDERS=name=url",
            ),
            Self::ConfigNotFound { .. } => {
                Some("Check the --config path or unset CHAINPROBE_CONFIG")
            }
            Self::ConfigParse { .. } | Self::ConfigInvalid { .. } | Self::DuplicateProvider(_) => {
                Some("Fix the config file and re-run")
            }
            _ => None,
        }
    }
}

/// Result type alias for chainprobe operations.
pub type Result<T> = std::result::Result<T, ChainProbeError>;

// =============================================================================
// Per-call errors
// =============================================================================

/// Classification of a single failed RPC call.
///
/// Shared by retry, circuit breaking, scoring and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallErrorKind {
    /// No response within the per-call timeout, or the round was cancelled.
    Timeout,
    /// HTTP 429.
    RateLimit,
    /// HTTP 5xx.
    ServerError,
    /// Malformed response body, or a local encode/decode failure.
    ParseError,
    /// Well-formed JSON-RPC error object returned by the remote.
    RpcError,
    /// Rejected before any network attempt because the circuit is open.
    CircuitOpen,
    /// Anything else (connection refused, unexpected HTTP status, ...).
    Unknown,
}

impl CallErrorKind {
    /// Whether another attempt may change the outcome.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::ParseError | Self::RpcError | Self::CircuitOpen)
    }

    /// Stable snake_case label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::ParseError => "parse_error",
            Self::RpcError => "rpc_error",
            Self::CircuitOpen => "circuit_open",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CallErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one logical RPC call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct CallError {
    pub kind: CallErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_code: Option<i64>,
}

impl CallError {
    /// Create an error of the given kind.
    #[must_use]
    pub fn new(kind: CallErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            rpc_code: None,
        }
    }

    /// Classify a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        let kind = match status {
            429 => CallErrorKind::RateLimit,
            500..=599 => CallErrorKind::ServerError,
            _ => CallErrorKind::Unknown,
        };
        Self {
            kind,
            message: format!("HTTP {status}"),
            http_status: Some(status),
            rpc_code: None,
        }
    }

    /// A JSON-RPC error object returned by the remote.
    #[must_use]
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self {
            kind: CallErrorKind::RpcError,
            message: message.into(),
            http_status: None,
            rpc_code: Some(code),
        }
    }

    /// Pre-flight rejection by the circuit breaker.
    #[must_use]
    pub fn circuit_open(provider: &str) -> Self {
        Self::new(
            CallErrorKind::CircuitOpen,
            format!("circuit open for {provider}"),
        )
    }

    /// Classify a transport error from reqwest.
    #[must_use]
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            CallErrorKind::Timeout
        } else if error.is_decode() {
            CallErrorKind::ParseError
        } else if let Some(status) = error.status() {
            return Self::from_status(status.as_u16());
        } else {
            CallErrorKind::Unknown
        };
        let message = if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "request timed out".to_string()
        } else {
            error.to_string()
        };
        Self::new(kind, message)
    }

    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
