//! Configuration file loading and resolution.
//!
//! Loads configuration from:
//! - Linux: `~/.config/chainprobe/config.toml`
//! - macOS: `~/Library/Application Support/chainprobe/config.toml`
//! - Windows: `%APPDATA%\chainprobe\config\config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `CHAINPROBE_CONFIG`: Override config file path
//! - `CHAINPROBE_PROVIDERS`: Provider list as `name=url,name=url` (replaces `[[providers]]`)
//! - `CHAINPROBE_TIMEOUT`: Per-call timeout in seconds
//! - `CHAINPROBE_NO_COLOR` or `NO_COLOR`: Disable colors
//! - `CHAINPROBE_PRETTY`: Pretty-print JSON output (1, true, yes)
//!
//! ## Example
//!
//! ```toml
//! [general]
//! timeout_seconds = 10
//! samples = 5
//!
//! [circuit]
//! failure_threshold = 5
//! cooldown_seconds = 30
//!
//! [[providers]]
//! name = "primary"
//! url = "https://rpc.example.org"
//!
//! [[providers]]
//! name = "backup"
//! url = "https://backup.example.org"
//! timeout_seconds = 5
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::provider::{
    CircuitSettings, DEFAULT_COOLDOWN, DEFAULT_FAILURE_THRESHOLD, DEFAULT_INITIAL_BACKOFF,
    DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, ProviderSpec, RetryPolicy,
};
use crate::core::scoring::SamplingPlan;
use crate::core::thresholds::Thresholds;
use crate::error::{ChainProbeError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable overriding the config file path.
pub const ENV_CONFIG: &str = "CHAINPROBE_CONFIG";
/// Environment variable with `name=url` provider pairs.
pub const ENV_PROVIDERS: &str = "CHAINPROBE_PROVIDERS";
/// Environment variable for the per-call timeout in seconds.
pub const ENV_TIMEOUT: &str = "CHAINPROBE_TIMEOUT";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "CHAINPROBE_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
/// Environment variable for pretty JSON output.
pub const ENV_PRETTY: &str = "CHAINPROBE_PRETTY";

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_SAMPLES: u32 = 1_000;

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values the command line can override. `None`/`false` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub samples: Option<u32>,
    pub interval_secs: Option<u64>,
    pub pretty: bool,
    pub no_color: bool,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Providers in configured order.
    pub providers: Vec<ProviderSpec>,
    /// Global per-call timeout.
    pub timeout: Duration,
    pub sampling: SamplingPlan,
    pub watch_interval: Duration,
    pub thresholds: Thresholds,
    pub pretty: bool,
    pub no_color: bool,
    /// Config file that was read, if any.
    pub config_path: Option<PathBuf>,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub providers: ConfigSource,
    pub timeout: ConfigSource,
    pub samples: ConfigSource,
    pub watch_interval: ConfigSource,
    pub pretty: ConfigSource,
    pub no_color: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI overrides, the process
    /// environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An explicitly requested config file does not exist
    /// - The config file exists but is invalid
    /// - Any resolved value is out of range
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// [`resolve`](Self::resolve) with an injectable environment lookup.
    ///
    /// # Errors
    /// Same as [`resolve`](Self::resolve).
    pub fn resolve_with(cli: &CliOverrides, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (path, explicit) = match (&cli.config_path, env(ENV_CONFIG)) {
            (Some(path), _) => (path.clone(), true),
            (None, Some(path)) => (PathBuf::from(path), true),
            (None, None) => (AppPaths::new().config_file(), false),
        };
        let file_present = path.exists();
        if explicit && !file_present {
            return Err(ChainProbeError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let config = Config::load_from(&path)?;
        config.validate()?;
        let file_source = if file_present {
            ConfigSource::ConfigFile
        } else {
            ConfigSource::Default
        };

        let mut sources = ConfigSources::default();

        let timeout = Self::resolve_timeout(cli, &config, &env, file_source, &mut sources.timeout)?;
        let timeout_forced = matches!(sources.timeout, ConfigSource::Cli | ConfigSource::Env);

        let entries = Self::resolve_provider_entries(&config, &env, &mut sources.providers)?;
        validate_entries(&entries)?;
        let providers = entries
            .iter()
            .map(|entry| entry.to_spec(&config, timeout, timeout_forced))
            .collect();

        let samples = if let Some(samples) = cli.samples {
            sources.samples = ConfigSource::Cli;
            samples
        } else {
            sources.samples = file_source;
            config.general.samples
        };
        check_samples(samples)?;

        let watch_interval = if let Some(secs) = cli.interval_secs {
            sources.watch_interval = ConfigSource::Cli;
            secs
        } else {
            sources.watch_interval = file_source;
            config.general.watch_interval_seconds
        };
        if watch_interval == 0 {
            return Err(invalid("watch_interval_seconds", "0", "must be at least 1 second"));
        }

        let pretty = Self::resolve_flag(cli.pretty, &env, &[ENV_PRETTY], &mut sources.pretty);
        let no_color = if cli.no_color {
            sources.no_color = ConfigSource::Cli;
            true
        } else if is_truthy(env(ENV_NO_COLOR).as_deref()) || env(ENV_NO_COLOR_STD).is_some() {
            sources.no_color = ConfigSource::Env;
            true
        } else {
            false
        };

        let resolved = Self {
            providers,
            timeout,
            sampling: SamplingPlan::new(
                samples,
                Duration::from_millis(config.general.sample_delay_ms),
            ),
            watch_interval: Duration::from_secs(watch_interval),
            thresholds: config.thresholds,
            pretty,
            no_color,
            config_path: file_present.then_some(path),
            sources,
        };
        tracing::debug!(
            providers = resolved.providers.len(),
            providers_from = %resolved.sources.providers,
            timeout_secs = resolved.timeout.as_secs(),
            timeout_from = %resolved.sources.timeout,
            "configuration resolved"
        );
        Ok(resolved)
    }

    /// Deadline for one fan-out pass in which every provider makes `calls`
    /// sequential logical calls, each allowed its full retry budget.
    #[must_use]
    pub fn round_deadline(&self, calls: u32) -> Duration {
        let calls = calls.max(1);
        let slowest = self
            .providers
            .iter()
            .map(ProviderSpec::call_budget)
            .max()
            .unwrap_or(self.timeout);
        slowest * calls + self.sampling.delay * calls
    }

    fn resolve_timeout(
        cli: &CliOverrides,
        config: &Config,
        env: &impl Fn(&str) -> Option<String>,
        file_source: ConfigSource,
        source: &mut ConfigSource,
    ) -> Result<Duration> {
        let secs = if let Some(secs) = cli.timeout_secs {
            // 1. CLI --timeout
            *source = ConfigSource::Cli;
            secs
        } else if let Some(value) = env(ENV_TIMEOUT) {
            // 2. Environment variable
            *source = ConfigSource::Env;
            value
                .parse::<u64>()
                .map_err(|_| invalid(ENV_TIMEOUT, &value, "must be a whole number of seconds"))?
        } else {
            // 3. Config file or default
            *source = file_source;
            config.general.timeout_seconds
        };
        check_timeout("timeout_seconds", secs)?;
        Ok(Duration::from_secs(secs))
    }

    fn resolve_provider_entries(
        config: &Config,
        env: &impl Fn(&str) -> Option<String>,
        source: &mut ConfigSource,
    ) -> Result<Vec<ProviderEntry>> {
        // 1. Environment variable (no CLI flag for providers)
        if let Some(value) = env(ENV_PROVIDERS) {
            *source = ConfigSource::Env;
            return parse_provider_list(&value);
        }

        // 2. Config file
        *source = if config.providers.is_empty() {
            ConfigSource::Default
        } else {
            ConfigSource::ConfigFile
        };
        Ok(config.providers.clone())
    }

    fn resolve_flag(
        cli: bool,
        env: &impl Fn(&str) -> Option<String>,
        vars: &[&str],
        source: &mut ConfigSource,
    ) -> bool {
        if cli {
            *source = ConfigSource::Cli;
            return true;
        }
        if vars.iter().any(|var| is_truthy(env(var).as_deref())) {
            *source = ConfigSource::Env;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }
}

/// Parse `name=url,name=url`.
fn parse_provider_list(value: &str) -> Result<Vec<ProviderEntry>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, url) = pair
                .split_once('=')
                .ok_or_else(|| invalid(ENV_PROVIDERS, pair, "expected name=url"))?;
            Ok(ProviderEntry::new(name.trim(), url.trim()))
        })
        .collect()
}

fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn invalid(key: &str, value: &str, message: &str) -> ChainProbeError {
    ChainProbeError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

fn check_timeout(key: &str, secs: u64) -> Result<()> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(invalid(
            key,
            &secs.to_string(),
            "timeout must be between 1 and 300 seconds",
        ));
    }
    Ok(())
}

fn check_samples(samples: u32) -> Result<()> {
    if samples == 0 || samples > MAX_SAMPLES {
        return Err(invalid(
            "samples",
            &samples.to_string(),
            "samples must be between 1 and 1000",
        ));
    }
    Ok(())
}

/// Unique non-empty names and http(s) URLs.
fn validate_entries(entries: &[ProviderEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(invalid("providers.name", &entry.url, "provider name is empty"));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(ChainProbeError::DuplicateProvider(entry.name.clone()));
        }
        let url = entry.url.to_ascii_lowercase();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));
        if rest.is_none_or(str::is_empty) {
            return Err(invalid(
                &format!("providers.{}.url", entry.name),
                &entry.url,
                "must be an http:// or https:// URL",
            ));
        }
        if let Some(secs) = entry.timeout_seconds {
            check_timeout(&format!("providers.{}.timeout_seconds", entry.name), secs)?;
        }
    }
    Ok(())
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub retry: RetryConfig,
    pub circuit: CircuitConfig,
    pub thresholds: Thresholds,
    pub providers: Vec<ProviderEntry>,
}

/// `[general]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Per-call timeout in seconds.
    pub timeout_seconds: u64,
    /// Samples per provider for latency and ranking.
    pub samples: u32,
    pub watch_interval_seconds: u64,
    /// Pause between consecutive samples against the same provider.
    pub sample_delay_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        let plan = SamplingPlan::default();
        Self {
            timeout_seconds: DEFAULT_TIMEOUT.as_secs(),
            samples: plan.samples,
            watch_interval_seconds: 30,
            sample_delay_ms: u64::try_from(plan.delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `[retry]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: u64::try_from(DEFAULT_INITIAL_BACKOFF.as_millis()).unwrap_or(0),
            max_backoff_ms: u64::try_from(DEFAULT_MAX_BACKOFF.as_millis()).unwrap_or(0),
        }
    }
}

impl RetryConfig {
    fn policy(&self, max_retries: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_retries: max_retries.unwrap_or(self.max_retries),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// `[circuit]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// `0` disables the circuit breaker.
    pub failure_threshold: u32,
    pub cooldown_seconds: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown_seconds: DEFAULT_COOLDOWN.as_secs(),
        }
    }
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl ProviderEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout_seconds: None,
            max_retries: None,
        }
    }

    /// Build the immutable spec. A timeout given on the command line or in
    /// the environment beats the per-provider value.
    fn to_spec(&self, config: &Config, global_timeout: Duration, forced: bool) -> ProviderSpec {
        let timeout = match self.timeout_seconds {
            Some(secs) if !forced => Duration::from_secs(secs),
            _ => global_timeout,
        };
        ProviderSpec::new(self.name.clone(), self.url.clone())
            .with_timeout(timeout)
            .with_retry(config.retry.policy(self.max_retries))
            .with_circuit(CircuitSettings {
                failure_threshold: config.circuit.failure_threshold,
                cooldown: Duration::from_secs(config.circuit.cooldown_seconds),
            })
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error only if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ChainProbeError::ConfigParse {
            path: path.display().to_string(),
            message: e.message().to_string(),
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChainProbeError::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Validate values that do not depend on the environment.
    ///
    /// # Errors
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<()> {
        check_timeout("general.timeout_seconds", self.general.timeout_seconds)?;
        check_samples(self.general.samples)?;

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(invalid(
                "retry.initial_backoff_ms",
                &self.retry.initial_backoff_ms.to_string(),
                "must not exceed retry.max_backoff_ms",
            ));
        }
        if self.circuit.failure_threshold > 0 && self.circuit.cooldown_seconds == 0 {
            return Err(invalid(
                "circuit.cooldown_seconds",
                "0",
                "must be at least 1 second while the circuit breaker is enabled",
            ));
        }
        self.thresholds
            .validate()
            .map_err(|message| invalid("thresholds", "", &message))?;

        validate_entries(&self.providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    fn resolve(cli: &CliOverrides, vars: &[(&str, &str)]) -> Result<ResolvedConfig> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ResolvedConfig::resolve_with(cli, |key| env.get(key).cloned())
    }

    fn cli_with(file: &NamedTempFile) -> CliOverrides {
        CliOverrides {
            config_path: Some(file.path().to_path_buf()),
            ..CliOverrides::default()
        }
    }

    const TWO_PROVIDERS: &str = r#"
[general]
timeout_seconds = 8
samples = 7

[retry]
max_retries = 3

[circuit]
failure_threshold = 4
cooldown_seconds = 12

[thresholds]
height_drift = 4

[[providers]]
name = "alpha"
url = "https://alpha.example"

[[providers]]
name = "beta"
url = "http://beta.example:8545"
timeout_seconds = 3
max_retries = 0
"#;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.timeout_seconds, 10);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let file = write_config("this is not valid toml {{{{");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ChainProbeError::ConfigParse { .. }));
        assert_eq!(err.error_code(), "CHP-C002");
    }

    #[test]
    fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.general.samples = 9;
        config.providers.push(ProviderEntry::new("a", "https://a.example"));
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn file_values_flow_into_specs() {
        let file = write_config(TWO_PROVIDERS);
        let resolved = resolve(&cli_with(&file), &[]).unwrap();

        assert_eq!(resolved.providers.len(), 2);
        assert_eq!(resolved.sources.providers, ConfigSource::ConfigFile);
        assert_eq!(resolved.sampling.samples, 7);
        assert_eq!(resolved.thresholds.height_drift, 4);

        let alpha = &resolved.providers[0];
        assert_eq!(alpha.name, "alpha");
        assert_eq!(alpha.timeout, Duration::from_secs(8));
        assert_eq!(alpha.retry.max_retries, 3);
        assert_eq!(alpha.circuit.failure_threshold, 4);
        assert_eq!(alpha.circuit.cooldown, Duration::from_secs(12));

        let beta = &resolved.providers[1];
        assert_eq!(beta.timeout, Duration::from_secs(3));
        assert_eq!(beta.retry.max_retries, 0);
    }

    #[test]
    fn cli_timeout_beats_env_and_per_provider_value() {
        let file = write_config(TWO_PROVIDERS);
        let cli = CliOverrides {
            timeout_secs: Some(20),
            ..cli_with(&file)
        };
        let resolved = resolve(&cli, &[(ENV_TIMEOUT, "30")]).unwrap();
        assert_eq!(resolved.sources.timeout, ConfigSource::Cli);
        assert!(resolved.providers.iter().all(|p| p.timeout == Duration::from_secs(20)));
    }

    #[test]
    fn env_timeout_beats_file() {
        let file = write_config(TWO_PROVIDERS);
        let resolved = resolve(&cli_with(&file), &[(ENV_TIMEOUT, "30")]).unwrap();
        assert_eq!(resolved.timeout, Duration::from_secs(30));
        assert_eq!(resolved.sources.timeout, ConfigSource::Env);
    }

    #[test]
    fn env_timeout_must_be_numeric_and_in_range() {
        let file = write_config(TWO_PROVIDERS);
        assert!(matches!(
            resolve(&cli_with(&file), &[(ENV_TIMEOUT, "soon")]),
            Err(ChainProbeError::ConfigInvalid { .. })
        ));
        assert!(resolve(&cli_with(&file), &[(ENV_TIMEOUT, "301")]).is_err());
    }

    #[test]
    fn env_providers_replace_file_providers() {
        let file = write_config(TWO_PROVIDERS);
        let resolved = resolve(
            &cli_with(&file),
            &[(ENV_PROVIDERS, "one=http://127.0.0.1:8545, two=https://two.example")],
        )
        .unwrap();
        let names: Vec<_> = resolved.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(resolved.sources.providers, ConfigSource::Env);
        // global retry settings from the file still apply
        assert_eq!(resolved.providers[0].retry.max_retries, 3);
    }

    #[test]
    fn malformed_env_provider_pair_is_rejected() {
        let file = write_config("");
        let err = resolve(&cli_with(&file), &[(ENV_PROVIDERS, "just-a-name")]).unwrap_err();
        assert!(err.to_string().contains(ENV_PROVIDERS));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let file = write_config(
            r#"
[[providers]]
name = "a"
url = "https://a.example"

[[providers]]
name = "a"
url = "https://b.example"
"#,
        );
        let err = resolve(&cli_with(&file), &[]).unwrap_err();
        assert!(matches!(err, ChainProbeError::DuplicateProvider(ref n) if n == "a"));
    }

    #[test]
    fn non_http_urls_are_rejected() {
        for url in ["ws://node.example", "node.example", "https://"] {
            let entries = [ProviderEntry::new("a", url)];
            assert!(validate_entries(&entries).is_err(), "{url} accepted");
        }
    }

    #[test]
    fn backoff_ordering_is_validated() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 5_000;
        config.retry.max_backoff_ms = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.initial_backoff_ms"));
    }

    #[test]
    fn thresholds_are_validated() {
        let mut config = Config::default();
        config.thresholds.min_success_rate = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let cli = CliOverrides {
            config_path: Some(PathBuf::from("/nonexistent/chainprobe.toml")),
            ..CliOverrides::default()
        };
        let err = resolve(&cli, &[]).unwrap_err();
        assert!(matches!(err, ChainProbeError::ConfigNotFound { .. }));

        let err = resolve(
            &CliOverrides::default(),
            &[(ENV_CONFIG, "/nonexistent/env.toml")],
        )
        .unwrap_err();
        assert!(matches!(err, ChainProbeError::ConfigNotFound { .. }));
    }

    #[test]
    fn cli_samples_and_interval_override_file() {
        let file = write_config(TWO_PROVIDERS);
        let cli = CliOverrides {
            samples: Some(3),
            interval_secs: Some(2),
            ..cli_with(&file)
        };
        let resolved = resolve(&cli, &[]).unwrap();
        assert_eq!(resolved.sampling.samples, 3);
        assert_eq!(resolved.sources.samples, ConfigSource::Cli);
        assert_eq!(resolved.watch_interval, Duration::from_secs(2));
    }

    #[test]
    fn zero_samples_rejected() {
        let file = write_config(TWO_PROVIDERS);
        let cli = CliOverrides {
            samples: Some(0),
            ..cli_with(&file)
        };
        assert!(resolve(&cli, &[]).is_err());
    }

    #[test]
    fn color_and_pretty_flags() {
        let file = write_config("");
        let resolved = resolve(&cli_with(&file), &[(ENV_NO_COLOR_STD, "1"), (ENV_PRETTY, "yes")])
            .unwrap();
        assert!(resolved.no_color);
        assert_eq!(resolved.sources.no_color, ConfigSource::Env);
        assert!(resolved.pretty);

        let resolved = resolve(&cli_with(&file), &[(ENV_PRETTY, "0")]).unwrap();
        assert!(!resolved.pretty);
        assert!(!resolved.no_color);
    }

    #[test]
    fn round_deadline_scales_with_calls() {
        let file = write_config(TWO_PROVIDERS);
        let resolved = resolve(&cli_with(&file), &[]).unwrap();
        // alpha: 4 attempts x 8s plus (100 + 200 + 400) ms x 1.5 backoff,
        // default sample delay 100ms
        assert_eq!(resolved.round_deadline(1), Duration::from_millis(33_150));
        assert_eq!(resolved.round_deadline(2), Duration::from_millis(66_300));
    }

    #[test]
    fn config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI flag");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
