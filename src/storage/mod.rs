//! Configuration loading and platform paths.

pub mod config;
pub mod paths;

pub use config::{
    CliOverrides, Config, ConfigSource, ConfigSources, ENV_CONFIG, ENV_NO_COLOR, ENV_NO_COLOR_STD,
    ENV_PRETTY, ENV_PROVIDERS, ENV_TIMEOUT, ProviderEntry, ResolvedConfig,
};
pub use paths::AppPaths;
