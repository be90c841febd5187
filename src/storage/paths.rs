//! Application paths.

use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};

const CONFIG_FILE: &str = "config.toml";

/// Application paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    /// Platform config directory for chainprobe
    /// (`~/.config/chainprobe` on Linux).
    #[must_use]
    pub fn new() -> Self {
        if let Some(dirs) = ProjectDirs::from("", "", "chainprobe") {
            return Self {
                config: dirs.config_dir().to_path_buf(),
            };
        }
        let home = BaseDirs::new().map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
        Self {
            config: home.join(".config").join("chainprobe"),
        }
    }

    /// Default config file path.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join(CONFIG_FILE)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
