//! Application settings (TOML)
//!
//! Separate from the VPN data file: these only say where that file lives
//! and how often watch mode reconnects.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const LOCAL_CONFIG_FILE: &str = "vpn-keeper.toml";
pub const DEFAULT_VPN_DATA_PATH: &str = "./vpn_data.json";
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vpn_data_path: PathBuf,
    pub watch_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vpn_data_path: PathBuf::from(DEFAULT_VPN_DATA_PATH),
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from the first location that exists
    ///
    /// An explicit path must exist. Otherwise `./vpn-keeper.toml`, then
    /// `~/.vpn-keeper/config.toml`, then built-in defaults.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for candidate in Self::search_paths() {
            if candidate.exists() {
                info!("Using settings from {}", candidate.display());
                return Self::load(&candidate);
            }
        }

        debug!("No settings file found, using defaults");
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".vpn-keeper").join("config.toml"));
        }
        paths
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.vpn_data_path, PathBuf::from("./vpn_data.json"));
        assert_eq!(config.watch_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_full() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "vpn_data_path = \"/etc/vpn/data.json\"\nwatch_interval_secs = 15\n",
        )
        .unwrap();

        let config = Config::locate(Some(&path)).unwrap();
        assert_eq!(config.vpn_data_path, PathBuf::from("/etc/vpn/data.json"));
        assert_eq!(config.watch_interval_secs, 15);
    }

    #[test]
    fn test_load_partial_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "watch_interval_secs = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.watch_interval_secs, 5);
        assert_eq!(config.vpn_data_path, PathBuf::from(DEFAULT_VPN_DATA_PATH));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let result = Config::locate(Some(Path::new("/nonexistent/vpn-keeper.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "watch_interval_secs = \"soon\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::ParseError(_))));
    }
}
