//! Configuration management (TOML)

use crate::groups::GroupRegistry;
use crate::thresholds::ThresholdSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid default thresholds: {0}")]
    Thresholds(#[from] crate::thresholds::ThresholdError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Group name to member process names. Empty means the built-in groups.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub listen_addr: String,
    pub tick_interval_secs: u64,
    pub sample_window_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub cpu_high: f64,
    pub cpu_low: f64,
    pub mem_high: f64,
    pub mem_low: f64,
    /// Reject updates that leave low above high or contain negative values.
    pub validate: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            listen_addr: "127.0.0.1:5000".to_string(),
            tick_interval_secs: 5,
            sample_window_ms: 500,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let defaults = ThresholdSet::default();
        ThresholdConfig {
            cpu_high: defaults.cpu_high,
            cpu_low: defaults.cpu_low,
            mem_high: defaults.mem_high,
            mem_low: defaults.mem_low,
            validate: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let groups: BTreeMap<String, Vec<String>> = GroupRegistry::default()
            .groups()
            .iter()
            .map(|(name, members)| (name.clone(), members.iter().cloned().collect()))
            .collect();
        Config {
            general: GeneralConfig::default(),
            thresholds: ThresholdConfig::default(),
            groups,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        if config.thresholds.validate {
            config.initial_thresholds().validate()?;
        }
        Ok(config)
    }

    /// Loads `path`, or writes the defaults there when it does not exist yet
    /// so operators have a file to edit. A failed write still yields defaults.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Config::default();
        match config.save(path) {
            Ok(()) => info!("No config file found, wrote defaults to {:?}", path),
            Err(e) => warn!("No config file found and writing defaults to {:?} failed: {}", path, e),
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "allocator-daemon")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn initial_thresholds(&self) -> ThresholdSet {
        ThresholdSet {
            cpu_high: self.thresholds.cpu_high,
            cpu_low: self.thresholds.cpu_low,
            mem_high: self.thresholds.mem_high,
            mem_low: self.thresholds.mem_low,
        }
    }

    pub fn registry(&self) -> GroupRegistry {
        if self.groups.is_empty() {
            GroupRegistry::default()
        } else {
            GroupRegistry::new(self.groups.clone())
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.general.tick_interval_secs.max(1))
    }

    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.general.sample_window_ms.max(100))
    }
}
