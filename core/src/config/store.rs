//! Configuration Store
//!
//! Loads and saves the TOML settings file.

use crate::error::{Result, SimError};
use crate::scenario::ScenarioTable;
use crate::engine::{check_speed, DEFAULT_LOG_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Playback speed factor applied to every timeline
    pub speed: f64,

    /// Fixed seed for scenario selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Maximum lines kept in each simulation's log
    pub log_capacity: usize,

    /// Optional TOML file replacing the built-in scenario table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_file: Option<PathBuf>,

    /// Forward analytics events to the debug log
    pub analytics: bool,

    /// Mirror the debug log to a file in the data directory
    pub debug_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed: 1.0,
            seed: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
            scenario_file: None,
            analytics: false,
            debug_log: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SimError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => crate::warn_log!("Ignoring config at {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("agentic-sim").join("config.toml"))
    }

    /// Directory for the debug log file
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("agentic-sim"))
    }

    pub fn validate(&self) -> Result<()> {
        check_speed(self.speed)?;
        if self.log_capacity == 0 {
            return Err(SimError::InvalidConfig {
                message: "log_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The scenario table to route: the configured file, else the built-in one
    pub fn scenario_table(&self) -> Result<ScenarioTable> {
        match &self.scenario_file {
            Some(path) => ScenarioTable::load(path),
            None => Ok(ScenarioTable::builtin()),
        }
    }
}
