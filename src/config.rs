//! Configuration management for scenelink
//!
//! Configuration can be loaded from:
//! - Default values
//! - Config file (~/.config/scenelink/config.toml)

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transport configuration
    pub transport: TransportConfig,
    /// Synchronization behavior
    pub sync: SyncBehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Host the external editor listens on
    pub host: String,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// How long to wait for a requested update before giving up
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncBehaviorConfig {
    /// Push the open scene's instances when the window loses focus
    pub push_instances_on_blur: bool,
    /// Request a full project update when the window gains focus
    pub pull_on_focus: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            sync: SyncBehaviorConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
        }
    }
}

impl Default for SyncBehaviorConfig {
    fn default() -> Self {
        Self {
            push_instances_on_blur: true,
            pull_on_focus: true,
        }
    }
}

impl Config {
    /// Get default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scenelink")
            .join("config.toml")
    }

    /// Load configuration from file, falling back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config =
                toml::from_str(&content).map_err(|e| BridgeError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| BridgeError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;

        Ok(())
    }
}
