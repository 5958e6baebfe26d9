//! ClipSwap configuration
//!
//! # Example Config File
//!
//! ```toml
//! data_root = "plugins"
//! coordinator_name = "ClipSwapCoordinator"
//! load_timeout_ms = 5000
//!
//! [debug]
//! audio_sources = true
//! indepth = false
//!
//! [[overrides]]
//! name = "doorOpen"
//! folder = "MyMod"
//! file = "creak.wav"
//! ```
//!
//! `CLIPSWAP_DATA_ROOT` in the environment replaces `data_root`.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::lifecycle::DEFAULT_COORDINATOR_NAME;

/// Environment variable overriding the data root
pub const DATA_ROOT_ENV: &str = "CLIPSWAP_DATA_ROOT";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Debug logging switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log every clip resolution and whether it was overridden
    pub audio_sources: bool,
    /// Also log clip details on every resolution
    pub indepth: bool,
}

/// An override to load and register at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSpec {
    /// Name of the host clip to replace
    pub name: String,
    /// Folder under the data root
    pub folder: String,
    /// File inside the folder
    pub file: String,
}

/// ClipSwap configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSwapConfig {
    /// Root folder replacement clips are loaded from
    pub data_root: PathBuf,
    /// Well-known name of the coordinator's host object
    pub coordinator_name: String,
    /// Deadline for configured override loads, in milliseconds
    pub load_timeout_ms: Option<u64>,
    /// Debug switches
    pub debug: DebugConfig,
    /// Overrides applied at startup
    pub overrides: Vec<OverrideSpec>,
}

impl Default for ClipSwapConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("plugins"),
            coordinator_name: DEFAULT_COORDINATOR_NAME.to_string(),
            load_timeout_ms: None,
            debug: DebugConfig::default(),
            overrides: Vec::new(),
        }
    }
}

impl ClipSwapConfig {
    /// Load from a TOML file, then apply environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CLIPSWAP_DATA_ROOT` if set
    pub fn apply_env(&mut self) {
        if let Ok(root) = std::env::var(DATA_ROOT_ENV) {
            if !root.is_empty() {
                log::info!("Data root overridden by {}: {}", DATA_ROOT_ENV, root);
                self.data_root = PathBuf::from(root);
            }
        }
    }

    /// Configured load deadline
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// Use `root` as data root
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }
}
