//! Runtime Configuration
//!
//! The runtime reads one TOML file holding both the ClipSwap settings and a
//! `[runtime]` table for the simulated host.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. `CLIPSWAP_DATA_ROOT` for the data root
//! 2. Config file given as the first command line argument
//! 3. `clipswap.toml`, then `config/clipswap.toml`
//! 4. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! data_root = "plugins"
//!
//! [runtime]
//! frames = 600       # 0 runs until Ctrl+C
//! frame_ms = 16
//! level_every = 120  # frames between level transitions, 0 disables
//! shutdown_grace_ms = 2000  # wait for configured overrides at exit
//!
//! [[overrides]]
//! name = "doorOpen"
//! folder = "MyMod"
//! file = "creak.wav"
//! ```

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use clipswap_services::{ClipSwapConfig, ConfigError};

/// Files searched when no path is given
const SEARCH_PATHS: &[&str] = &["clipswap.toml", "config/clipswap.toml"];

/// Simulated host loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Frames to run, 0 = until Ctrl+C
    pub frames: u64,
    /// Milliseconds per frame
    pub frame_ms: u64,
    /// Frames between level transitions, 0 = never
    pub level_every: u64,
    /// How long a normal exit waits for configured overrides still loading
    pub shutdown_grace_ms: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_ms: 16,
            level_every: 120,
            shutdown_grace_ms: 2000,
        }
    }
}

impl RunSettings {
    /// Frame interval
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }

    /// Exit wait for configured overrides
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Whether `frame` is still inside the configured run
    pub fn should_run(&self, frame: u64) -> bool {
        self.frames == 0 || frame < self.frames
    }

    /// Whether the host unloads its level before `frame`
    pub fn is_level_transition(&self, frame: u64) -> bool {
        self.level_every > 0 && frame > 0 && frame % self.level_every == 0
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Host loop settings
    pub runtime: RunSettings,
    /// ClipSwap service settings
    #[serde(flatten)]
    pub clipswap: ClipSwapConfig,
    /// File the configuration came from
    #[serde(skip)]
    pub config_path: Option<String>,
}

impl RuntimeConfig {
    /// Load configuration from the command line path or the search paths
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::args().skip(1).find(|arg| !arg.starts_with("--"));

        let mut config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::search()?,
        };

        config.clipswap.apply_env();
        Ok(config)
    }

    fn search() -> Result<Self, ConfigError> {
        for path in SEARCH_PATHS {
            if Path::new(path).is_file() {
                return Self::load_from_file(path);
            }
        }
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.into(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_string());
        log::info!("Loaded config from {}", path);
        Ok(config)
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Log a summary of the configuration
    pub fn print_summary(&self) {
        log::info!("Runtime Configuration:");
        log::info!("  Data root: {}", self.clipswap.data_root.display());
        log::info!("  Coordinator: {}", self.clipswap.coordinator_name);
        if self.runtime.frames == 0 {
            log::info!("  Frames: until Ctrl+C, {}ms each", self.runtime.frame_ms);
        } else {
            log::info!("  Frames: {}, {}ms each", self.runtime.frames, self.runtime.frame_ms);
        }
        if self.runtime.level_every > 0 {
            log::info!("  Level transition every {} frames", self.runtime.level_every);
        }
        log::info!("  Configured overrides: {}", self.clipswap.overrides.len());
        if let Some(path) = &self.config_path {
            log::info!("  Config: {}", path);
        }
    }
}
