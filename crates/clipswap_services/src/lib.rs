//! # ClipSwap Services
//!
//! Runtime replacement of a host application's audio clips.
//!
//! - Override registry: clip name to replacement clip, safe to read from
//!   any thread while the host keeps playing
//! - Coordinator lifecycle: keeps one coordinator object alive in the host
//!   graph across level transitions
//! - Clip loading: reads clips from folders under a data root without
//!   blocking the caller
//!
//! ## Usage
//!
//! ```ignore
//! let scene = Arc::new(Mutex::new(SceneGraph::new()));
//! let mut clipswap = ClipSwap::new(ClipSwapConfig::default(), scene.clone());
//! clipswap.start()?;
//!
//! let clip = clipswap.load("MyMod", "creak.wav").await?;
//! clipswap.add("doorOpen", Some(clip));
//!
//! // Every host frame
//! clipswap.tick();
//! ```

pub mod service;
pub mod overrides;
pub mod lifecycle;
pub mod decoder;
pub mod loader;
pub mod config;
pub mod clipswap;

pub use service::{Service, ServiceState, ServiceHealth, ServiceError, ServiceResult};
pub use overrides::{OverrideError, OverrideLookup};
pub use lifecycle::{CoordinatorHandle, GuardianState, LifecycleGuardian, TickOutcome, DEFAULT_COORDINATOR_NAME};
pub use decoder::{AudioDecoder, DecodeError, WavDecoder};
pub use loader::{ClipLoader, LoadError, LoadErrorKind, LoadRequest, LoadResult, LoaderStats};
pub use config::{ClipSwapConfig, ConfigError, DebugConfig, OverrideSpec, DATA_ROOT_ENV};
pub use clipswap::{ClipSwap, SharedObjectGraph};

use thiserror::Error;

/// Service layer errors
#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Override error: {0}")]
    Override(#[from] OverrideError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServicesResult<T> = Result<T, ServicesError>;
