//! Host-facing lifecycle
//!
//! A host starts ClipSwap once, ticks it every frame, stops it at shutdown
//! and may poll its health at any point. A restart is a stop followed by a
//! start: the coordinator gets its shutdown tick and is reconciled again,
//! while registered overrides stay in place.

use std::collections::BTreeMap;
use std::path::PathBuf;
use serde::Serialize;
use thiserror::Error;

/// Lifecycle state as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceState {
    Stopped,
    Running,
    /// Running, but recent loads failed
    Degraded,
    /// The data root could not be prepared
    Failed,
}

impl ServiceState {
    /// Running or degraded
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Running | Self::Degraded)
    }
}

/// Health report.
///
/// Metrics are kept sorted so the JSON report reads the same every time.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub state: ServiceState,
    /// 1.0 running, 0.5 degraded, 0.0 stopped or failed
    pub health_score: f32,
    pub last_error: Option<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl ServiceHealth {
    fn with_state(state: ServiceState, health_score: f32, last_error: Option<String>) -> Self {
        Self {
            state,
            health_score,
            last_error,
            metrics: BTreeMap::new(),
        }
    }

    pub fn stopped() -> Self {
        Self::with_state(ServiceState::Stopped, 0.0, None)
    }

    pub fn running() -> Self {
        Self::with_state(ServiceState::Running, 1.0, None)
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::with_state(ServiceState::Degraded, 0.5, Some(reason.into()))
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with_state(ServiceState::Failed, 0.0, Some(reason.into()))
    }

    /// Attach a counter
    pub fn metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} is not running")]
    NotRunning(&'static str),

    #[error("Cannot prepare data root {path}: {source}")]
    DataRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Start, stop and health of a host-driven service
pub trait Service: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    fn state(&self) -> ServiceState;

    fn health(&self) -> ServiceHealth;

    fn start(&mut self) -> ServiceResult<()>;

    fn stop(&mut self) -> ServiceResult<()>;

    /// Stop, then start again. Fails without starting if not running.
    fn restart(&mut self) -> ServiceResult<()> {
        self.stop()?;
        self.start()
    }
}
