//! The ClipSwap service
//!
//! One value owns everything the system shares: the override registry, the
//! coordinator guardian, the clip loader and the debug switches. The host
//! keeps it (usually behind an `Arc`), ticks it every frame and hands the
//! read-only [`ClipSwap::overrides`] view to its interception hook.
//!
//! Every entry point that mutates state or loads from disk first runs the
//! guardian, so no operation is ever accepted without a live coordinator.
//! The registry and the loader are only reachable through those entry
//! points. [`ClipSwap::lookup`] skips the guardian: it sits on the host's
//! asset path and only reads the map.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::{Mutex, RwLock};

use clipswap_core::{AudioClip, ClipHandle, ObjectGraph};

use crate::config::ClipSwapConfig;
use crate::decoder::{AudioDecoder, WavDecoder};
use crate::lifecycle::{CoordinatorHandle, GuardianState, LifecycleGuardian, TickOutcome};
use crate::loader::{ClipLoader, LoadResult, LoaderStats};
use crate::overrides::{OverrideLookup, SharedOverrideRegistry};
use crate::service::{Service, ServiceError, ServiceHealth, ServiceResult, ServiceState};

/// Host object graph shared between the host and ClipSwap
pub type SharedObjectGraph = Arc<Mutex<dyn ObjectGraph>>;

/// Runtime audio clip overrides for a host application
pub struct ClipSwap {
    config: ClipSwapConfig,
    state: RwLock<ServiceState>,
    host: SharedObjectGraph,
    guardian: Mutex<LifecycleGuardian>,
    overrides: SharedOverrideRegistry,
    loader: ClipLoader,
    debug_audio_sources: AtomicBool,
    indepth_debugging: AtomicBool,
}

impl ClipSwap {
    /// Create a service that decodes WAV files itself
    pub fn new(config: ClipSwapConfig, host: SharedObjectGraph) -> Self {
        Self::with_decoder(config, host, Arc::new(WavDecoder::new()))
    }

    /// Create a service that decodes through the host's `decoder`
    pub fn with_decoder(config: ClipSwapConfig, host: SharedObjectGraph, decoder: Arc<dyn AudioDecoder>) -> Self {
        let loader = ClipLoader::with_decoder(config.data_root.clone(), decoder);
        let guardian = LifecycleGuardian::new(config.coordinator_name.clone());

        Self {
            debug_audio_sources: AtomicBool::new(config.debug.audio_sources),
            indepth_debugging: AtomicBool::new(config.debug.indepth),
            config,
            state: RwLock::new(ServiceState::Stopped),
            host,
            guardian: Mutex::new(guardian),
            overrides: SharedOverrideRegistry::new(),
            loader,
        }
    }

    /// Get configuration
    pub fn config(&self) -> &ClipSwapConfig {
        &self.config
    }

    /// Make sure the coordinator exists. Call once per host frame.
    pub fn tick(&self) -> TickOutcome {
        let mut host = self.host.lock();
        self.guardian.lock().tick(&mut *host)
    }

    /// Final tick at host shutdown.
    ///
    /// This may recreate the coordinator right before the process exits.
    pub fn shutdown(&self) -> TickOutcome {
        let outcome = self.tick();
        *self.state.write() = ServiceState::Stopped;
        log::info!("ClipSwap shut down with {} override(s) registered", self.overrides.len());
        outcome
    }

    /// Live coordinator, if any
    pub fn coordinator(&self) -> Option<CoordinatorHandle> {
        let host = self.host.lock();
        self.guardian.lock().live(&*host)
    }

    /// Whether a live coordinator exists right now
    pub fn guardian_state(&self) -> GuardianState {
        let host = self.host.lock();
        self.guardian.lock().state(&*host)
    }

    /// Read-only registry view for an interception hook
    pub fn overrides(&self) -> OverrideLookup {
        self.overrides.view()
    }

    /// Loader counters
    pub fn loader_stats(&self) -> LoaderStats {
        self.loader.stats()
    }

    /// Play `clip` wherever the host asks for `name`.
    ///
    /// Rejected (and logged) for an empty name, a missing clip, or a name
    /// that is already overridden. Returns true if the override was added.
    pub fn add(&self, name: &str, clip: Option<ClipHandle>) -> bool {
        self.tick();
        self.overrides.add(name, clip)
    }

    /// [`ClipSwap::add`] keyed by the original clip's own name
    pub fn add_for_clip(&self, original: Option<&AudioClip>, clip: Option<ClipHandle>) -> bool {
        self.tick();
        self.overrides.add_for_clip(original, clip)
    }

    /// Restore the host's original clip for `name`.
    ///
    /// Rejected (and logged) for an empty or unknown name.
    pub fn remove(&self, name: &str) -> bool {
        self.tick();
        self.overrides.remove(name)
    }

    /// [`ClipSwap::remove`] keyed by the original clip's own name
    pub fn remove_for_clip(&self, original: Option<&AudioClip>) -> bool {
        self.tick();
        self.overrides.remove_for_clip(original)
    }

    /// Override registered for `name`
    pub fn lookup(&self, name: &str) -> Option<ClipHandle> {
        self.overrides.lookup(name)
    }

    /// Clip to actually play when the host asks for `original`
    pub fn resolve(&self, original: &ClipHandle) -> ClipHandle {
        let replacement = self.overrides.lookup(original.name());

        if self.debug_audio_sources() {
            match &replacement {
                Some(clip) => log::info!("Clip '{}' requested, playing override '{}'", original.name(), clip.name()),
                None => log::info!("Clip '{}' requested, playing original", original.name()),
            }
            if self.indepth_debugging() {
                log::debug!("Requested {:?}, override {:?}", original, replacement);
            }
        }

        replacement.unwrap_or_else(|| Arc::clone(original))
    }

    /// Load `file` from `folder` under the data root
    pub async fn load(&self, folder: &str, file: &str) -> LoadResult {
        self.tick();
        self.loader.load(folder, file).await
    }

    /// [`ClipSwap::load`] with a deadline
    pub async fn load_with_timeout(&self, folder: &str, file: &str, timeout: Duration) -> LoadResult {
        self.tick();
        self.loader.load_with_timeout(folder, file, timeout).await
    }

    /// Load and register every override listed in the configuration.
    ///
    /// Failed entries are logged and skipped. Returns how many were added.
    pub async fn apply_configured_overrides(&self) -> usize {
        let mut applied = 0;

        for spec in &self.config.overrides {
            let loaded = match self.config.load_timeout() {
                Some(timeout) => self.load_with_timeout(&spec.folder, &spec.file, timeout).await,
                None => self.load(&spec.folder, &spec.file).await,
            };
            // A failed load still goes through add so the rejection is logged
            if self.add(&spec.name, loaded.ok()) {
                applied += 1;
            }
        }

        log::info!(
            "Applied {} of {} configured override(s)",
            applied,
            self.config.overrides.len()
        );
        applied
    }

    /// Whether clip resolutions are logged
    pub fn debug_audio_sources(&self) -> bool {
        self.debug_audio_sources.load(Ordering::Relaxed)
    }

    /// Switch clip resolution logging
    pub fn set_debug_audio_sources(&self, enabled: bool) {
        self.debug_audio_sources.store(enabled, Ordering::Relaxed);
        log::info!("Audio source debugging {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Flip clip resolution logging, returning the new value
    pub fn toggle_debug_audio_sources(&self) -> bool {
        let enabled = !self.debug_audio_sources.fetch_xor(true, Ordering::Relaxed);
        log::info!("Audio source debugging {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    /// Whether resolutions also log clip details
    pub fn indepth_debugging(&self) -> bool {
        self.indepth_debugging.load(Ordering::Relaxed)
    }

    /// Switch detailed resolution logging
    pub fn set_indepth_debugging(&self, enabled: bool) {
        self.indepth_debugging.store(enabled, Ordering::Relaxed);
        log::info!("In-depth debugging {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Flip detailed resolution logging, returning the new value
    pub fn toggle_indepth_debugging(&self) -> bool {
        let enabled = !self.indepth_debugging.fetch_xor(true, Ordering::Relaxed);
        log::info!("In-depth debugging {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    fn metrics(&self, health: ServiceHealth) -> ServiceHealth {
        let (created, evicted) = {
            let guardian = self.guardian.lock();
            (guardian.created_count(), guardian.evicted_count())
        };
        let stats = self.loader.stats();

        health
            .metric("overrides", self.overrides.len() as f64)
            .metric("coordinators_created", created as f64)
            .metric("stale_objects_evicted", evicted as f64)
            .metric("loads_requested", stats.requested as f64)
            .metric("loads_succeeded", stats.loaded as f64)
            .metric("loads_failed", stats.failed as f64)
            .metric("bytes_loaded", stats.bytes_read as f64)
    }
}

impl Service for ClipSwap {
    fn name(&self) -> &'static str {
        "clipswap"
    }

    fn state(&self) -> ServiceState {
        *self.state.read()
    }

    fn health(&self) -> ServiceHealth {
        let health = match self.state() {
            ServiceState::Running if self.loader.stats().consecutive_failures > 0 => {
                let reason = self
                    .loader
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                ServiceHealth::degraded(reason)
            }
            ServiceState::Running | ServiceState::Degraded => ServiceHealth::running(),
            ServiceState::Failed => ServiceHealth::failed("data root unavailable"),
            ServiceState::Stopped => ServiceHealth::stopped(),
        };
        self.metrics(health)
    }

    /// Create the data root if needed, then bring up the coordinator
    fn start(&mut self) -> ServiceResult<()> {
        let root = &self.config.data_root;
        if !root.exists() {
            if let Err(source) = std::fs::create_dir_all(root) {
                *self.state.write() = ServiceState::Failed;
                return Err(ServiceError::DataRoot {
                    path: root.clone(),
                    source,
                });
            }
        }

        *self.state.write() = ServiceState::Running;
        self.tick();
        log::info!("ClipSwap started, loading clips from {}", root.display());
        Ok(())
    }

    /// Run the shutdown tick. Registered overrides are kept.
    fn stop(&mut self) -> ServiceResult<()> {
        if !self.state().is_operational() {
            return Err(ServiceError::NotRunning(self.name()));
        }
        self.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipswap_core::SceneGraph;
    use crate::lifecycle::DEFAULT_COORDINATOR_NAME;

    fn setup() -> (Arc<Mutex<SceneGraph>>, ClipSwap) {
        let graph = Arc::new(Mutex::new(SceneGraph::new()));
        let swap = ClipSwap::new(ClipSwapConfig::default(), graph.clone());
        (graph, swap)
    }

    fn clip(name: &str) -> ClipHandle {
        AudioClip::new(name, 1, 8000, vec![0.0; 4]).into_handle()
    }

    #[test]
    fn test_operations_bring_up_coordinator() {
        let (graph, swap) = setup();
        assert_eq!(swap.guardian_state(), GuardianState::Absent);

        swap.add("doorOpen", Some(clip("a")));
        assert_eq!(swap.guardian_state(), GuardianState::Present);
        assert_eq!(graph.lock().find_all(DEFAULT_COORDINATOR_NAME).len(), 1);
    }

    #[test]
    fn test_rejected_add_still_reconciles() {
        let (graph, swap) = setup();
        assert!(!swap.add("", Some(clip("a"))));
        assert!(graph.lock().find(DEFAULT_COORDINATOR_NAME).is_some());
    }

    #[test]
    fn test_lookup_does_not_tick() {
        let (graph, swap) = setup();
        assert!(swap.lookup("anything").is_none());
        assert!(graph.lock().is_empty());
    }

    #[test]
    fn test_hook_view_only_sees_guarded_writes() {
        let (graph, swap) = setup();
        let hook = swap.overrides();
        assert!(hook.is_empty());
        assert!(graph.lock().is_empty());

        assert!(swap.add("doorOpen", Some(clip("creak"))));
        assert_eq!(swap.guardian_state(), GuardianState::Present);
        assert_eq!(hook.lookup("doorOpen").unwrap().name(), "creak");

        graph.lock().unload_level();
        assert!(swap.remove("doorOpen"));
        assert_eq!(swap.guardian_state(), GuardianState::Present);
        assert!(!hook.contains("doorOpen"));
    }

    #[test]
    fn test_resolve_prefers_override() {
        let (_graph, swap) = setup();
        let original = clip("footstep");
        let replacement = clip("squeak");

        assert!(Arc::ptr_eq(&swap.resolve(&original), &original));
        swap.add("footstep", Some(replacement.clone()));
        assert!(Arc::ptr_eq(&swap.resolve(&original), &replacement));

        swap.set_debug_audio_sources(true);
        swap.set_indepth_debugging(true);
        assert!(Arc::ptr_eq(&swap.resolve(&original), &replacement));
    }

    #[test]
    fn test_debug_toggles() {
        let (_graph, swap) = setup();
        assert!(!swap.debug_audio_sources());
        assert!(swap.toggle_debug_audio_sources());
        assert!(swap.debug_audio_sources());
        assert!(!swap.toggle_debug_audio_sources());

        assert!(swap.toggle_indepth_debugging());
        assert!(swap.indepth_debugging());
    }

    #[test]
    fn test_debug_flags_from_config() {
        let mut config = ClipSwapConfig::default();
        config.debug.audio_sources = true;
        let swap = ClipSwap::new(config, Arc::new(Mutex::new(SceneGraph::new())));
        assert!(swap.debug_audio_sources());
        assert!(!swap.indepth_debugging());
    }

    #[test]
    fn test_shutdown_ticks_and_stops() {
        let (graph, swap) = setup();
        swap.tick();
        graph.lock().unload_level();

        let outcome = swap.shutdown();
        assert!(outcome.is_created());
        assert_eq!(swap.state(), ServiceState::Stopped);
    }
}
