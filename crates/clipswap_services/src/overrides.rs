//! Override registry
//!
//! Maps an asset name to the clip that should play instead of the host's
//! original. Registration is first-come: a second override for the same name
//! is rejected, never merged or replaced. Replacing means `remove` then `add`.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use thiserror::Error;

use clipswap_core::{AudioClip, ClipHandle};

/// Why an override operation was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Clip '{0}' already has an override")]
    DuplicateKey(String),

    #[error("Clip '{0}' has no override")]
    NotFound(String),
}

/// Name → clip overrides
#[derive(Debug, Default)]
pub(crate) struct OverrideRegistry {
    entries: HashMap<String, ClipHandle>,
}

impl OverrideRegistry {
    /// Register `clip` as the override for `name`.
    ///
    /// Checked in order: name non-empty, clip present, name not yet taken.
    pub fn try_add(&mut self, name: &str, clip: Option<ClipHandle>) -> Result<(), OverrideError> {
        if name.is_empty() {
            return Err(OverrideError::InvalidArgument("no original clip name given"));
        }
        let Some(clip) = clip else {
            return Err(OverrideError::InvalidArgument("no replacement clip given"));
        };
        if self.entries.contains_key(name) {
            return Err(OverrideError::DuplicateKey(name.to_string()));
        }

        self.entries.insert(name.to_string(), clip);
        Ok(())
    }

    /// Drop the override for `name`
    pub fn try_remove(&mut self, name: &str) -> Result<ClipHandle, OverrideError> {
        if name.is_empty() {
            return Err(OverrideError::InvalidArgument("no original clip name given"));
        }

        self.entries
            .remove(name)
            .ok_or_else(|| OverrideError::NotFound(name.to_string()))
    }

    /// Override registered for `name`, if any
    pub fn get(&self, name: &str) -> Option<ClipHandle> {
        if name.is_empty() {
            return None;
        }
        self.entries.get(name).cloned()
    }

    /// Check if `name` is overridden
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Get number of overrides
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overridden names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Thread-safe override registry.
///
/// Lookups take the read lock, so they run in parallel with each other and
/// only wait on an in-progress `add`/`remove`. Writes stay inside the crate:
/// the service runs the guardian before each one. Hooks get an
/// [`OverrideLookup`].
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedOverrideRegistry {
    inner: Arc<RwLock<OverrideRegistry>>,
}

impl SharedOverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only handle on the same map
    pub fn view(&self) -> OverrideLookup {
        OverrideLookup {
            inner: Arc::clone(&self.inner),
        }
    }

    /// See [`OverrideRegistry::try_add`]
    pub fn try_add(&self, name: &str, clip: Option<ClipHandle>) -> Result<(), OverrideError> {
        self.inner.write().try_add(name, clip)
    }

    /// See [`OverrideRegistry::try_remove`]
    pub fn try_remove(&self, name: &str) -> Result<ClipHandle, OverrideError> {
        self.inner.write().try_remove(name)
    }

    /// Register an override, logging instead of failing.
    ///
    /// Returns true if the registry changed.
    pub fn add(&self, name: &str, clip: Option<ClipHandle>) -> bool {
        match self.try_add(name, clip) {
            Ok(()) => {
                log::debug!("Registered override for clip '{}'", name);
                true
            }
            Err(e) => {
                log::warn!("Rejected override for clip '{}': {}", name, e);
                false
            }
        }
    }

    /// Register an override keyed by the original clip's own name
    pub fn add_for_clip(&self, original: Option<&AudioClip>, clip: Option<ClipHandle>) -> bool {
        let Some(original) = original else {
            log::warn!("Rejected override: {}", OverrideError::InvalidArgument("no original clip given"));
            return false;
        };
        if clip.is_none() {
            log::warn!(
                "Rejected override for clip '{}': {}",
                original.name(),
                OverrideError::InvalidArgument("no replacement clip given")
            );
            return false;
        }
        self.add(original.name(), clip)
    }

    /// Remove an override, logging instead of failing.
    ///
    /// Returns true if the registry changed.
    pub fn remove(&self, name: &str) -> bool {
        match self.try_remove(name) {
            Ok(_) => {
                log::debug!("Restored original clip '{}'", name);
                true
            }
            Err(e) => {
                log::warn!("Rejected restore of clip '{}': {}", name, e);
                false
            }
        }
    }

    /// Remove the override keyed by the original clip's own name
    pub fn remove_for_clip(&self, original: Option<&AudioClip>) -> bool {
        match original {
            Some(original) => self.remove(original.name()),
            None => {
                log::warn!("Rejected restore: {}", OverrideError::InvalidArgument("no original clip given"));
                false
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ClipHandle> {
        self.inner.read().get(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

/// Read-only view of the overrides, for an interception hook.
///
/// Cloning shares the same map and every clone sees later changes. There is
/// no way to write through a view:
///
/// ```compile_fail
/// # use clipswap_services::OverrideLookup;
/// fn hook(overrides: &OverrideLookup, clip: clipswap_core::ClipHandle) {
///     overrides.add("doorOpen", Some(clip));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct OverrideLookup {
    inner: Arc<RwLock<OverrideRegistry>>,
}

impl OverrideLookup {
    /// Override for `name`; empty for unknown or empty names
    pub fn lookup(&self, name: &str) -> Option<ClipHandle> {
        self.inner.read().get(name)
    }

    /// Check if `name` is overridden
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains(name)
    }

    /// Get number of overrides
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Overridden names, sorted
    pub fn names(&self) -> Vec<String> {
        self.inner.read().names()
    }
}
