//! Coordinator lifecycle guardian
//!
//! Hosts destroy and rebuild their object graph on level transitions, taking
//! the coordinator object with it. Instead of hooking host teardown events,
//! the guardian re-asserts one invariant on every tick: exactly one
//! coordinator object lives in the graph under the well-known name, and the
//! guardian's handle points at it.
//!
//! ```text
//!            tick, handle dead / unset
//!   ABSENT ──────────────────────────────▶ PRESENT ─┐
//!     ▲                                       │     │ tick, handle alive
//!     └───────── host destroys object ────────┘ ◀───┘ (no-op)
//! ```
//!
//! Any object already sitting under the well-known name when the guardian
//! has no live coordinator is treated as stale and destroyed.

use clipswap_core::{CoordinatorId, ObjectGraph, ObjectId};

/// Default name of the coordinator's host object
pub const DEFAULT_COORDINATOR_NAME: &str = "ClipSwapCoordinator";

/// The live coordinator and the host object carrying it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinatorHandle {
    /// Coordinator identity
    pub id: CoordinatorId,
    /// Host object the coordinator is attached to
    pub object: ObjectId,
}

/// Whether a live coordinator currently exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardianState {
    /// No live coordinator
    Absent,
    /// A coordinator is attached to a live host object
    Present,
}

/// What a tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Coordinator was alive; nothing happened
    Unchanged(CoordinatorHandle),
    /// A new coordinator was created
    Created {
        /// The new coordinator
        handle: CoordinatorHandle,
        /// Stale objects found under the well-known name and destroyed
        evicted: Vec<ObjectId>,
        /// Previously recorded coordinator that was superseded
        replaced: Option<CoordinatorId>,
    },
}

impl TickOutcome {
    /// Coordinator current after the tick
    pub fn handle(&self) -> CoordinatorHandle {
        match self {
            Self::Unchanged(handle) => *handle,
            Self::Created { handle, .. } => *handle,
        }
    }

    /// Check if the tick created a coordinator
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Keeps exactly one coordinator alive in a host object graph
#[derive(Debug)]
pub struct LifecycleGuardian {
    object_name: String,
    current: Option<CoordinatorHandle>,
    created: u64,
    evicted: u64,
}

impl LifecycleGuardian {
    /// Create a guardian using `object_name` as the well-known name
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            current: None,
            created: 0,
            evicted: 0,
        }
    }

    /// Well-known coordinator object name
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Last recorded coordinator, whether or not it is still alive
    pub fn current(&self) -> Option<CoordinatorHandle> {
        self.current
    }

    /// Live coordinator, if any
    pub fn live(&self, graph: &dyn ObjectGraph) -> Option<CoordinatorHandle> {
        self.current.filter(|handle| graph.is_alive(handle.object))
    }

    /// Current state against `graph`
    pub fn state(&self, graph: &dyn ObjectGraph) -> GuardianState {
        if self.live(graph).is_some() {
            GuardianState::Present
        } else {
            GuardianState::Absent
        }
    }

    /// Coordinators created so far
    pub fn created_count(&self) -> u64 {
        self.created
    }

    /// Stale objects destroyed so far
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    /// Reconcile against `graph`; afterwards a live coordinator exists.
    pub fn tick(&mut self, graph: &mut dyn ObjectGraph) -> TickOutcome {
        if let Some(handle) = self.live(graph) {
            return TickOutcome::Unchanged(handle);
        }

        let mut evicted = Vec::new();
        for stale in graph.find_all(&self.object_name) {
            if graph.destroy(stale) {
                log::warn!(
                    "Destroyed stale object {} found under coordinator name '{}'",
                    stale,
                    self.object_name
                );
                evicted.push(stale);
            }
        }

        let object = graph.create(&self.object_name);
        let handle = CoordinatorHandle {
            id: CoordinatorId::next(),
            object,
        };

        // A recorded coordinator only gets here once its object is gone
        let replaced = self.current.replace(handle).map(|previous| previous.id);

        self.created += 1;
        self.evicted += evicted.len() as u64;

        match replaced {
            Some(previous) => log::info!("Recreated coordinator: {} replaces {} on object {}", handle.id, previous, object),
            None => log::info!("Created {} on object {}", handle.id, object),
        }

        TickOutcome::Created {
            handle,
            evicted,
            replaced,
        }
    }
}

impl Default for LifecycleGuardian {
    fn default() -> Self {
        Self::new(DEFAULT_COORDINATOR_NAME)
    }
}
