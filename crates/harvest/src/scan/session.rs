use std::sync::atomic::{AtomicBool, Ordering};

use crate::catalog::{CellId, LocationId};
use crate::world::ObserverContext;

/// Lifecycle switches flipped by the host and read by the scan thread each cycle.
#[derive(Debug, Default)]
pub struct ScanGate {
    synced: AtomicBool,
    search_allowed: AtomicBool,
    observer_stale: AtomicBool,
}

impl ScanGate {
    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::Release);
    }

    /// Stops scanning until the next sync and forgets the tracked observer.
    pub fn unsync(&self) {
        self.synced.store(false, Ordering::Release);
        self.search_allowed.store(false, Ordering::Release);
        self.observer_stale.store(true, Ordering::Release);
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    pub fn set_search_allowed(&self, allowed: bool) {
        self.search_allowed.store(allowed, Ordering::Release);
    }

    pub fn is_search_allowed(&self) -> bool {
        self.search_allowed.load(Ordering::Acquire)
    }

    pub(crate) fn take_observer_stale(&self) -> bool {
        self.observer_stale.swap(false, Ordering::AcqRel)
    }
}

/// The parts of the observer context whose change invalidates the session registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ObserverTracker {
    seen: bool,
    sneaking: bool,
    cell: Option<CellId>,
    location: Option<LocationId>,
}

impl ObserverTracker {
    /// Records `context` and reports whether the sneak state, cell or location changed.
    pub(crate) fn observe(&mut self, context: &ObserverContext) -> bool {
        let next = ObserverTracker {
            seen: true,
            sneaking: context.sneaking,
            cell: context.cell,
            location: context.location,
        };
        let changed = self.seen && *self != next;
        *self = next;
        changed
    }

    pub(crate) fn forget(&mut self) {
        *self = ObserverTracker::default();
    }
}
