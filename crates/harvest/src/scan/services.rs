use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::catalog::Catalog;
use crate::lootability::{Identity, StateStore, UserExclusions};
use crate::taxonomy::{ProducerLootables, Taxonomy};
use crate::text::Translator;

use super::deferred::DeferredQueue;
use super::session::ScanGate;

/// Everything the scan thread shares with the host. Built once per world load.
pub struct ScanServices {
    pub catalog: Arc<Catalog>,
    pub taxonomy: Arc<Taxonomy>,
    pub producers: ProducerLootables,
    pub store: StateStore,
    pub exclusions: UserExclusions,
    pub deferred: DeferredQueue,
    pub gate: ScanGate,
    pub translator: Arc<dyn Translator>,
}

impl ScanServices {
    pub fn new(
        catalog: Arc<Catalog>,
        taxonomy: Arc<Taxonomy>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let mut off_limits: HashSet<Identity> = catalog
            .faction_containers()
            .into_iter()
            .map(Identity::Reference)
            .collect();
        off_limits.extend(taxonomy.vendor_containers().iter().copied().map(Identity::Form));
        off_limits.extend(
            taxonomy
                .off_limits_containers()
                .iter()
                .copied()
                .map(Identity::Form),
        );
        let quest_targets = catalog.quest_targets().iter().copied().collect();
        let producers = ProducerLootables::seeded(taxonomy.producer_lootables().iter().copied());
        info!(
            off_limits = off_limits.len(),
            producers = producers.len(),
            "scan_services_ready"
        );
        Self {
            store: StateStore::new(off_limits, quest_targets),
            producers,
            exclusions: UserExclusions::default(),
            deferred: DeferredQueue::default(),
            gate: ScanGate::default(),
            catalog,
            taxonomy,
            translator,
        }
    }

    /// Session reset shared by the host lifecycle hooks and observer transitions.
    /// `preserve_special_cases == false` is a full world reload.
    pub fn reset(&self, preserve_special_cases: bool) {
        self.store.reset_session(preserve_special_cases);
        self.deferred.reset(!preserve_special_cases);
    }
}
