use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::catalog::{load_catalog, Catalog, CatalogLoadError, FormId, LocationId, RefId};
use crate::config::Settings;
use crate::lootability::{Identity, LootabilityReason};
use crate::scan::{ScanPipeline, ScanServices, ScanWorker, WorkerError};
use crate::taxonomy::{resolve, ObjectType, ResolveReport, RuleTables, RulesError};
use crate::text::{TranslationError, TranslationTable, Translator};
use crate::world::{ActionSink, WorldQuery};
use crate::DataPaths;

#[derive(Debug, Error)]
pub enum HarvesterError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error(transparent)]
    Translations(#[from] TranslationError),
}

/// Lifecycle facade the host talks to. Cheap to clone; every clone shares one set of
/// services.
#[derive(Clone)]
pub struct Harvester {
    services: Arc<ScanServices>,
}

impl Harvester {
    /// Loads catalog, rule tables and translations, then resolves the taxonomy. A catalog
    /// that fails to load leaves nothing to scan with.
    pub fn load(paths: &DataPaths) -> Result<Self, HarvesterError> {
        let catalog = load_catalog(&paths.catalog_dir)?;
        let rules = match &paths.rules_file {
            Some(path) => RuleTables::load(path)?,
            None => RuleTables::default(),
        };
        let translator = TranslationTable::load(&paths.translations_file)?;
        Ok(Self::from_parts(catalog, &rules, Arc::new(translator)))
    }

    pub fn from_parts(catalog: Catalog, rules: &RuleTables, translator: Arc<dyn Translator>) -> Self {
        let taxonomy = resolve(&catalog, rules, translator.as_ref());
        let services = ScanServices::new(Arc::new(catalog), Arc::new(taxonomy), translator);
        Self {
            services: Arc::new(services),
        }
    }

    pub fn services(&self) -> &Arc<ScanServices> {
        &self.services
    }

    pub fn classify(&self, form: FormId) -> ObjectType {
        self.services.taxonomy.object_type(form)
    }

    pub fn report(&self) -> &ResolveReport {
        self.services.taxonomy.report()
    }

    /// Blacklisting wins over any block reason.
    pub fn is_excluded(&self, identity: impl Into<Identity>) -> LootabilityReason {
        let identity = identity.into();
        if self.services.store.is_blacklisted(identity) {
            return LootabilityReason::ReferenceBlacklisted;
        }
        self.services.store.is_blocked(identity)
    }

    pub fn block(&self, identity: impl Into<Identity>, reason: LootabilityReason) -> bool {
        self.services.store.block(identity, reason)
    }

    pub fn block_permanently(&self, identity: impl Into<Identity>, reason: LootabilityReason) -> bool {
        self.services.store.block_permanently(identity, reason)
    }

    pub fn unblock_permanently(&self, identity: impl Into<Identity>) -> bool {
        self.services.store.unblock_permanently(identity)
    }

    pub fn blacklist(&self, identity: impl Into<Identity>) -> bool {
        self.services.store.blacklist(identity)
    }

    pub fn block_firehose_source(&self, reference: RefId) -> bool {
        self.services.store.block_firehose_source(reference)
    }

    pub fn reset_session(&self, preserve_special_cases: bool) {
        self.services.reset(preserve_special_cases);
        info!(preserve_special_cases, "session_reset");
    }

    pub fn reset_on_world_load(&self) {
        self.reset_session(false);
    }

    /// Called once the host finished loading. `reload` drops everything learned from the
    /// previous world.
    pub fn sync_done(&self, reload: bool) {
        self.reset_session(!reload);
        self.services.gate.mark_synced();
        info!(reload, "sync_done");
    }

    pub fn prepare_for_reload(&self) {
        self.services.gate.unsync();
        info!("prepare_for_reload");
    }

    pub fn allow_search(&self) {
        self.services.gate.set_search_allowed(true);
    }

    pub fn disallow_search(&self) {
        self.services.gate.set_search_allowed(false);
    }

    /// Acknowledges a delivered `AutoHarvest`.
    pub fn complete(&self, reference: RefId) -> bool {
        self.services.store.complete(reference)
    }

    /// Answer to `GetCritterIngredient`. Only `Some` resolves the producer; `None` just marks
    /// a request in flight and does nothing once one is already recorded.
    pub fn set_lootable_for_producer(&self, producer: FormId, lootable: Option<FormId>) -> bool {
        self.services.producers.set_lootable_for_producer(producer, lootable)
    }

    pub fn exclude_location(&self, location: LocationId) -> bool {
        self.services.exclusions.exclude_location(location)
    }

    pub fn include_location(&self, location: LocationId) -> bool {
        self.services.exclusions.include_location(location)
    }

    pub fn exclude_form(&self, form: FormId) -> bool {
        self.services.exclusions.exclude_form(form)
    }

    pub fn include_form(&self, form: FormId) -> bool {
        self.services.exclusions.include_form(form)
    }

    pub fn pipeline(
        &self,
        world: Arc<dyn WorldQuery>,
        settings: Arc<dyn Settings>,
        sink: Arc<dyn ActionSink>,
    ) -> ScanPipeline {
        ScanPipeline::new(Arc::clone(&self.services), world, settings, sink)
    }

    pub fn spawn_worker(
        &self,
        world: Arc<dyn WorldQuery>,
        settings: Arc<dyn Settings>,
        sink: Arc<dyn ActionSink>,
        cycle_limit: Option<u64>,
    ) -> Result<ScanWorker, WorkerError> {
        ScanWorker::spawn(self.pipeline(world, settings, sink), cycle_limit)
    }
}
