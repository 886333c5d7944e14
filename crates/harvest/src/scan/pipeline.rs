use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Definition, DefinitionKind, FormId, Instance, PopulationCenterSize, RefId};
use crate::config::{Settings, SettingsError};
use crate::lootability::{ArrowCheck, LootabilityReason, DISTANCE_UNIT_IN_FEET};
use crate::taxonomy::{ObjectType, ProducerLootable, ResourceType};
use crate::world::{ActionSink, LootItem, ObserverContext, OutboundEvent, WorldError, WorldQuery};

use super::policy::{
    ContainerAnimation, CrimeCheck, CycleSettings, DeadBodyLooting, GlowReason, LootingType,
    AUTO_HARVEST_SPAM_LIMIT, PENDING_ACTION_TIMEOUT, SPECIAL_GLOW_DURATION,
};
use super::services::ScanServices;
use super::session::ObserverTracker;

pub const MANUAL_LOOT_MESSAGE_KEY: &str = "$AHSE_MANUAL_LOOT_MSG";
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("settings unavailable: {0}")]
    ConfigurationUnavailable(#[from] SettingsError),
    #[error("world state unavailable: {0}")]
    TransientWorldState(#[from] WorldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotSynced,
    SearchDisallowed,
    ObserverInactive,
    MenuOpen,
    ActionsNotReady,
    PlayerHouse,
    InCombat,
    WeaponDrawn,
    Concealed,
    Mounted,
    NoCell,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub candidates: usize,
    pub harvested: usize,
    pub containers_looted: usize,
    pub glowed: usize,
    pub deferred: usize,
    pub resolution_requests: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Completed(CycleStats),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub session_reset: bool,
    pub next_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerTarget {
    Container,
    DeadBody,
}

/// Inputs fixed for the duration of one cycle.
struct Cycle {
    settings: CycleSettings,
    observer: ObserverContext,
    now: Instant,
    visited: HashSet<RefId>,
    stats: CycleStats,
}

struct ContainerListing {
    items: Vec<(FormId, u32)>,
    has_quest_item: bool,
    has_enchanted_item: bool,
    has_valuable_item: bool,
}

/// One recurring scan: gate, enumerate, classify and filter, emit.
pub struct ScanPipeline {
    services: Arc<ScanServices>,
    world: Arc<dyn WorldQuery>,
    settings: Arc<dyn Settings>,
    sink: Arc<dyn ActionSink>,
    tracker: ObserverTracker,
    indoors: bool,
}

impl ScanPipeline {
    pub fn new(
        services: Arc<ScanServices>,
        world: Arc<dyn WorldQuery>,
        settings: Arc<dyn Settings>,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        Self {
            services,
            world,
            settings,
            sink,
            tracker: ObserverTracker::default(),
            indoors: false,
        }
    }

    pub fn services(&self) -> &Arc<ScanServices> {
        &self.services
    }

    /// Runs one cycle at `now`. Errors abort the cycle before any candidate is touched.
    pub fn run_cycle(&mut self, now: Instant) -> Result<CycleReport, ScanError> {
        let gate = &self.services.gate;
        if !gate.is_synced() {
            return Ok(self.skipped(SkipReason::NotSynced, DEFAULT_INTERVAL, false));
        }
        if !gate.is_search_allowed() {
            return Ok(self.skipped(SkipReason::SearchDisallowed, DEFAULT_INTERVAL, false));
        }

        let settings = CycleSettings::read(self.settings.as_ref())?;
        let observer = self.world.observer()?;
        self.indoors = observer.indoors;
        let delay = settings.scan_interval(observer.indoors);

        if let Some(reason) = self.gate_observer(&settings, &observer) {
            return Ok(self.skipped(reason, delay, false));
        }

        if self.services.gate.take_observer_stale() {
            self.tracker.forget();
        }
        let session_reset = self.tracker.observe(&observer);
        if session_reset {
            info!(
                sneaking = observer.sneaking,
                cell = ?observer.cell,
                "observer_context_changed"
            );
            self.services.reset(true);
        }
        if observer.cell.is_none() {
            return Ok(self.skipped(SkipReason::NoCell, delay, session_reset));
        }

        let radius = (settings.radius_feet / f64::from(DISTANCE_UNIT_IN_FEET)) as f32;
        let candidates = self.world.enumerate_nearby(observer.position, radius)?;

        self.services.store.expire_pending(now, PENDING_ACTION_TIMEOUT);
        let mut cycle = Cycle {
            settings,
            observer,
            now,
            visited: HashSet::with_capacity(candidates.len()),
            stats: CycleStats {
                candidates: candidates.len(),
                ..CycleStats::default()
            },
        };

        for actor in self.services.deferred.drain_ready(now) {
            match self.world.instance(actor) {
                Some(instance) => self.process_candidate(&mut cycle, &instance),
                None => debug!(actor = %actor, "deferred_dead_body_gone"),
            }
        }
        for instance in &candidates {
            self.process_candidate(&mut cycle, instance);
        }

        debug!(
            candidates = cycle.stats.candidates,
            harvested = cycle.stats.harvested,
            containers = cycle.stats.containers_looted,
            glowed = cycle.stats.glowed,
            deferred = cycle.stats.deferred,
            "scan_cycle_complete"
        );
        Ok(CycleReport {
            outcome: CycleOutcome::Completed(cycle.stats),
            session_reset,
            next_delay: delay,
        })
    }

    /// Delay to use when a cycle failed before reading its settings.
    pub fn fallback_delay(&self) -> Duration {
        CycleSettings::read(self.settings.as_ref())
            .map(|settings| settings.scan_interval(self.indoors))
            .unwrap_or(DEFAULT_INTERVAL)
    }

    fn skipped(&self, reason: SkipReason, next_delay: Duration, session_reset: bool) -> CycleReport {
        debug!(reason = ?reason, "scan_cycle_skipped");
        CycleReport {
            outcome: CycleOutcome::Skipped(reason),
            session_reset,
            next_delay,
        }
    }

    fn gate_observer(&self, settings: &CycleSettings, observer: &ObserverContext) -> Option<SkipReason> {
        if !observer.alive || !observer.controls_enabled {
            return Some(SkipReason::ObserverInactive);
        }
        if observer.menu_open {
            return Some(SkipReason::MenuOpen);
        }
        if !self.sink.ready() {
            return Some(SkipReason::ActionsNotReady);
        }
        let in_player_house = observer
            .location
            .and_then(|id| self.services.catalog.location(id))
            .is_some_and(|location| location.player_house);
        if in_player_house {
            return Some(SkipReason::PlayerHouse);
        }
        if settings.disable_during_combat && observer.in_combat {
            return Some(SkipReason::InCombat);
        }
        if settings.disable_while_weapon_drawn && observer.weapon_drawn {
            return Some(SkipReason::WeaponDrawn);
        }
        if settings.disable_while_concealed && observer.concealed {
            return Some(SkipReason::Concealed);
        }
        let mount_forbidden =
            settings.disable_while_mounted || self.services.taxonomy.forbids_mounted_looting();
        if mount_forbidden && observer.mounted {
            return Some(SkipReason::Mounted);
        }
        None
    }

    fn process_candidate(&self, cycle: &mut Cycle, instance: &Instance) {
        if !cycle.visited.insert(instance.id) {
            return;
        }
        let store = &self.services.store;
        let Some(def) = instance
            .base
            .and_then(|base| self.services.catalog.definition(base))
        else {
            store.blacklist(instance.id);
            debug!(instance = %instance.id, "malformed_instance_blacklisted");
            return;
        };
        if store.is_blacklisted(instance.id)
            || !store.is_blocked(instance.id).is_lootable()
            || !store.is_blocked(def.id).is_lootable()
            || store.is_pending(instance.id)
        {
            return;
        }

        match &def.kind {
            DefinitionKind::Actor => {
                if cycle.settings.dead_bodies == DeadBodyLooting::DoNotLoot {
                    return;
                }
                let Some(actor) = instance.actor.filter(|actor| actor.dead) else {
                    return;
                };
                if actor.ally || actor.essential || actor.summoned {
                    store.block(instance.id, LootabilityReason::DeadBodyIneligible);
                    return;
                }
                if !self.services.deferred.is_released(instance.id) {
                    if self.services.deferred.register(instance.id, cycle.now) {
                        cycle.stats.deferred += 1;
                    }
                    return;
                }
                self.process_container(cycle, instance, ContainerTarget::DeadBody);
            }
            DefinitionKind::Container { .. } => {
                if !cycle.settings.loot_containers {
                    return;
                }
                self.process_container(cycle, instance, ContainerTarget::Container);
            }
            _ => {
                if cycle.settings.auto_harvest {
                    self.process_item(cycle, instance, def);
                }
            }
        }
    }

    fn process_item(&self, cycle: &mut Cycle, instance: &Instance, def: &Definition) {
        let services = &self.services;
        let store = &services.store;
        let object_type = services.taxonomy.object_type(def.id);

        // value and weight come from what the producer actually yields
        let mut lootable = def;
        match services.producers.lootable_for(def.id) {
            ProducerLootable::Resolved(form) => {
                if let Some(resolved) = services.catalog.definition(form) {
                    lootable = resolved;
                }
            }
            _ if object_type == ObjectType::Critter => {
                if services.producers.set_lootable_for_producer(def.id, None) {
                    cycle.stats.resolution_requests += 1;
                    self.emit(OutboundEvent::GetCritterIngredient {
                        instance: instance.id,
                        producer: def.id,
                    });
                }
                return;
            }
            _ => {}
        }

        if !object_type.is_known() {
            store.blacklist(instance.id);
            return;
        }

        let settings = &cycle.settings;
        if object_type == ObjectType::ManualLoot && settings.manual_loot_notify {
            self.notify_manual_loot(def);
            store.block(instance.id, LootabilityReason::ManualLootTarget);
            return;
        }
        if services.exclusions.is_form_excluded(def.id) {
            store.block(def.id, LootabilityReason::ExcludedByUser);
            return;
        }

        let mut glow = GlowReason::None;
        let mut skip = false;
        if self.is_quest_item(settings, instance.quest_item, def) {
            if settings.quest_objects.glows() {
                glow.raise(GlowReason::QuestObject);
            }
            skip = !settings.quest_objects.is_lootable();
        } else if settings.quest_objects.glows()
            && object_type == ObjectType::Book
            && services.taxonomy.is_glowable_book(def)
        {
            glow.raise(GlowReason::SimpleTarget);
        }
        if settings.valuable_items.glows() && settings.is_valuable(lootable.value) {
            glow.raise(GlowReason::Valuable);
        }
        if settings.enchant_item_glow && def.enchanted {
            glow.raise(GlowReason::EnchantedItem);
        }

        if object_type == ObjectType::Ammo {
            match store.check_arrow(instance.id, instance.position) {
                ArrowCheck::Settled => {}
                check => {
                    debug!(instance = %instance.id, check = ?check, "ammo_not_settled");
                    skip = true;
                }
            }
        }

        // ownership runs after the quest checks so owned quest items still glow
        skip = self.is_looting_forbidden(cycle, instance, false, &mut glow) || skip;
        if !glow.is_none() {
            self.glow(cycle, instance.id, glow);
        }
        if self.is_location_excluded(cycle) {
            skip = true;
        }

        let settings = &cycle.settings;
        let looting = settings.looting_type(object_type);
        if !skip {
            // blocks every instance of the definition
            if looting == LootingType::LeaveBehind {
                store.block(def.id, LootabilityReason::LeaveBehind);
                skip = true;
            } else if looting.depends_on_value_weight(object_type)
                && settings.value_weight_too_low(object_type, lootable.value, lootable.weight)
            {
                store.block(def.id, LootabilityReason::ValueWeightTooLow);
                skip = true;
            }
        }
        if skip {
            return;
        }

        if object_type == ObjectType::OreVein {
            if services.taxonomy.resource_type(def.id) == Some(ResourceType::VolcanicDigSite) {
                store.block_firehose_source(instance.id);
            } else {
                store.block(instance.id, LootabilityReason::OreVeinVisited);
            }
        }

        let backlog = store.pending_count();
        if !store.claim_for_action(instance.id, cycle.now) {
            return;
        }
        let silent = !looting.requires_notification() || backlog > AUTO_HARVEST_SPAM_LIMIT;
        cycle.stats.harvested += 1;
        info!(
            instance = %instance.id,
            object_type = %object_type,
            count = instance.count,
            silent,
            "auto_harvest_emitted"
        );
        self.emit(OutboundEvent::AutoHarvest {
            instance: instance.id,
            object_type,
            count: instance.count,
            silent,
            ignore_blocking: settings.loot_blocked_activators,
            manual_loot_notify: settings.manual_loot_notify,
        });
    }

    fn process_container(&self, cycle: &mut Cycle, instance: &Instance, target: ContainerTarget) {
        let services = &self.services;
        let store = &services.store;
        let dead_body = target == ContainerTarget::DeadBody;
        // dynamic ids cannot be session-blocked
        if services.deferred.is_looted(instance.id) {
            return;
        }
        let listing = self.list_contents(&cycle.settings, instance, dead_body);
        if listing.items.is_empty() {
            services.deferred.mark_looted(instance.id);
            store.block(instance.id, LootabilityReason::ContainerLooted);
            debug!(container = %instance.id, "container_empty");
            return;
        }

        let settings = &cycle.settings;
        let mut glow = GlowReason::None;
        let mut skip = false;
        if !dead_body {
            if instance.locked {
                if settings.locked_chests.glows() {
                    glow.raise(GlowReason::LockedContainer);
                }
                skip = skip || !settings.locked_chests.is_lootable();
            }
            if instance.boss_container {
                if settings.boss_chests.glows() {
                    glow.raise(GlowReason::BossContainer);
                }
                skip = skip || !settings.boss_chests.is_lootable();
            }
        }
        if listing.has_quest_item {
            if settings.quest_objects.glows() {
                glow.raise(GlowReason::QuestObject);
            }
            skip = skip || !settings.quest_objects.is_lootable();
        }
        if listing.has_enchanted_item && settings.enchant_item_glow {
            glow.raise(GlowReason::EnchantedItem);
        }
        if listing.has_valuable_item && settings.valuable_items.glows() {
            glow.raise(GlowReason::Valuable);
        }

        skip = self.is_looting_forbidden(cycle, instance, dead_body, &mut glow) || skip;
        if self.is_location_excluded(cycle) {
            skip = true;
        }
        if !glow.is_none() {
            self.glow(cycle, instance.id, glow);
        }
        if skip {
            return;
        }

        store.block(instance.id, LootabilityReason::AlreadyProcessedThisVisit);
        let settings = &cycle.settings;
        let mut items = Vec::with_capacity(listing.items.len());
        for (form, count) in listing.items {
            if services.exclusions.is_form_excluded(form) {
                store.block(form, LootabilityReason::ExcludedByUser);
                continue;
            }
            let Some(def) = services.catalog.definition(form) else {
                continue;
            };
            let object_type = services.taxonomy.object_type(form);
            let looting = settings.looting_type(object_type);
            if looting == LootingType::LeaveBehind {
                store.block(form, LootabilityReason::LeaveBehind);
                continue;
            }
            if looting.depends_on_value_weight(object_type)
                && settings.value_weight_too_low(object_type, def.value, def.weight)
            {
                store.block(form, LootabilityReason::ValueWeightTooLow);
                continue;
            }
            items.push(LootItem {
                form,
                count,
                notify: looting.requires_notification(),
            });
        }
        if items.is_empty() {
            return;
        }

        services.deferred.mark_looted(instance.id);
        cycle.stats.containers_looted += 1;
        let animation = ContainerAnimation::from_setting(settings.container_animation, dead_body);
        info!(
            container = %instance.id,
            items = items.len(),
            dead_body,
            "loot_container_emitted"
        );
        self.emit(OutboundEvent::LootContainer {
            container: instance.id,
            items,
            animation,
        });
    }

    fn list_contents(&self, settings: &CycleSettings, instance: &Instance, dead_body: bool) -> ContainerListing {
        let services = &self.services;
        let armor_allowed = !dead_body || settings.dead_bodies != DeadBodyLooting::LootExcludingArmor;
        let mut listing = ContainerListing {
            items: Vec::new(),
            has_quest_item: false,
            has_enchanted_item: false,
            has_valuable_item: false,
        };
        for stack in &instance.contents {
            if stack.count == 0 || !services.store.is_blocked(stack.form).is_lootable() {
                continue;
            }
            let Some(def) = services.catalog.definition(stack.form) else {
                continue;
            };
            let object_type = services.taxonomy.object_type(stack.form);
            if !def.playable || !object_type.is_known() {
                continue;
            }
            if !armor_allowed && object_type.is_armor_family() {
                continue;
            }
            listing.has_quest_item |= self.is_quest_item(settings, stack.quest_item, def);
            listing.has_enchanted_item |= def.enchanted;
            listing.has_valuable_item |= settings.is_valuable(def.value);
            listing.items.push((stack.form, stack.count));
        }
        listing
    }

    /// Strict scope only trusts the instance's own quest flag; otherwise any definition a
    /// quest alias points at counts too.
    fn is_quest_item(&self, settings: &CycleSettings, flagged: bool, def: &Definition) -> bool {
        flagged
            || (!settings.quest_object_scope_strict
                && self.services.store.quest_target_lootability(Some(def.id))
                    == LootabilityReason::CannotLootQuestTarget)
    }

    fn is_looting_forbidden(
        &self,
        cycle: &Cycle,
        instance: &Instance,
        dead_body: bool,
        glow: &mut GlowReason,
    ) -> bool {
        // a dead owner no longer owns anything
        if dead_body {
            return false;
        }
        let settings = &cycle.settings;
        let forbidden = if cycle.observer.cell_player_owned || instance.is_player_owned() {
            let belongings = settings.player_belongings;
            if !belongings.is_lootable() && belongings.glows() {
                glow.raise(GlowReason::PlayerProperty);
            }
            !belongings.is_lootable()
        } else {
            match settings.crime_check(cycle.observer.sneaking) {
                CrimeCheck::IgnoreLaw => false,
                CrimeCheck::NeverSteal => instance.off_limits,
                CrimeCheck::NeverTakeOwned => instance.off_limits || instance.owner.is_some(),
            }
        };
        if forbidden {
            debug!(instance = %instance.id, "looting_forbidden");
        }
        forbidden
    }

    fn is_location_excluded(&self, cycle: &Cycle) -> bool {
        let Some(location_id) = cycle.observer.location else {
            return false;
        };
        if self.services.exclusions.is_location_excluded(location_id) {
            return true;
        }
        let limit = cycle.settings.population_center_limit;
        limit != PopulationCenterSize::None
            && self
                .services
                .catalog
                .location(location_id)
                .is_some_and(|location| location.population_center >= limit)
    }

    fn glow(&self, cycle: &mut Cycle, instance: RefId, reason: GlowReason) {
        if !self
            .services
            .store
            .try_glow(instance, cycle.now, SPECIAL_GLOW_DURATION)
        {
            return;
        }
        cycle.stats.glowed += 1;
        self.emit(OutboundEvent::ObjectGlow {
            instance,
            duration_secs: SPECIAL_GLOW_DURATION.as_secs(),
            reason,
        });
    }

    fn notify_manual_loot(&self, def: &Definition) {
        let Some(template) = self.services.translator.translate(MANUAL_LOOT_MESSAGE_KEY) else {
            warn!(key = MANUAL_LOOT_MESSAGE_KEY, "translation_missing");
            return;
        };
        let text = template.replace("{ITEMNAME}", &def.name);
        if !text.is_empty() {
            self.emit(OutboundEvent::Notification { text });
        }
    }

    fn emit(&self, event: OutboundEvent) {
        debug!(event = event.label(), "action_emitted");
        self.sink.emit(event);
    }
}
