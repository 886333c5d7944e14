use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::catalog::{
    ActorState, Catalog, CellId, Definition, DefinitionKind, FormId, Instance, ItemStack, Owner,
    PluginOrigin, Position, RefId,
};
use crate::config::{keys, SettingDomain, Settings, SettingsError, SettingsTable, SharedSettings};
use crate::lootability::{LootabilityReason, ARROW_IN_FLIGHT_UNITS};
use crate::taxonomy::{resolve, ObjectType, RuleTables};
use crate::text::TranslationTable;
use crate::world::{ActionSink, ObserverContext, OutboundEvent, WorldError, WorldQuery};

use super::*;

const SWORD_KEYWORD: u32 = 0x17;
const SWORD: FormId = FormId(0x100);
const ARROW: FormId = FormId(0x200);
const BANDIT: FormId = FormId(0x300);
const CHEST: FormId = FormId(0x400);
const GOBLET: FormId = FormId(0x500);
const MOTH: FormId = FormId(0x600);
const MOTH_WING: FormId = FormId(0x700);

struct WorldState {
    observer: Result<ObserverContext, String>,
    instances: Vec<Instance>,
}

struct FakeWorld {
    state: Mutex<WorldState>,
}

impl FakeWorld {
    fn new() -> Self {
        Self {
            state: Mutex::new(WorldState {
                observer: Ok(ObserverContext {
                    alive: true,
                    controls_enabled: true,
                    cell: Some(CellId(1)),
                    position: Position { x: 1.0, y: 1.0, z: 1.0 },
                    ..ObserverContext::default()
                }),
                instances: Vec::new(),
            }),
        }
    }

    fn set_instances(&self, instances: Vec<Instance>) {
        self.state.lock().expect("world lock").instances = instances;
    }

    fn update_observer(&self, update: impl FnOnce(&mut ObserverContext)) {
        let mut state = self.state.lock().expect("world lock");
        if let Ok(observer) = state.observer.as_mut() {
            update(observer);
        }
    }

    fn fail_observer(&self) {
        self.state.lock().expect("world lock").observer = Err("loading screen".into());
    }
}

impl WorldQuery for FakeWorld {
    fn observer(&self) -> Result<ObserverContext, WorldError> {
        self.state
            .lock()
            .expect("world lock")
            .observer
            .clone()
            .map_err(WorldError::ObserverUnavailable)
    }

    fn enumerate_nearby(&self, _origin: Position, _radius: f32) -> Result<Vec<Instance>, WorldError> {
        Ok(self.state.lock().expect("world lock").instances.clone())
    }

    fn instance(&self, id: RefId) -> Option<Instance> {
        self.state
            .lock()
            .expect("world lock")
            .instances
            .iter()
            .find(|instance| instance.id == id)
            .cloned()
    }
}

#[derive(Default)]
struct RecordingSink {
    not_ready: AtomicBool,
    events: Mutex<Vec<OutboundEvent>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<OutboundEvent> {
        std::mem::take(&mut *self.events.lock().expect("sink lock"))
    }
}

impl ActionSink for RecordingSink {
    fn ready(&self) -> bool {
        !self.not_ready.load(Ordering::Relaxed)
    }

    fn emit(&self, event: OutboundEvent) {
        self.events.lock().expect("sink lock").push(event);
    }
}

/// Settings whose source can be taken away between cycles.
struct FlakySettings {
    table: SettingsTable,
    unavailable: AtomicBool,
}

impl Settings for FlakySettings {
    fn setting(&self, domain: SettingDomain, key: &str) -> Result<f64, SettingsError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(SettingsError::Unavailable("settings file locked".into()));
        }
        self.table.setting(domain, key)
    }
}

fn def(id: FormId, kind: DefinitionKind, value: i32, weight: f32) -> Definition {
    Definition {
        id,
        editor_id: format!("Def{:x}", id.0),
        name: format!("Item {:x}", id.0),
        kind,
        keywords: Vec::new(),
        value,
        weight,
        enchanted: false,
        playable: true,
        model_path: String::new(),
        origin: None,
    }
}

fn catalog() -> Catalog {
    let mut sword_keyword = def(FormId(SWORD_KEYWORD), DefinitionKind::Keyword, 0, 0.0);
    sword_keyword.editor_id = "WeapTypeSword".into();
    let mut sword = def(SWORD, DefinitionKind::Weapon, 50, 10.0);
    sword.keywords = vec![FormId(SWORD_KEYWORD)];
    Catalog::from_parts(
        vec![
            sword_keyword,
            sword,
            def(ARROW, DefinitionKind::Ammo, 1, 0.0),
            def(BANDIT, DefinitionKind::Actor, 0, 0.0),
            def(CHEST, DefinitionKind::Container { entries: Vec::new() }, 0, 0.0),
            def(GOBLET, DefinitionKind::Misc, 5, 1.0),
            def(
                MOTH,
                DefinitionKind::Activator {
                    activation_text: "Catch Moth".into(),
                },
                0,
                0.0,
            ),
            def(MOTH_WING, DefinitionKind::Ingredient, 2, 0.1),
        ],
        Vec::new(),
        Vec::new(),
    )
}

fn base_settings() -> SettingsTable {
    SettingsTable::default()
        .with(SettingDomain::Common, keys::ENABLE_AUTO_HARVEST, 1.0)
        .with(SettingDomain::Common, keys::ENABLE_LOOT_CONTAINER, 1.0)
        .with(SettingDomain::Common, keys::ENABLE_LOOT_DEADBODY, 2.0)
        .with(SettingDomain::Harvest, keys::RADIUS_FEET, 30.0)
        .with(SettingDomain::Harvest, keys::INTERVAL_SECONDS, 1.0)
        .with(SettingDomain::Harvest, keys::PLAYER_BELONGINGS_LOOT, 2.0)
        .with(SettingDomain::ItemObjects, "weapon", 2.0)
        .with(SettingDomain::ItemObjects, "ammo", 1.0)
        .with(SettingDomain::ItemObjects, "clutter", 1.0)
        .with(SettingDomain::ItemObjects, "critter", 1.0)
}

struct Harness {
    pipeline: ScanPipeline,
    world: Arc<FakeWorld>,
    sink: Arc<RecordingSink>,
    settings: SharedSettings,
    services: Arc<ScanServices>,
}

fn harness(settings: SettingsTable) -> Harness {
    harness_with(catalog(), settings)
}

fn harness_with(catalog: Catalog, settings: SettingsTable) -> Harness {
    let catalog = Arc::new(catalog);
    let translator = Arc::new(TranslationTable::from_pairs([(
        "$SHSE_ACTIVATE_VERBS_CRITTER",
        "Catch",
    )]));
    let taxonomy = Arc::new(resolve(&catalog, &RuleTables::default(), translator.as_ref()));
    let services = Arc::new(ScanServices::new(catalog, taxonomy, translator));
    services.gate.mark_synced();
    services.gate.set_search_allowed(true);
    let world = Arc::new(FakeWorld::new());
    let sink = Arc::new(RecordingSink::default());
    let settings = SharedSettings::new(settings);
    let pipeline = ScanPipeline::new(
        Arc::clone(&services),
        world.clone(),
        Arc::new(settings.clone()),
        sink.clone(),
    );
    Harness {
        pipeline,
        world,
        sink,
        settings,
        services,
    }
}

fn item(id: u32, base: FormId) -> Instance {
    let mut instance = Instance::new(RefId(id), base);
    instance.position = Position { x: 10.0, y: 10.0, z: 10.0 };
    instance
}

fn completed(report: &CycleReport) -> &CycleStats {
    match &report.outcome {
        CycleOutcome::Completed(stats) => stats,
        other => panic!("cycle did not complete: {other:?}"),
    }
}

fn harvested(events: &[OutboundEvent]) -> Vec<RefId> {
    events
        .iter()
        .filter_map(|event| match event {
            OutboundEvent::AutoHarvest { instance, .. } => Some(*instance),
            _ => None,
        })
        .collect()
}

#[test]
fn own_weapon_glows_as_player_property_without_harvest() {
    let mut h = harness(base_settings());
    let mut sword = item(0x1000, SWORD);
    sword.owner = Some(Owner::Player);
    h.world.set_instances(vec![sword]);

    h.pipeline.run_cycle(Instant::now()).expect("cycle");

    assert_eq!(
        h.sink.take(),
        vec![OutboundEvent::ObjectGlow {
            instance: RefId(0x1000),
            duration_secs: 10,
            reason: GlowReason::PlayerProperty,
        }]
    );
}

#[test]
fn unowned_weapon_is_harvested_with_notification() {
    let mut h = harness(base_settings());
    h.world.set_instances(vec![item(0x1000, SWORD)]);

    let report = h.pipeline.run_cycle(Instant::now()).expect("cycle");

    assert_eq!(completed(&report).harvested, 1);
    match h.sink.take().as_slice() {
        [OutboundEvent::AutoHarvest {
            instance,
            object_type,
            silent,
            ..
        }] => {
            assert_eq!(*instance, RefId(0x1000));
            assert_eq!(*object_type, ObjectType::Weapon);
            assert!(!silent);
        }
        other => panic!("unexpected events: {other:?}"),
    }
    assert!(h.services.store.is_pending(RefId(0x1000)));
}

#[test]
fn settled_arrow_is_harvested_on_second_sighting() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    let mut arrow = item(0x2000, ARROW);
    h.world.set_instances(vec![arrow.clone()]);
    h.pipeline.run_cycle(start).expect("first cycle");
    assert!(harvested(&h.sink.take()).is_empty());

    arrow.position.x += ARROW_IN_FLIGHT_UNITS / 2.0;
    h.world.set_instances(vec![arrow]);
    h.pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("second cycle");
    assert_eq!(harvested(&h.sink.take()), vec![RefId(0x2000)]);
}

#[test]
fn flying_arrow_is_skipped_and_rerecorded() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    let mut arrow = item(0x2001, ARROW);
    h.world.set_instances(vec![arrow.clone()]);
    h.pipeline.run_cycle(start).expect("first cycle");

    arrow.position.z += ARROW_IN_FLIGHT_UNITS + 10.0;
    h.world.set_instances(vec![arrow.clone()]);
    h.pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("second cycle");
    assert!(harvested(&h.sink.take()).is_empty());

    h.pipeline
        .run_cycle(start + Duration::from_secs(2))
        .expect("third cycle");
    assert_eq!(harvested(&h.sink.take()), vec![RefId(0x2001)]);
}

#[test]
fn arrow_at_origin_is_blocked() {
    let mut h = harness(base_settings());
    let mut arrow = item(0x2002, ARROW);
    arrow.position = Position::default();
    h.world.set_instances(vec![arrow]);
    h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(
        h.services.store.is_blocked(RefId(0x2002)),
        LootabilityReason::CorruptArrowPosition
    );
}

#[test]
fn dead_body_is_looted_once_after_cooldown() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    let mut bandit = item(0x3000, BANDIT);
    bandit.actor = Some(ActorState {
        dead: true,
        ..ActorState::default()
    });
    bandit.contents = vec![ItemStack {
        form: GOBLET,
        count: 2,
        quest_item: false,
    }];
    h.world.set_instances(vec![bandit]);

    let report = h.pipeline.run_cycle(start).expect("death cycle");
    assert_eq!(completed(&report).deferred, 1);
    h.pipeline
        .run_cycle(start + Duration::from_millis(2900))
        .expect("cooldown cycle");
    assert!(h.sink.take().is_empty());

    h.pipeline
        .run_cycle(start + DEAD_BODY_COOLDOWN)
        .expect("release cycle");
    let events = h.sink.take();
    assert_eq!(events.len(), 1);
    match &events[0] {
        OutboundEvent::LootContainer {
            container, items, ..
        } => {
            assert_eq!(*container, RefId(0x3000));
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].count, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    h.pipeline
        .run_cycle(start + Duration::from_secs(5))
        .expect("later cycle");
    assert!(h.sink.take().is_empty());
}

#[test]
fn essential_corpse_is_never_deferred() {
    let mut h = harness(base_settings());
    let mut bandit = item(0x3001, BANDIT);
    bandit.actor = Some(ActorState {
        dead: true,
        essential: true,
        ..ActorState::default()
    });
    h.world.set_instances(vec![bandit]);
    let report = h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(completed(&report).deferred, 0);
    assert_eq!(
        h.services.store.is_blocked(RefId(0x3001)),
        LootabilityReason::DeadBodyIneligible
    );
}

#[test]
fn locked_chest_glows_and_is_left_alone() {
    let settings = base_settings().with(SettingDomain::Harvest, keys::LOCKED_CHEST_LOOT, 2.0);
    let mut h = harness(settings);
    let mut chest = item(0x4000, CHEST);
    chest.locked = true;
    chest.contents = vec![ItemStack {
        form: GOBLET,
        count: 1,
        quest_item: false,
    }];
    h.world.set_instances(vec![chest]);
    h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(
        h.sink.take(),
        vec![OutboundEvent::ObjectGlow {
            instance: RefId(0x4000),
            duration_secs: 10,
            reason: GlowReason::LockedContainer,
        }]
    );
}

fn goblets(count: u32) -> Vec<ItemStack> {
    vec![ItemStack {
        form: GOBLET,
        count,
        quest_item: false,
    }]
}

fn looted_containers(events: &[OutboundEvent]) -> Vec<RefId> {
    events
        .iter()
        .filter_map(|event| match event {
            OutboundEvent::LootContainer { container, .. } => Some(*container),
            _ => None,
        })
        .collect()
}

#[test]
fn empty_chest_is_blocked_for_the_visit() {
    let mut h = harness(base_settings());
    h.world.set_instances(vec![item(0x4001, CHEST)]);
    h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert!(h.sink.take().is_empty());
    assert_eq!(
        h.services.store.is_blocked(RefId(0x4001)),
        LootabilityReason::ContainerLooted
    );
    assert!(!h.services.deferred.is_looted(RefId(0x4001)));
}

#[test]
fn chest_is_relooted_after_leaving_and_returning() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    let mut chest = item(0x4100, CHEST);
    chest.contents = goblets(1);
    h.world.set_instances(vec![chest.clone()]);

    h.pipeline.run_cycle(start).expect("first visit");
    assert_eq!(looted_containers(&h.sink.take()), vec![RefId(0x4100)]);
    h.pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("same visit");
    assert!(h.sink.take().is_empty());

    h.world.set_instances(Vec::new());
    h.world.update_observer(|observer| observer.cell = Some(CellId(2)));
    let report = h
        .pipeline
        .run_cycle(start + Duration::from_secs(2))
        .expect("elsewhere");
    assert!(report.session_reset);

    chest.contents = goblets(3);
    h.world.set_instances(vec![chest]);
    h.world.update_observer(|observer| observer.cell = Some(CellId(1)));
    let report = h
        .pipeline
        .run_cycle(start + Duration::from_secs(3))
        .expect("second visit");
    assert!(report.session_reset);
    match h.sink.take().as_slice() {
        [OutboundEvent::LootContainer {
            container, items, ..
        }] => {
            assert_eq!(*container, RefId(0x4100));
            assert_eq!(items[0].count, 3);
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn chest_seen_empty_is_looted_once_filled_in_a_new_context() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    let mut chest = item(0x4101, CHEST);
    h.world.set_instances(vec![chest.clone()]);
    h.pipeline.run_cycle(start).expect("empty");

    chest.contents = goblets(1);
    h.world.set_instances(vec![chest]);
    h.pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("filled, same visit");
    assert!(h.sink.take().is_empty());

    h.world.update_observer(|observer| observer.sneaking = true);
    let report = h
        .pipeline
        .run_cycle(start + Duration::from_secs(2))
        .expect("new context");
    assert!(report.session_reset);
    assert_eq!(looted_containers(&h.sink.take()), vec![RefId(0x4101)]);
}

#[test]
fn dynamic_chest_is_looted_once_per_context() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    let mut chest = item(0xFF00_4102, CHEST);
    chest.contents = goblets(1);
    h.world.set_instances(vec![chest]);

    h.pipeline.run_cycle(start).expect("first cycle");
    assert_eq!(looted_containers(&h.sink.take()), vec![RefId(0xFF00_4102)]);
    h.pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("second cycle");
    assert!(h.sink.take().is_empty());

    h.world.update_observer(|observer| observer.cell = Some(CellId(2)));
    h.pipeline
        .run_cycle(start + Duration::from_secs(2))
        .expect("new cell");
    assert_eq!(looted_containers(&h.sink.take()), vec![RefId(0xFF00_4102)]);
}

#[test]
fn looted_corpse_is_rescanned_after_context_change() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    let mut bandit = item(0x3002, BANDIT);
    bandit.actor = Some(ActorState {
        dead: true,
        ..ActorState::default()
    });
    bandit.contents = goblets(1);
    h.world.set_instances(vec![bandit.clone()]);

    h.pipeline.run_cycle(start).expect("death");
    h.pipeline
        .run_cycle(start + DEAD_BODY_COOLDOWN)
        .expect("release");
    assert_eq!(looted_containers(&h.sink.take()), vec![RefId(0x3002)]);

    bandit.contents = goblets(2);
    h.world.set_instances(vec![bandit]);
    h.world.update_observer(|observer| observer.cell = Some(CellId(2)));
    let report = h
        .pipeline
        .run_cycle(start + Duration::from_secs(4))
        .expect("new cell");
    assert_eq!(completed(&report).deferred, 0);
    assert_eq!(looted_containers(&h.sink.take()), vec![RefId(0x3002)]);
}

#[test]
fn critter_requests_its_ingredient_once() {
    let mut h = harness(base_settings());
    h.world.set_instances(vec![item(0x6000, MOTH)]);
    let start = Instant::now();

    h.pipeline.run_cycle(start).expect("first cycle");
    assert_eq!(
        h.sink.take(),
        vec![OutboundEvent::GetCritterIngredient {
            instance: RefId(0x6000),
            producer: MOTH,
        }]
    );
    h.pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("second cycle");
    assert!(h.sink.take().is_empty());

    h.services
        .producers
        .set_lootable_for_producer(MOTH, Some(MOTH_WING));
    h.pipeline
        .run_cycle(start + Duration::from_secs(2))
        .expect("third cycle");
    assert_eq!(harvested(&h.sink.take()), vec![RefId(0x6000)]);
}

#[test]
fn cell_change_resets_session_blocks() {
    let mut h = harness(base_settings());
    let start = Instant::now();
    h.world.set_instances(vec![item(0x5000, GOBLET)]);

    h.pipeline.run_cycle(start).expect("first cycle");
    assert_eq!(harvested(&h.sink.take()), vec![RefId(0x5000)]);
    h.services.store.complete(RefId(0x5000));

    h.pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("second cycle");
    assert!(h.sink.take().is_empty());

    h.world.update_observer(|observer| observer.cell = Some(CellId(2)));
    let report = h
        .pipeline
        .run_cycle(start + Duration::from_secs(2))
        .expect("third cycle");
    assert!(report.session_reset);
    assert_eq!(harvested(&h.sink.take()), vec![RefId(0x5000)]);
}

#[test]
fn backlog_forces_silent_harvest() {
    let settings = base_settings().with(SettingDomain::ItemObjects, "clutter", 2.0);
    let mut h = harness(settings);
    h.world
        .set_instances((0..12).map(|idx| item(0x5100 + idx, GOBLET)).collect());
    h.pipeline.run_cycle(Instant::now()).expect("cycle");

    let silences: Vec<bool> = h
        .sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            OutboundEvent::AutoHarvest { silent, .. } => Some(silent),
            _ => None,
        })
        .collect();
    assert_eq!(silences.len(), 12);
    assert!(!silences[0]);
    assert!(silences[11]);
}

#[test]
fn leave_behind_blocks_the_definition() {
    let settings = base_settings().with(SettingDomain::ItemObjects, "clutter", 0.0);
    let mut h = harness(settings);
    h.world.set_instances(vec![item(0x5200, GOBLET), item(0x5201, GOBLET)]);
    h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert!(h.sink.take().is_empty());
    assert_eq!(h.services.store.is_blocked(GOBLET), LootabilityReason::LeaveBehind);
    assert_eq!(h.services.store.is_blocked(RefId(0x5201)), LootabilityReason::Lootable);
}

#[test]
fn law_abiding_observer_leaves_stolen_goods() {
    let settings = base_settings().with(SettingDomain::Harvest, keys::CRIME_CHECK_NOT_SNEAKING, 1.0);
    let mut h = harness(settings);
    let mut goblet = item(0x5300, GOBLET);
    goblet.off_limits = true;
    goblet.owner = Some(Owner::Other);
    h.world.set_instances(vec![goblet]);
    h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert!(h.sink.take().is_empty());
}

#[test]
fn malformed_instance_is_blacklisted() {
    let mut h = harness(base_settings());
    let mut broken = item(0x5400, GOBLET);
    broken.base = None;
    h.world.set_instances(vec![broken]);
    h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert!(h.services.store.is_blacklisted(RefId(0x5400)));
}

#[test]
fn gates_skip_the_cycle() {
    let mut h = harness(base_settings());
    h.world.set_instances(vec![item(0x5500, GOBLET)]);

    h.sink.not_ready.store(true, Ordering::Relaxed);
    let report = h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::ActionsNotReady));
    h.sink.not_ready.store(false, Ordering::Relaxed);

    h.settings.update(SettingDomain::Harvest, keys::DISABLE_DURING_COMBAT, 1.0);
    h.world.update_observer(|observer| observer.in_combat = true);
    let report = h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::InCombat));

    h.services.gate.unsync();
    let report = h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::NotSynced));
    assert!(h.sink.take().is_empty());
}

/// The base catalog plus definitions declared by `plugin`.
fn catalog_with_plugin(plugin: &str, extra: Vec<Definition>) -> Catalog {
    let mut definitions = catalog().definitions().to_vec();
    definitions.extend(extra.into_iter().map(|mut def| {
        def.origin = Some(PluginOrigin {
            plugin: plugin.to_string(),
            local_id: def.id.0 & 0x00FF_FFFF,
        });
        def
    }));
    Catalog::from_parts(definitions, Vec::new(), Vec::new())
}

#[test]
fn mounted_observer_is_skipped_only_when_forbidden() {
    let mut h = harness(base_settings());
    h.world.set_instances(vec![item(0x5800, GOBLET)]);
    h.world.update_observer(|observer| observer.mounted = true);
    let report = h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(completed(&report).harvested, 1);

    let settings = base_settings().with(SettingDomain::Harvest, keys::DISABLE_WHILE_MOUNTED, 1.0);
    let mut h = harness(settings);
    h.world.set_instances(vec![item(0x5800, GOBLET)]);
    h.world.update_observer(|observer| observer.mounted = true);
    let report = h.pipeline.run_cycle(Instant::now()).expect("cycle");
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::Mounted));
    assert!(h.sink.take().is_empty());
}

#[test]
fn horse_plugin_forbids_looting_while_mounted() {
    let saddle = def(FormId(0x0E00_0800), DefinitionKind::Misc, 10, 1.0);
    let catalog = catalog_with_plugin("Convenient Horses.esp", vec![saddle]);
    let mut h = harness_with(catalog, base_settings());
    h.world.set_instances(vec![item(0x5801, GOBLET)]);

    h.world.update_observer(|observer| observer.mounted = true);
    let report = h.pipeline.run_cycle(Instant::now()).expect("mounted");
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::Mounted));

    h.world.update_observer(|observer| observer.mounted = false);
    h.pipeline.run_cycle(Instant::now()).expect("dismounted");
    assert_eq!(harvested(&h.sink.take()), vec![RefId(0x5801)]);
}

#[test]
fn plugin_storage_chest_stays_off_limits_across_resets() {
    let mut storage = def(
        FormId(0x0A04_b352),
        DefinitionKind::Container { entries: Vec::new() },
        0,
        0.0,
    );
    storage.name = "Auxiliary Armor Storage".into();
    let catalog = catalog_with_plugin("Hothtrooper44_ArmorCompilation.esp", vec![storage]);
    let mut h = harness_with(catalog, base_settings());
    let start = Instant::now();
    let mut chest = Instance::new(RefId(0x4200), FormId(0x0A04_b352));
    chest.position = Position { x: 10.0, y: 10.0, z: 10.0 };
    chest.contents = goblets(5);
    h.world.set_instances(vec![chest]);

    h.pipeline.run_cycle(start).expect("first cycle");
    h.world.update_observer(|observer| observer.cell = Some(CellId(2)));
    let report = h
        .pipeline
        .run_cycle(start + Duration::from_secs(1))
        .expect("new cell");
    assert!(report.session_reset);
    assert!(h.sink.take().is_empty());
    assert_eq!(
        h.services.store.is_blocked(FormId(0x0A04_b352)),
        LootabilityReason::ContainerPermanentlyOffLimits
    );
}

#[test]
fn unavailable_settings_abort_without_side_effects() {
    let h = harness(base_settings());
    let settings = Arc::new(FlakySettings {
        table: base_settings(),
        unavailable: AtomicBool::new(false),
    });
    let mut pipeline = ScanPipeline::new(
        Arc::clone(&h.services),
        h.world.clone(),
        settings.clone(),
        h.sink.clone(),
    );
    let start = Instant::now();
    let mut bandit = item(0x3003, BANDIT);
    bandit.actor = Some(ActorState {
        dead: true,
        ..ActorState::default()
    });
    h.world.set_instances(vec![item(0x5600, GOBLET), bandit]);
    pipeline.run_cycle(start).expect("healthy cycle");
    assert_eq!(harvested(&h.sink.take()), vec![RefId(0x5600)]);
    h.services
        .store
        .block(RefId(0x5601), LootabilityReason::AlreadyProcessedThisVisit);

    settings.unavailable.store(true, Ordering::Relaxed);
    h.world.update_observer(|observer| observer.cell = Some(CellId(2)));
    assert!(matches!(
        pipeline.run_cycle(start + Duration::from_secs(1)),
        Err(ScanError::ConfigurationUnavailable(_))
    ));
    assert!(h.sink.take().is_empty());
    assert_eq!(
        h.services.store.is_blocked(RefId(0x5601)),
        LootabilityReason::AlreadyProcessedThisVisit
    );
    assert!(h.services.store.is_pending(RefId(0x5600)));
    assert_eq!(h.services.deferred.queued_len(), 1);

    // the cell change was never observed by the aborted cycle
    settings.unavailable.store(false, Ordering::Relaxed);
    let report = pipeline
        .run_cycle(start + Duration::from_secs(2))
        .expect("recovered cycle");
    assert!(report.session_reset);
}

#[test]
fn unavailable_observer_aborts_the_cycle() {
    let mut h = harness(base_settings());
    h.world.set_instances(vec![item(0x5700, GOBLET)]);
    h.world.fail_observer();
    assert!(matches!(
        h.pipeline.run_cycle(Instant::now()),
        Err(ScanError::TransientWorldState(_))
    ));
    assert!(h.sink.take().is_empty());
    assert!(!h.services.store.is_pending(RefId(0x5700)));
}

#[test]
fn worker_stops_after_cycle_limit() {
    let settings = base_settings().with(SettingDomain::Harvest, keys::INTERVAL_SECONDS, 0.0);
    let h = harness(settings);
    let worker = ScanWorker::spawn(h.pipeline, Some(3)).expect("spawn");
    let summary = worker.join().expect("join");
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.completed, 3);
}
