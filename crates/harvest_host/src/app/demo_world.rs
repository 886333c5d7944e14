use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use harvest::{
    ActionSink, FormId, Harvester, Instance, ObserverContext, OutboundEvent, Position, RefId,
    WorldError, WorldQuery,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read demo scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid demo scenario {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("demo scenario {path} has no frames")]
    Empty { path: PathBuf },
}

/// Pre-recorded world snapshots, one per scan cycle. The last frame repeats once the
/// scenario runs out.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub(crate) struct DemoScenario {
    frames: Vec<DemoFrame>,
    #[serde(default)]
    producer_yields: Vec<ProducerYield>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
struct DemoFrame {
    /// Absent fields carry over from the previous frame.
    observer: Option<ObserverContext>,
    instances: Option<Vec<Instance>>,
}

/// What the game answers to a `GetCritterIngredient` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct ProducerYield {
    producer: FormId,
    lootable: Option<FormId>,
}

impl DemoScenario {
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = Self::from_json(path, &raw)?;
        info!(
            path = %path.display(),
            frames = scenario.frames.len(),
            producer_yields = scenario.producer_yields.len(),
            "demo_scenario_loaded"
        );
        Ok(scenario)
    }

    fn from_json(path: &Path, raw: &str) -> Result<Self, ScenarioError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let scenario: Self =
            serde_path_to_error::deserialize(deserializer).map_err(|error| ScenarioError::Parse {
                path: path.to_path_buf(),
                field: error.path().to_string(),
                source: error.into_inner(),
            })?;
        if scenario.frames.is_empty() {
            return Err(ScenarioError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(scenario)
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn yield_of(&self, producer: FormId) -> Option<FormId> {
        self.producer_yields
            .iter()
            .find(|entry| entry.producer == producer)
            .and_then(|entry| entry.lootable)
    }
}

enum Acknowledgement {
    Harvested(RefId),
    ProducerQueried(FormId),
}

#[derive(Default)]
struct DemoState {
    cursor: Option<usize>,
    observer: ObserverContext,
    instances: Vec<Instance>,
    picked_up: HashSet<RefId>,
    acknowledgements: Vec<Acknowledgement>,
    emitted: BTreeMap<&'static str, u64>,
}

/// Stands in for the game process: serves the scenario to the scan thread and answers its
/// requests one cycle later.
pub(crate) struct DemoWorld {
    harvester: Harvester,
    scenario: DemoScenario,
    state: Mutex<DemoState>,
}

impl DemoWorld {
    pub(crate) fn new(harvester: Harvester, scenario: DemoScenario) -> Self {
        Self {
            harvester,
            scenario,
            state: Mutex::new(DemoState::default()),
        }
    }

    pub(crate) fn emitted(&self) -> BTreeMap<&'static str, u64> {
        self.state().emitted.clone()
    }

    fn state(&self) -> MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acknowledge(&self, acknowledgements: Vec<Acknowledgement>) {
        for acknowledgement in acknowledgements {
            match acknowledgement {
                Acknowledgement::Harvested(reference) => {
                    self.harvester.complete(reference);
                }
                Acknowledgement::ProducerQueried(producer) => {
                    let lootable = self.scenario.yield_of(producer);
                    self.harvester.set_lootable_for_producer(producer, lootable);
                    debug!(producer = %producer, lootable = ?lootable, "demo_producer_answered");
                }
            }
        }
    }
}

impl WorldQuery for DemoWorld {
    /// Each call is one new cycle.
    fn observer(&self) -> Result<ObserverContext, WorldError> {
        let (observer, acknowledgements) = {
            let mut state = self.state();
            let last = self.scenario.frames.len().saturating_sub(1);
            let cursor = state.cursor.map_or(0, |cursor| (cursor + 1).min(last));
            state.cursor = Some(cursor);
            let frame = &self.scenario.frames[cursor];
            if let Some(observer) = &frame.observer {
                state.observer = observer.clone();
            }
            if let Some(instances) = &frame.instances {
                state.instances = instances.clone();
            }
            debug!(frame = cursor, "demo_frame");
            (state.observer.clone(), std::mem::take(&mut state.acknowledgements))
        };
        self.acknowledge(acknowledgements);
        Ok(observer)
    }

    fn enumerate_nearby(&self, origin: Position, radius: f32) -> Result<Vec<Instance>, WorldError> {
        let state = self.state();
        Ok(state
            .instances
            .iter()
            .filter(|instance| !state.picked_up.contains(&instance.id))
            .filter(|instance| distance(origin, instance.position) <= radius)
            .cloned()
            .collect())
    }

    fn instance(&self, id: RefId) -> Option<Instance> {
        let state = self.state();
        if state.picked_up.contains(&id) {
            return None;
        }
        state
            .instances
            .iter()
            .find(|instance| instance.id == id)
            .cloned()
    }
}

impl ActionSink for DemoWorld {
    fn ready(&self) -> bool {
        true
    }

    fn emit(&self, event: OutboundEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = event.label(), %payload, "demo_action"),
            Err(err) => warn!(event = event.label(), error = %err, "demo_action_unprintable"),
        }
        let mut state = self.state();
        *state.emitted.entry(event.label()).or_default() += 1;
        match event {
            OutboundEvent::AutoHarvest { instance, .. } => {
                state.picked_up.insert(instance);
                state
                    .acknowledgements
                    .push(Acknowledgement::Harvested(instance));
            }
            OutboundEvent::GetCritterIngredient { producer, .. } => state
                .acknowledgements
                .push(Acknowledgement::ProducerQueried(producer)),
            OutboundEvent::LootContainer { .. }
            | OutboundEvent::ObjectGlow { .. }
            | OutboundEvent::Notification { .. } => {}
        }
    }
}

fn distance(a: Position, b: Position) -> f32 {
    let (dx, dy, dz) = (a.x - b.x, a.y - b.y, a.z - b.z);
    (dx * dx + dy * dy + dz * dz).sqrt()
}
