use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CellId, FormId, Instance, LocationId, Position, RefId};
use crate::scan::{ContainerAnimation, GlowReason};
use crate::taxonomy::ObjectType;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("observer unavailable: {0}")]
    ObserverUnavailable(String),
    #[error("world query failed: {0}")]
    QueryFailed(String),
}

/// State of the observer at the start of a cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObserverContext {
    pub alive: bool,
    pub controls_enabled: bool,
    pub menu_open: bool,
    pub sneaking: bool,
    pub in_combat: bool,
    pub weapon_drawn: bool,
    pub concealed: bool,
    pub mounted: bool,
    pub location: Option<LocationId>,
    pub cell: Option<CellId>,
    pub cell_player_owned: bool,
    pub indoors: bool,
    pub position: Position,
}

/// Read access to the live world. Implementations snapshot instances; the scan never holds
/// on to one past the cycle that produced it.
pub trait WorldQuery: Send + Sync {
    fn observer(&self) -> Result<ObserverContext, WorldError>;
    /// `radius` is in world units.
    fn enumerate_nearby(&self, origin: Position, radius: f32) -> Result<Vec<Instance>, WorldError>;
    fn instance(&self, id: RefId) -> Option<Instance>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LootItem {
    pub form: FormId,
    pub count: u32,
    pub notify: bool,
}

/// Requests for the action collaborator. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum OutboundEvent {
    #[serde(rename_all = "camelCase")]
    AutoHarvest {
        instance: RefId,
        object_type: ObjectType,
        count: u32,
        silent: bool,
        ignore_blocking: bool,
        manual_loot_notify: bool,
    },
    #[serde(rename_all = "camelCase")]
    ObjectGlow {
        instance: RefId,
        duration_secs: u64,
        reason: GlowReason,
    },
    /// Answered through `Harvester::set_lootable_for_producer`.
    #[serde(rename_all = "camelCase")]
    GetCritterIngredient { instance: RefId, producer: FormId },
    #[serde(rename_all = "camelCase")]
    LootContainer {
        container: RefId,
        items: Vec<LootItem>,
        animation: ContainerAnimation,
    },
    Notification { text: String },
}

impl OutboundEvent {
    pub fn label(&self) -> &'static str {
        match self {
            OutboundEvent::AutoHarvest { .. } => "auto_harvest",
            OutboundEvent::ObjectGlow { .. } => "object_glow",
            OutboundEvent::GetCritterIngredient { .. } => "get_critter_ingredient",
            OutboundEvent::LootContainer { .. } => "loot_container",
            OutboundEvent::Notification { .. } => "notification",
        }
    }
}

/// Delivery side of the action collaborator. An `AutoHarvest` stays pending until the
/// collaborator calls `Harvester::complete`.
pub trait ActionSink: Send + Sync {
    /// Global readiness; a cycle emits nothing while this is false.
    fn ready(&self) -> bool;
    fn emit(&self, event: OutboundEvent);
}
