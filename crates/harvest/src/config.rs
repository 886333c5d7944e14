use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::sync::{read_or_recover, write_or_recover};

pub mod keys {
    pub const ENABLE_AUTO_HARVEST: &str = "enableAutoHarvest";
    pub const ENABLE_LOOT_CONTAINER: &str = "enableLootContainer";
    pub const ENABLE_LOOT_DEADBODY: &str = "enableLootDeadbody";
    pub const LOOT_BLOCKED_ACTIVATORS: &str = "LootBlockedActivators";

    pub const INTERVAL_SECONDS: &str = "IntervalSeconds";
    pub const INDOORS_INTERVAL_SECONDS: &str = "IndoorsIntervalSeconds";
    pub const RADIUS_FEET: &str = "RadiusFeet";
    pub const DISABLE_DURING_COMBAT: &str = "disableDuringCombat";
    pub const DISABLE_WHILE_WEAPON_IS_DRAWN: &str = "disableWhileWeaponIsDrawn";
    pub const DISABLE_WHILE_CONCEALED: &str = "DisableWhileConcealed";
    pub const DISABLE_WHILE_MOUNTED: &str = "DisableWhileMounted";
    pub const CRIME_CHECK_NOT_SNEAKING: &str = "crimeCheckNotSneaking";
    pub const CRIME_CHECK_SNEAKING: &str = "crimeCheckSneaking";
    pub const PLAYER_BELONGINGS_LOOT: &str = "playerBelongingsLoot";
    pub const QUEST_OBJECT_LOOT: &str = "questObjectLoot";
    pub const QUEST_OBJECT_SCOPE: &str = "questObjectScope";
    pub const LOCKED_CHEST_LOOT: &str = "lockedChestLoot";
    pub const BOSS_CHEST_LOOT: &str = "bossChestLoot";
    pub const ENCHANT_ITEM_GLOW: &str = "enchantItemGlow";
    pub const VALUABLE_ITEM_LOOT: &str = "valuableItemLoot";
    pub const VALUABLE_ITEM_THRESHOLD: &str = "ValuableItemThreshold";
    pub const VALUE_WEIGHT_DEFAULT: &str = "valueWeightDefault";
    pub const MANUAL_LOOT_TARGET_NOTIFY: &str = "ManualLootTargetNotify";
    pub const PLAY_CONTAINER_ANIMATION: &str = "PlayContainerAnimation";
    pub const PREVENT_POPULATION_CENTER_LOOTING: &str = "PreventPopulationCenterLooting";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingDomain {
    /// Global switches.
    Common,
    /// Looting options.
    Harvest,
    /// One `LootingType` per object type name.
    ItemObjects,
    /// One value/weight threshold per object type name.
    ValueWeight,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings source unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only numeric configuration, polled every scan cycle.
pub trait Settings: Send + Sync {
    fn setting(&self, domain: SettingDomain, key: &str) -> Result<f64, SettingsError>;
}

/// In-memory settings, deserialized from JSON. A key that is not present reads as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsTable {
    common: BTreeMap<String, f64>,
    harvest: BTreeMap<String, f64>,
    item_objects: BTreeMap<String, f64>,
    value_weight: BTreeMap<String, f64>,
}

impl SettingsTable {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(path, &raw)?;
        info!(
            path = %path.display(),
            common = table.common.len(),
            harvest = table.harvest.len(),
            item_objects = table.item_objects.len(),
            value_weight = table.value_weight.len(),
            "settings_loaded"
        );
        Ok(table)
    }

    pub fn from_json(path: &Path, raw: &str) -> Result<Self, SettingsError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(deserializer).map_err(|error| SettingsError::Parse {
            path: path.to_path_buf(),
            field: error.path().to_string(),
            source: error.into_inner(),
        })
    }

    pub fn get(&self, domain: SettingDomain, key: &str) -> f64 {
        self.domain(domain).get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, domain: SettingDomain, key: &str, value: f64) {
        self.domain_mut(domain).insert(key.to_string(), value);
    }

    pub fn with(mut self, domain: SettingDomain, key: &str, value: f64) -> Self {
        self.set(domain, key, value);
        self
    }

    fn domain(&self, domain: SettingDomain) -> &BTreeMap<String, f64> {
        match domain {
            SettingDomain::Common => &self.common,
            SettingDomain::Harvest => &self.harvest,
            SettingDomain::ItemObjects => &self.item_objects,
            SettingDomain::ValueWeight => &self.value_weight,
        }
    }

    fn domain_mut(&mut self, domain: SettingDomain) -> &mut BTreeMap<String, f64> {
        match domain {
            SettingDomain::Common => &mut self.common,
            SettingDomain::Harvest => &mut self.harvest,
            SettingDomain::ItemObjects => &mut self.item_objects,
            SettingDomain::ValueWeight => &mut self.value_weight,
        }
    }
}

impl Settings for SettingsTable {
    fn setting(&self, domain: SettingDomain, key: &str) -> Result<f64, SettingsError> {
        Ok(self.get(domain, key))
    }
}

/// A settings table that a host can change while the scan thread keeps reading it.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    table: Arc<RwLock<SettingsTable>>,
}

impl SharedSettings {
    pub fn new(table: SettingsTable) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    pub fn replace(&self, table: SettingsTable) {
        *write_or_recover(&self.table, "settings") = table;
    }

    pub fn update(&self, domain: SettingDomain, key: &str, value: f64) {
        write_or_recover(&self.table, "settings").set(domain, key, value);
    }

    pub fn snapshot(&self) -> SettingsTable {
        read_or_recover(&self.table, "settings").clone()
    }
}

impl Settings for SharedSettings {
    fn setting(&self, domain: SettingDomain, key: &str) -> Result<f64, SettingsError> {
        Ok(read_or_recover(&self.table, "settings").get(domain, key))
    }
}
