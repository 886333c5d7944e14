use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::catalog::PopulationCenterSize;
use crate::config::{keys, SettingDomain, Settings, SettingsError};
use crate::taxonomy::ObjectType;

pub const SPECIAL_GLOW_DURATION: Duration = Duration::from_secs(10);
pub const LOOTED_GLOW_DURATION: Duration = Duration::from_secs(2);
/// Pending auto-harvests above which notifications are suppressed.
pub const AUTO_HARVEST_SPAM_LIMIT: usize = 10;
pub const PENDING_ACTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(100);

/// Strongest visual-flag reason found for one instance. Declared weakest first so that the
/// derived ordering is the precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GlowReason {
    #[default]
    None,
    SimpleTarget,
    PlayerProperty,
    EnchantedItem,
    Valuable,
    Collectible,
    QuestObject,
    BossContainer,
    LockedContainer,
}

impl GlowReason {
    pub fn raise(&mut self, candidate: GlowReason) {
        if candidate > *self {
            *self = candidate;
        }
    }

    pub fn is_none(self) -> bool {
        self == GlowReason::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LootingType {
    LeaveBehind,
    LootAlwaysSilent,
    LootAlwaysNotify,
    LootIfValuableEnoughSilent,
    LootIfValuableEnoughNotify,
}

impl LootingType {
    pub fn from_setting(value: f64) -> Self {
        match value as i64 {
            1 => LootingType::LootAlwaysSilent,
            2 => LootingType::LootAlwaysNotify,
            3 => LootingType::LootIfValuableEnoughSilent,
            4 => LootingType::LootIfValuableEnoughNotify,
            _ => LootingType::LeaveBehind,
        }
    }

    pub fn requires_notification(self) -> bool {
        matches!(
            self,
            LootingType::LootAlwaysNotify | LootingType::LootIfValuableEnoughNotify
        )
    }

    pub fn depends_on_value_weight(self, object_type: ObjectType) -> bool {
        if is_value_weight_exempt(object_type) {
            return false;
        }
        matches!(
            self,
            LootingType::LootIfValuableEnoughSilent | LootingType::LootIfValuableEnoughNotify
        )
    }
}

pub fn is_value_weight_exempt(object_type: ObjectType) -> bool {
    matches!(
        object_type,
        ObjectType::Septims
            | ObjectType::Key
            | ObjectType::OreVein
            | ObjectType::Ammo
            | ObjectType::Lockpick
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialObjectHandling {
    DoNotLoot,
    DoLoot,
    GlowTarget,
}

impl SpecialObjectHandling {
    pub fn from_setting(value: f64) -> Self {
        match value as i64 {
            1 => SpecialObjectHandling::DoLoot,
            2 => SpecialObjectHandling::GlowTarget,
            _ => SpecialObjectHandling::DoNotLoot,
        }
    }

    pub fn is_lootable(self) -> bool {
        self == SpecialObjectHandling::DoLoot
    }

    pub fn glows(self) -> bool {
        self == SpecialObjectHandling::GlowTarget
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadBodyLooting {
    DoNotLoot,
    LootExcludingArmor,
    LootAll,
}

impl DeadBodyLooting {
    pub fn from_setting(value: f64) -> Self {
        match value as i64 {
            1 => DeadBodyLooting::LootExcludingArmor,
            2 => DeadBodyLooting::LootAll,
            _ => DeadBodyLooting::DoNotLoot,
        }
    }
}

/// How far the observer's law-abiding setting reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrimeCheck {
    IgnoreLaw,
    NeverSteal,
    NeverTakeOwned,
}

impl CrimeCheck {
    pub fn from_setting(value: f64) -> Self {
        match value as i64 {
            0 => CrimeCheck::IgnoreLaw,
            1 => CrimeCheck::NeverSteal,
            _ => CrimeCheck::NeverTakeOwned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ContainerAnimation {
    None,
    Open,
    Glow { seconds: u64 },
}

impl ContainerAnimation {
    pub fn from_setting(value: f64, dead_body: bool) -> Self {
        match value as i64 {
            v if v <= 0 => ContainerAnimation::None,
            // corpses cannot play an open animation
            1 if !dead_body => ContainerAnimation::Open,
            _ => ContainerAnimation::Glow {
                seconds: LOOTED_GLOW_DURATION.as_secs(),
            },
        }
    }
}

/// Every setting one cycle consults, read before any state is touched so that an
/// unavailable settings source aborts the cycle cleanly.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub auto_harvest: bool,
    pub loot_containers: bool,
    pub dead_bodies: DeadBodyLooting,
    pub loot_blocked_activators: bool,
    pub interval: Duration,
    pub indoors_interval: Duration,
    pub radius_feet: f64,
    pub disable_during_combat: bool,
    pub disable_while_weapon_drawn: bool,
    pub disable_while_concealed: bool,
    pub disable_while_mounted: bool,
    pub crime_check_sneaking: CrimeCheck,
    pub crime_check_not_sneaking: CrimeCheck,
    pub player_belongings: SpecialObjectHandling,
    pub quest_objects: SpecialObjectHandling,
    pub quest_object_scope_strict: bool,
    pub locked_chests: SpecialObjectHandling,
    pub boss_chests: SpecialObjectHandling,
    pub enchant_item_glow: bool,
    pub valuable_items: SpecialObjectHandling,
    pub valuable_threshold: f64,
    pub value_weight_default: f64,
    pub manual_loot_notify: bool,
    pub container_animation: f64,
    pub population_center_limit: PopulationCenterSize,
    looting: HashMap<ObjectType, LootingType>,
    value_weight: HashMap<ObjectType, f64>,
}

impl CycleSettings {
    pub fn read(settings: &dyn Settings) -> Result<Self, SettingsError> {
        let common = |key: &str| settings.setting(SettingDomain::Common, key);
        let harvest = |key: &str| settings.setting(SettingDomain::Harvest, key);

        let mut looting = HashMap::with_capacity(ObjectType::ALL.len());
        let mut value_weight = HashMap::with_capacity(ObjectType::ALL.len());
        for object_type in ObjectType::ALL {
            let raw = settings.setting(SettingDomain::ItemObjects, object_type.name())?;
            looting.insert(object_type, LootingType::from_setting(raw));
            let threshold = settings.setting(SettingDomain::ValueWeight, object_type.name())?;
            value_weight.insert(object_type, threshold);
        }

        Ok(Self {
            auto_harvest: common(keys::ENABLE_AUTO_HARVEST)? != 0.0,
            loot_containers: common(keys::ENABLE_LOOT_CONTAINER)? != 0.0,
            dead_bodies: DeadBodyLooting::from_setting(common(keys::ENABLE_LOOT_DEADBODY)?),
            loot_blocked_activators: common(keys::LOOT_BLOCKED_ACTIVATORS)? != 0.0,
            interval: seconds(harvest(keys::INTERVAL_SECONDS)?),
            indoors_interval: seconds(harvest(keys::INDOORS_INTERVAL_SECONDS)?),
            radius_feet: harvest(keys::RADIUS_FEET)?.max(0.0),
            disable_during_combat: harvest(keys::DISABLE_DURING_COMBAT)? != 0.0,
            disable_while_weapon_drawn: harvest(keys::DISABLE_WHILE_WEAPON_IS_DRAWN)? != 0.0,
            disable_while_concealed: harvest(keys::DISABLE_WHILE_CONCEALED)? != 0.0,
            disable_while_mounted: harvest(keys::DISABLE_WHILE_MOUNTED)? != 0.0,
            crime_check_sneaking: CrimeCheck::from_setting(harvest(keys::CRIME_CHECK_SNEAKING)?),
            crime_check_not_sneaking: CrimeCheck::from_setting(
                harvest(keys::CRIME_CHECK_NOT_SNEAKING)?,
            ),
            player_belongings: SpecialObjectHandling::from_setting(
                harvest(keys::PLAYER_BELONGINGS_LOOT)?,
            ),
            quest_objects: SpecialObjectHandling::from_setting(harvest(keys::QUEST_OBJECT_LOOT)?),
            quest_object_scope_strict: harvest(keys::QUEST_OBJECT_SCOPE)? != 0.0,
            locked_chests: SpecialObjectHandling::from_setting(harvest(keys::LOCKED_CHEST_LOOT)?),
            boss_chests: SpecialObjectHandling::from_setting(harvest(keys::BOSS_CHEST_LOOT)?),
            enchant_item_glow: harvest(keys::ENCHANT_ITEM_GLOW)? as i64 == 1,
            valuable_items: SpecialObjectHandling::from_setting(
                harvest(keys::VALUABLE_ITEM_LOOT)?,
            ),
            valuable_threshold: harvest(keys::VALUABLE_ITEM_THRESHOLD)?,
            value_weight_default: harvest(keys::VALUE_WEIGHT_DEFAULT)?,
            manual_loot_notify: harvest(keys::MANUAL_LOOT_TARGET_NOTIFY)? != 0.0,
            container_animation: harvest(keys::PLAY_CONTAINER_ANIMATION)?,
            population_center_limit: PopulationCenterSize::from_setting(
                harvest(keys::PREVENT_POPULATION_CENTER_LOOTING)?,
            ),
            looting,
            value_weight,
        })
    }

    pub fn looting_type(&self, object_type: ObjectType) -> LootingType {
        self.looting
            .get(&object_type)
            .copied()
            .unwrap_or(LootingType::LeaveBehind)
    }

    pub fn crime_check(&self, sneaking: bool) -> CrimeCheck {
        if sneaking {
            self.crime_check_sneaking
        } else {
            self.crime_check_not_sneaking
        }
    }

    /// Sleep before the next cycle.
    pub fn scan_interval(&self, indoors: bool) -> Duration {
        let interval = if indoors && !self.indoors_interval.is_zero() {
            self.indoors_interval
        } else {
            self.interval
        };
        interval.max(MIN_SCAN_INTERVAL)
    }

    pub fn is_valuable(&self, value: i32) -> bool {
        value > 0 && self.valuable_threshold > 0.0 && f64::from(value) >= self.valuable_threshold - 0.01
    }

    /// True when the item is too cheap for its weight. Valuable items always pass, as does
    /// anything when no threshold is configured.
    pub fn value_weight_too_low(&self, object_type: ObjectType, value: i32, weight: f32) -> bool {
        if self.is_valuable(value) {
            return false;
        }
        let mut threshold = self.value_weight.get(&object_type).copied().unwrap_or(0.0);
        if threshold <= 0.0 {
            threshold = self.value_weight_default;
        }
        if threshold <= 0.0 {
            return false;
        }
        let weight = f64::from(weight).max(0.0);
        let value = f64::from(value);
        if weight <= 0.0 {
            // weightless items pass; a zero-value weightless item is decided by other rules
            return false;
        }
        if value <= 0.0 {
            return true;
        }
        value / weight < threshold - 0.01
    }
}

fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
