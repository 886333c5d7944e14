use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::object_type::{ObjectType, ResourceType};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rule tables {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule tables {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstringRule {
    pub pattern: String,
    pub object_type: ObjectType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbRule {
    pub translation_key: String,
    pub object_type: ObjectType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNameRule {
    pub contains: String,
    pub resource_type: ResourceType,
}

/// A definition addressed by the plugin that declares it, so the entry survives load order changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginForm {
    pub plugin: String,
    pub local_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialCase {
    pub plugin: String,
    pub local_ids: Vec<u32>,
    pub object_type: ObjectType,
    #[serde(default)]
    pub resource_type: Option<ResourceType>,
}

/// A container that is never looted while `plugin` is loaded. `local_id` is tried first;
/// otherwise every container named exactly `name` matches, whichever plugin declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffLimitsContainerRule {
    pub plugin: String,
    #[serde(default)]
    pub local_id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Classification data. Everything here is product configuration and can be replaced
/// wholesale from JSON; the resolver only relies on the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleTables {
    /// Keyword editor id to type, exact match.
    pub keyword_types: BTreeMap<String, ObjectType>,
    /// Checked in order after an exact miss. First pattern contained in the editor id wins.
    pub keyword_substrings: Vec<SubstringRule>,
    pub glowable_book_keywords: Vec<String>,
    pub activation_verbs: Vec<VerbRule>,
    /// Checked in order against ore vein names; no match means `ore`.
    pub ore_vein_names: Vec<ResourceNameRule>,
    pub special_cases: Vec<SpecialCase>,
    /// Leveled lists that only ever appear in merchant chests.
    pub vendor_gold_lists: Vec<PluginForm>,
    pub off_limits_containers: Vec<OffLimitsContainerRule>,
    /// Plugins whose presence forbids looting while mounted.
    pub mounted_looting_plugins: Vec<String>,
}

impl Default for RuleTables {
    fn default() -> Self {
        let keyword_types = [
            ("ArmorLight", ObjectType::Armor),
            ("ArmorHeavy", ObjectType::Armor),
            ("VendorItemArrow", ObjectType::Ammo),
            ("VendorItemBook", ObjectType::Book),
            ("VendorItemRecipe", ObjectType::Book),
            ("VendorItemGem", ObjectType::Gem),
            ("VendorItemOreIngot", ObjectType::OreIngot),
            ("VendorItemAnimalHide", ObjectType::AnimalHide),
            ("VendorItemAnimalPart", ObjectType::Clutter),
            ("VendorItemJewelry", ObjectType::Jewelry),
            ("VendorItemArmor", ObjectType::Armor),
            ("VendorItemClothing", ObjectType::Armor),
            ("VendorItemIngredient", ObjectType::Ingredient),
            ("VendorItemKey", ObjectType::Key),
            ("VendorItemPotion", ObjectType::Potion),
            ("VendorItemPoison", ObjectType::Poison),
            ("VendorItemScroll", ObjectType::Scroll),
            ("VendorItemSpellTome", ObjectType::Spellbook),
            ("VendorItemSoulGem", ObjectType::Soulgem),
            ("VendorItemStaff", ObjectType::Weapon),
            ("VendorItemWeapon", ObjectType::Weapon),
            ("VendorItemClutter", ObjectType::Clutter),
            ("VendorItemFireword", ObjectType::Clutter),
            ("VendorItemJournal", ObjectType::Book),
            ("VendorItemNote", ObjectType::Book),
            ("VendorItemFateCards", ObjectType::Clutter),
            ("WeapTypeBattleaxe", ObjectType::Weapon),
            ("WeapTypeBoundArrow", ObjectType::Ammo),
            ("WeapTypeBow", ObjectType::Weapon),
            ("WeapTypeDagger", ObjectType::Weapon),
            ("WeapTypeGreatsword", ObjectType::Weapon),
            ("WeapTypeMace", ObjectType::Weapon),
            ("WeapTypeStaff", ObjectType::Weapon),
            ("WeapTypeSword", ObjectType::Weapon),
            ("WeapTypeWarAxe", ObjectType::Weapon),
            ("WeapTypeWarhammer", ObjectType::Weapon),
            ("WAF_WeapTypeGrenade", ObjectType::Weapon),
            ("WAF_WeapTypeScalpel", ObjectType::Weapon),
        ]
        .into_iter()
        .map(|(name, object_type)| (name.to_string(), object_type))
        .collect();

        let keyword_substrings = [
            ("Drink", ObjectType::Drink),
            ("VendorItemFood", ObjectType::Food),
        ]
        .into_iter()
        .map(|(pattern, object_type)| SubstringRule {
            pattern: pattern.to_string(),
            object_type,
        })
        .collect();

        let activation_verbs = [
            ("$SHSE_ACTIVATE_VERBS_CRITTER", ObjectType::Critter),
            ("$SHSE_ACTIVATE_VERBS_FLORA", ObjectType::Flora),
            ("$SHSE_ACTIVATE_VERBS_OREVEIN", ObjectType::OreVein),
        ]
        .into_iter()
        .map(|(key, object_type)| VerbRule {
            translation_key: key.to_string(),
            object_type,
        })
        .collect();

        let ore_vein_names = [
            ("Heart Stone Deposit", ResourceType::Volcanic),
            ("Sulfur Deposit", ResourceType::Volcanic),
            ("Geode", ResourceType::Geode),
        ]
        .into_iter()
        .map(|(contains, resource_type)| ResourceNameRule {
            contains: contains.to_string(),
            resource_type,
        })
        .collect();

        let special_cases = vec![
            special("Fossilsyum.esp", &[0x3f41b], ObjectType::OreVein, Some(ResourceType::VolcanicDigSite)),
            special("Dragonborn.esm", &[0x18486, 0x18488], ObjectType::Septims, None),
            special("SkyrimCoinReplacerRedux.esp", &[0x800, 0x801, 0x802], ObjectType::Septims, None),
            special("CorpseToCoinage.esp", &[0xaa03], ObjectType::Septims, None),
            special("BSAssets.esm", &[0x6028dc], ObjectType::Septims, None),
        ];

        let vendor_gold_lists = [
            ("Skyrim.esm", 0x17102),
            ("Skyrim.esm", 0x72ae7),
            ("Skyrim.esm", 0x72ae8),
            ("Skyrim.esm", 0x72ae9),
            ("Skyrim.esm", 0x72aea),
            ("Skyrim.esm", 0x72aeb),
            ("Skyrim.esm", 0x72aec),
            ("Skyrim.esm", 0x72aed),
            ("Skyrim.esm", 0xd54bf),
            ("Skyrim.esm", 0xd54c0),
            ("Skyrim.esm", 0xd54c1),
            ("Skyrim.esm", 0xd54c2),
            ("Skyrim.esm", 0xd54c3),
            ("Wyrmstooth.esp", 0x5d0598),
            ("Midwood Isle.esp", 0x142430),
            ("Midwood Isle.esp", 0x19b10a),
            ("AAX_Arweden.esp", 0x041dd1),
            ("Complete Alchemy & Cooking Overhaul.esp", 0x97afe1),
        ]
        .into_iter()
        .map(|(plugin, local_id)| PluginForm {
            plugin: plugin.to_string(),
            local_id,
        })
        .collect();

        let off_limits_containers = vec![
            // the all-armor storage chest
            off_limits("Hothtrooper44_ArmorCompilation.esp", Some(0x4b352), Some("Auxiliary Armor Storage")),
            // named just "Chest", so only the exact form counts
            off_limits("Gray Fox Cowl.esm", Some(0x1a184), None),
            // merged patches rename the plugin, the container name survives
            off_limits("Missives.esp", None, Some("Missive Board")),
        ];

        Self {
            keyword_types,
            keyword_substrings,
            glowable_book_keywords: vec![
                "VendorItemJournal".to_string(),
                "VendorItemNote".to_string(),
            ],
            activation_verbs,
            ore_vein_names,
            special_cases,
            vendor_gold_lists,
            off_limits_containers,
            mounted_looting_plugins: vec!["Convenient Horses.esp".to_string()],
        }
    }
}

fn off_limits(plugin: &str, local_id: Option<u32>, name: Option<&str>) -> OffLimitsContainerRule {
    OffLimitsContainerRule {
        plugin: plugin.to_string(),
        local_id,
        name: name.map(str::to_string),
    }
}

fn special(
    plugin: &str,
    local_ids: &[u32],
    object_type: ObjectType,
    resource_type: Option<ResourceType>,
) -> SpecialCase {
    SpecialCase {
        plugin: plugin.to_string(),
        local_ids: local_ids.to_vec(),
        object_type,
        resource_type,
    }
}

impl RuleTables {
    /// Reads a JSON rule file. Tables absent from the file keep their built-in contents.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let raw = fs::read_to_string(path).map_err(|source| RulesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &raw)
    }

    pub fn from_json(path: &Path, raw: &str) -> Result<Self, RulesError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(deserializer).map_err(|error| RulesError::Parse {
            path: path.to_path_buf(),
            field: error.path().to_string(),
            source: error.into_inner(),
        })
    }

    /// Exact table first, then the ordered substring list.
    pub fn keyword_type(&self, editor_id: &str) -> Option<ObjectType> {
        if let Some(object_type) = self.keyword_types.get(editor_id) {
            return Some(*object_type);
        }
        self.keyword_substrings
            .iter()
            .find(|rule| editor_id.contains(&rule.pattern))
            .map(|rule| rule.object_type)
    }

    pub fn ore_vein_resource(&self, name: &str) -> ResourceType {
        self.ore_vein_names
            .iter()
            .find(|rule| name.contains(&rule.contains))
            .map(|rule| rule.resource_type)
            .unwrap_or(ResourceType::Ore)
    }
}
