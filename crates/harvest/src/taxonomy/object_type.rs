use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic category of a definition. `Unknown` is terminal and means "never looted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    #[default]
    Unknown,
    Flora,
    Critter,
    Ingredient,
    Septims,
    Lockpick,
    Ammo,
    Key,
    Book,
    Spellbook,
    Scroll,
    Soulgem,
    Potion,
    Poison,
    Food,
    Drink,
    OreIngot,
    Gem,
    OreVein,
    AnimalHide,
    Jewelry,
    EnchantedJewelry,
    Weapon,
    EnchantedWeapon,
    Armor,
    EnchantedArmor,
    Clutter,
    Light,
    Container,
    Actor,
    ManualLoot,
}

impl ObjectType {
    pub const ALL: [ObjectType; 31] = [
        ObjectType::Unknown,
        ObjectType::Flora,
        ObjectType::Critter,
        ObjectType::Ingredient,
        ObjectType::Septims,
        ObjectType::Lockpick,
        ObjectType::Ammo,
        ObjectType::Key,
        ObjectType::Book,
        ObjectType::Spellbook,
        ObjectType::Scroll,
        ObjectType::Soulgem,
        ObjectType::Potion,
        ObjectType::Poison,
        ObjectType::Food,
        ObjectType::Drink,
        ObjectType::OreIngot,
        ObjectType::Gem,
        ObjectType::OreVein,
        ObjectType::AnimalHide,
        ObjectType::Jewelry,
        ObjectType::EnchantedJewelry,
        ObjectType::Weapon,
        ObjectType::EnchantedWeapon,
        ObjectType::Armor,
        ObjectType::EnchantedArmor,
        ObjectType::Clutter,
        ObjectType::Light,
        ObjectType::Container,
        ObjectType::Actor,
        ObjectType::ManualLoot,
    ];

    /// Name used as the settings key in the `ItemObjects` and `ValueWeight` domains.
    pub fn name(self) -> &'static str {
        match self {
            ObjectType::Unknown => "unknown",
            ObjectType::Flora => "flora",
            ObjectType::Critter => "critter",
            ObjectType::Ingredient => "ingredient",
            ObjectType::Septims => "septims",
            ObjectType::Lockpick => "lockpick",
            ObjectType::Ammo => "ammo",
            ObjectType::Key => "key",
            ObjectType::Book => "book",
            ObjectType::Spellbook => "spellbook",
            ObjectType::Scroll => "scroll",
            ObjectType::Soulgem => "soulgem",
            ObjectType::Potion => "potion",
            ObjectType::Poison => "poison",
            ObjectType::Food => "food",
            ObjectType::Drink => "drink",
            ObjectType::OreIngot => "oreIngot",
            ObjectType::Gem => "gem",
            ObjectType::OreVein => "oreVein",
            ObjectType::AnimalHide => "animalHide",
            ObjectType::Jewelry => "jewelry",
            ObjectType::EnchantedJewelry => "enchantedJewelry",
            ObjectType::Weapon => "weapon",
            ObjectType::EnchantedWeapon => "enchantedWeapon",
            ObjectType::Armor => "armor",
            ObjectType::EnchantedArmor => "enchantedArmor",
            ObjectType::Clutter => "clutter",
            ObjectType::Light => "light",
            ObjectType::Container => "container",
            ObjectType::Actor => "actor",
            ObjectType::ManualLoot => "manualLoot",
        }
    }

    pub fn is_known(self) -> bool {
        self != ObjectType::Unknown
    }

    /// Promotion applied to enchanted items. Anything that is neither jewelry nor a weapon
    /// is treated as armor.
    pub fn enchanted(self) -> ObjectType {
        match self {
            ObjectType::Jewelry | ObjectType::EnchantedJewelry => ObjectType::EnchantedJewelry,
            ObjectType::Weapon | ObjectType::EnchantedWeapon => ObjectType::EnchantedWeapon,
            _ => ObjectType::EnchantedArmor,
        }
    }

    /// Items a corpse keeps under "loot all but armor".
    pub fn is_armor_family(self) -> bool {
        matches!(
            self,
            ObjectType::Armor
                | ObjectType::EnchantedArmor
                | ObjectType::Jewelry
                | ObjectType::EnchantedJewelry
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Secondary tag carried only by mineable definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Ore,
    Geode,
    Volcanic,
    VolcanicDigSite,
}
