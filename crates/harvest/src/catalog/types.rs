use serde::{Deserialize, Serialize};

const DYNAMIC_ID_FLOOR: u32 = 0xFF00_0000;

pub const LOCKPICK_FORM: FormId = FormId(0x0000_000A);
pub const GOLD_FORM: FormId = FormId(0x0000_000F);
pub const DRINK_SOUND_FORM: FormId = FormId(0x000B_6435);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(pub u32);

impl FormId {
    /// Runtime-created forms recycle their ids, so nothing keyed by them may be remembered.
    pub fn is_dynamic(self) -> bool {
        self.0 >= DYNAMIC_ID_FLOOR
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(pub u32);

impl RefId {
    pub fn is_dynamic(self) -> bool {
        self.0 >= DYNAMIC_ID_FLOOR
    }
}

impl std::fmt::Display for RefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginOrigin {
    pub plugin: String,
    pub local_id: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionKind {
    Keyword,
    Actor,
    Container {
        entries: Vec<FormId>,
    },
    Ingredient,
    SoulGem,
    Key,
    Scroll,
    Ammo,
    Projectile,
    Light,
    Alchemy {
        food: bool,
        poison: bool,
        consumption_sound: Option<FormId>,
    },
    Misc,
    Book,
    Armor,
    Weapon,
    Flora {
        produce: Option<FormId>,
    },
    Tree {
        produce: Option<FormId>,
    },
    LeveledList {
        entries: Vec<FormId>,
    },
    Activator {
        activation_text: String,
    },
    Faction {
        vendor_container: Option<RefId>,
        stolen_goods_container: Option<RefId>,
        player_inventory_container: Option<RefId>,
    },
}

impl DefinitionKind {
    pub fn label(&self) -> &'static str {
        match self {
            DefinitionKind::Keyword => "Keyword",
            DefinitionKind::Actor => "Actor",
            DefinitionKind::Container { .. } => "Container",
            DefinitionKind::Ingredient => "Ingredient",
            DefinitionKind::SoulGem => "SoulGem",
            DefinitionKind::Key => "Key",
            DefinitionKind::Scroll => "Scroll",
            DefinitionKind::Ammo => "Ammo",
            DefinitionKind::Projectile => "Projectile",
            DefinitionKind::Light => "Light",
            DefinitionKind::Alchemy { .. } => "Alchemy",
            DefinitionKind::Misc => "Misc",
            DefinitionKind::Book => "Book",
            DefinitionKind::Armor => "Armor",
            DefinitionKind::Weapon => "Weapon",
            DefinitionKind::Flora { .. } => "Flora",
            DefinitionKind::Tree { .. } => "Tree",
            DefinitionKind::LeveledList { .. } => "LeveledList",
            DefinitionKind::Activator { .. } => "Activator",
            DefinitionKind::Faction { .. } => "Faction",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Definition {
    pub id: FormId,
    pub editor_id: String,
    pub name: String,
    pub kind: DefinitionKind,
    pub keywords: Vec<FormId>,
    pub value: i32,
    pub weight: f32,
    pub enchanted: bool,
    pub playable: bool,
    pub model_path: String,
    pub origin: Option<PluginOrigin>,
}

impl Definition {
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub player_house: bool,
    pub population_center: PopulationCenterSize,
}

/// Ordered so that a configured size also excludes every larger settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PopulationCenterSize {
    #[default]
    None,
    Settlement,
    Town,
    City,
}

impl PopulationCenterSize {
    pub fn from_setting(value: f64) -> Self {
        match value as u32 {
            1 => PopulationCenterSize::Settlement,
            2 => PopulationCenterSize::Town,
            3 => PopulationCenterSize::City,
            _ => PopulationCenterSize::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Owner {
    Player,
    PlayerFaction,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActorState {
    pub dead: bool,
    pub ally: bool,
    pub essential: bool,
    pub summoned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStack {
    pub form: FormId,
    pub count: u32,
    #[serde(default)]
    pub quest_item: bool,
}

/// One observation of a placed object, taken by the world query for a single scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: RefId,
    #[serde(default)]
    pub base: Option<FormId>,
    #[serde(default)]
    pub position: Position,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub off_limits: bool,
    #[serde(default)]
    pub quest_item: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub boss_container: bool,
    #[serde(default)]
    pub actor: Option<ActorState>,
    #[serde(default)]
    pub contents: Vec<ItemStack>,
}

fn default_count() -> u32 {
    1
}

impl Instance {
    pub fn new(id: RefId, base: FormId) -> Self {
        Self {
            id,
            base: Some(base),
            position: Position::default(),
            count: 1,
            owner: None,
            off_limits: false,
            quest_item: false,
            locked: false,
            boss_container: false,
            actor: None,
            contents: Vec::new(),
        }
    }

    pub fn is_player_owned(&self) -> bool {
        matches!(self.owner, Some(Owner::Player | Owner::PlayerFaction))
    }
}
