mod compiler;
mod database;
mod types;

pub use compiler::{
    load_catalog, parse_catalog_str, CatalogErrorCode, CatalogLoadError, SourceLocation,
};
pub use database::Catalog;
pub use types::{
    ActorState, CellId, Definition, DefinitionKind, FormId, Instance, ItemStack, Location,
    LocationId, Owner, PluginOrigin, PopulationCenterSize, Position, RefId, DRINK_SOUND_FORM,
    GOLD_FORM, LOCKPICK_FORM,
};
