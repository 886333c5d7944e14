mod exclusions;
mod reason;
mod store;

pub use exclusions::UserExclusions;
pub use reason::LootabilityReason;
pub use store::{ArrowCheck, Identity, StateStore, ARROW_IN_FLIGHT_UNITS, DISTANCE_UNIT_IN_FEET};
