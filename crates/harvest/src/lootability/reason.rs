use std::fmt;

use serde::Serialize;

/// Why an identity is currently excluded. `Lootable` means no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LootabilityReason {
    Lootable,
    NullReference,
    NoBaseObject,
    ContainerPermanentlyOffLimits,
    CannotLootQuestTarget,
    CorruptArrowPosition,
    CannotRelootFirehoseSource,
    PermanentlyOffLimits,
    AlreadyProcessedThisVisit,
    ReferenceBlacklisted,
    LeaveBehind,
    ValueWeightTooLow,
    ExcludedByUser,
    ManualLootTarget,
    ContainerLooted,
    DeadBodyIneligible,
    OreVeinVisited,
}

impl LootabilityReason {
    pub fn is_lootable(self) -> bool {
        self == LootabilityReason::Lootable
    }
}

impl fmt::Display for LootabilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
